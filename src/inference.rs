//! External model port
//!
//! The pretrained generator is an opaque collaborator: it reads one staged
//! square image and writes one styled square image. Implementations decide
//! how (subprocess, library binding, test double).

use crate::error::ModelError;
use std::path::{Path, PathBuf};

/// Trait for style transfer model backends
pub trait StyleModel {
    /// Run the model on the staged image with the given pretrained weights
    ///
    /// Returns the path of the styled output image.
    ///
    /// # Errors
    /// - The model could not be started or exited with failure
    /// - The model finished without producing its output file
    fn invoke(&mut self, staged_image: &Path, weights_id: &str) -> Result<PathBuf, ModelError>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

impl<T: StyleModel + ?Sized> StyleModel for Box<T> {
    fn invoke(&mut self, staged_image: &Path, weights_id: &str) -> Result<PathBuf, ModelError> {
        (**self).invoke(staged_image, weights_id)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Output file name produced for a staged input: `<base>_fake.png`
#[must_use]
pub fn output_file_name(staged_image: &Path) -> String {
    let base = staged_image
        .file_stem()
        .map_or_else(|| "image".into(), |stem| stem.to_string_lossy());
    format!("{}_fake.png", base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockStyleModel;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(Path::new("/stage/harbor.jpg")), "harbor_fake.png");
        assert_eq!(output_file_name(Path::new("photo")), "photo_fake.png");
    }

    #[test]
    fn test_boxed_model_delegates() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("in.jpg");
        image::RgbImage::new(8, 8).save(&staged).unwrap();

        let mut model: Box<dyn StyleModel> = Box::new(MockStyleModel::new(dir.path().join("out")));
        let output = model.invoke(&staged, "style_monet_pretrained").unwrap();
        assert!(output.ends_with("in_fake.png"));
        assert_eq!(model.name(), "mock");
    }
}
