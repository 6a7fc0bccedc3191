//! Test utilities and mock backends for testing the model port
//!
//! `MockStyleModel` implements `StyleModel` without any real network: it
//! reads the staged square image, tints it, and writes `<base>_fake.png`
//! into its output directory.

use crate::{
    error::ModelError,
    inference::{output_file_name, StyleModel},
};
use image::{DynamicImage, GenericImageView, Rgb};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Mock model backend for testing
#[derive(Debug, Clone)]
pub struct MockStyleModel {
    /// Directory the mock writes outputs into
    output_dir: PathBuf,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Whether to simulate a failing model process
    should_fail: bool,
    /// Whether to finish without writing the output file
    skip_output: bool,
    /// Edge length of the written output (None = same as input)
    output_size: Option<u32>,
}

impl MockStyleModel {
    /// Create a new mock writing into `output_dir`
    #[must_use]
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
            skip_output: false,
            output_size: None,
        }
    }

    /// Create a mock whose invocation fails
    #[must_use]
    pub fn new_failing<P: Into<PathBuf>>(output_dir: P) -> Self {
        let mut model = Self::new(output_dir);
        model.should_fail = true;
        model
    }

    /// Create a mock that never writes its output file
    #[must_use]
    pub fn new_missing_output<P: Into<PathBuf>>(output_dir: P) -> Self {
        let mut model = Self::new(output_dir);
        model.skip_output = true;
        model
    }

    /// Write outputs of a different edge length than the input
    #[must_use]
    pub fn with_output_size(mut self, size: u32) -> Self {
        self.output_size = Some(size);
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, entry: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(entry);
        }
    }

    /// Swap red and blue so outputs are distinguishable from inputs
    fn stylize(image: &DynamicImage) -> DynamicImage {
        let mut rgb = image.to_rgb8();
        for pixel in rgb.pixels_mut() {
            let Rgb([r, g, b]) = *pixel;
            *pixel = Rgb([b, g, r]);
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

impl StyleModel for MockStyleModel {
    fn invoke(&mut self, staged_image: &Path, weights_id: &str) -> Result<PathBuf, ModelError> {
        self.record_call(format!("invoke:{}", weights_id));

        if self.should_fail {
            return Err(ModelError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "mock model failure".to_string(),
            });
        }

        let expected = self.output_dir.join(output_file_name(staged_image));
        if self.skip_output {
            return Err(ModelError::OutputMissing { expected });
        }

        let input = image::open(staged_image).map_err(|e| ModelError::Decode {
            path: staged_image.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut output = Self::stylize(&input);
        if let Some(size) = self.output_size {
            if output.dimensions() != (size, size) {
                output = output.resize_exact(size, size, image::imageops::FilterType::Triangle);
            }
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ModelError::Launch {
            program: "mock".to_string(),
            source,
        })?;
        output.save(&expected).map_err(|e| ModelError::Decode {
            path: expected.clone(),
            message: e.to_string(),
        })?;
        Ok(expected)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn staged(dir: &Path) -> PathBuf {
        let path = dir.join("sample.jpg");
        RgbImage::from_pixel(16, 16, Rgb([200, 10, 10])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_mock_writes_fake_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = MockStyleModel::new(dir.path().join("results"));
        let output = model.invoke(&staged(dir.path()), "style_cezanne_pretrained").unwrap();

        assert!(output.exists());
        assert_eq!(output.file_name().unwrap(), "sample_fake.png");
        let pixel = *image::open(&output).unwrap().to_rgb8().get_pixel(8, 8);
        assert!(pixel[2] > pixel[0]);
        assert_eq!(model.get_call_history(), vec!["invoke:style_cezanne_pretrained"]);
    }

    #[test]
    fn test_mock_failure_modes() {
        let dir = tempfile::tempdir().unwrap();
        let input = staged(dir.path());

        let mut failing = MockStyleModel::new_failing(dir.path());
        assert!(matches!(
            failing.invoke(&input, "w"),
            Err(ModelError::Failed { .. })
        ));

        let mut missing = MockStyleModel::new_missing_output(dir.path());
        assert!(matches!(
            missing.invoke(&input, "w"),
            Err(ModelError::OutputMissing { .. })
        ));
    }

    #[test]
    fn test_mock_output_size_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = MockStyleModel::new(dir.path()).with_output_size(64);
        let output = model.invoke(&staged(dir.path()), "w").unwrap();
        assert_eq!(image::open(output).unwrap().dimensions(), (64, 64));
    }
}
