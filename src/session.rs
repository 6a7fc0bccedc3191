//! Per-session state passed explicitly to every frontend handler
//!
//! A session owns one staging directory and at most one uploaded image with
//! its `ScaleRecord`. Uploading a new image drops the previous one together
//! with any result produced from it.

use crate::{
    error::{ErrorKind, Result, StyleTransferError},
    processor::StyleTransferProcessor,
    services::ImageIOService,
    styles::Style,
    types::{PreparedImage, StyledResult, Upload},
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Error retained for display after a failed interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    /// Classification of the failure
    pub kind: ErrorKind,
    /// Translation key of the short message
    pub message_key: &'static str,
    /// Placeholder values for the short message
    pub message_args: Vec<(&'static str, String)>,
    /// Full diagnostic text, shown only on demand
    pub details: String,
}

impl From<&StyleTransferError> for SessionError {
    fn from(err: &StyleTransferError) -> Self {
        Self {
            kind: err.kind(),
            message_key: err.message_key(),
            message_args: err.message_args(),
            details: err.to_string(),
        }
    }
}

/// Explicit context for one user session
#[derive(Debug)]
pub struct SessionContext {
    /// Session identifier
    pub id: Uuid,
    /// Active interface locale
    pub locale: String,
    /// Isolated staging directory (`<staging_root>/<id>`)
    pub staging_dir: PathBuf,
    /// Current upload, normalized and staged
    pub prepared: Option<PreparedImage>,
    /// Result produced from `prepared`
    pub result: Option<StyledResult>,
    /// Selected style
    pub style: Style,
    /// Whether the user asked for processing that has not finished
    pub processing_requested: bool,
    /// Most recent failure, if any
    pub last_error: Option<SessionError>,
}

impl SessionContext {
    /// New session with a fresh id and its own directory under `staging_root`
    #[must_use]
    pub fn new<P: AsRef<Path>>(staging_root: P, locale: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            locale: locale.to_string(),
            staging_dir: staging_root.as_ref().join(id.to_string()),
            prepared: None,
            result: None,
            style: Style::default(),
            processing_requested: false,
            last_error: None,
        }
    }

    /// Validate, normalize and stage an upload for this session
    ///
    /// On success the previous image, record and result are replaced. On
    /// failure they are kept and the error is recorded.
    pub fn upload(
        &mut self,
        processor: &mut StyleTransferProcessor,
        upload: &Upload,
    ) -> Result<&PreparedImage> {
        match processor.save_and_prepare_image(upload, &self.staging_dir) {
            Ok(prepared) => {
                self.result = None;
                self.last_error = None;
                self.processing_requested = false;
                Ok(self.prepared.insert(prepared))
            },
            Err(err) => {
                self.fail(&err);
                Err(err)
            },
        }
    }

    /// Stylize the current upload with `style`
    ///
    /// Processing is marked requested for the duration of the call and
    /// cleared on either outcome; failures are never retried.
    pub fn process(
        &mut self,
        processor: &mut StyleTransferProcessor,
        style: Style,
    ) -> Result<&StyledResult> {
        self.style = style;
        let Some(prepared) = self.prepared.as_ref() else {
            let err = StyleTransferError::processing("no image has been uploaded");
            self.fail(&err);
            return Err(err);
        };

        self.processing_requested = true;
        match processor.stylize(prepared, style) {
            Ok(result) => {
                self.processing_requested = false;
                self.last_error = None;
                Ok(self.result.insert(result))
            },
            Err(err) => {
                self.fail(&err);
                Err(err)
            },
        }
    }

    /// Record a failure and clear the pending processing request
    pub fn fail(&mut self, err: &StyleTransferError) {
        log::warn!("Session {}: {}", self.id, err);
        self.processing_requested = false;
        self.last_error = Some(SessionError::from(err));
    }

    /// Switch the interface locale
    pub fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
    }

    /// Forget the displayed error
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.prepared.is_some()
    }

    #[must_use]
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Drop all images and remove the staging directory
    pub fn close(&mut self) -> Result<()> {
        self.prepared = None;
        self.result = None;
        self.processing_requested = false;
        ImageIOService::remove_dir(&self.staging_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockStyleModel;
    use crate::config::ProcessorConfig;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3])))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn setup(dir: &Path, model: MockStyleModel) -> (StyleTransferProcessor, SessionContext) {
        let config = ProcessorConfig::builder().staging_root(dir).build().unwrap();
        let session = SessionContext::new(&config.staging_root, "en");
        let processor = StyleTransferProcessor::new(config, Box::new(model)).unwrap();
        (processor, session)
    }

    #[test]
    fn test_sessions_get_isolated_directories() {
        let a = SessionContext::new("/tmp/stage", "en");
        let b = SessionContext::new("/tmp/stage", "en");
        assert_ne!(a.staging_dir, b.staging_dir);
        assert!(a.staging_dir.ends_with(a.id.to_string()));
    }

    #[test]
    fn test_new_upload_discards_previous_result() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockStyleModel::new(dir.path().join("out"));
        let (mut processor, mut session) = setup(dir.path(), model);

        session.upload(&mut processor, &Upload::new("a.png", png(40, 20))).unwrap();
        session.process(&mut processor, Style::Ukiyoe).unwrap();
        assert!(session.has_result());
        assert_eq!(session.style, Style::Ukiyoe);

        let prepared = session.upload(&mut processor, &Upload::new("b.png", png(10, 30))).unwrap();
        assert_eq!(prepared.record.original_size, (10, 30));
        assert!(!session.has_result());
    }

    #[test]
    fn test_failed_upload_keeps_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockStyleModel::new(dir.path().join("out"));
        let (mut processor, mut session) = setup(dir.path(), model);

        session.upload(&mut processor, &Upload::new("a.png", png(40, 20))).unwrap();
        assert!(session.upload(&mut processor, &Upload::new("bad.png", vec![0; 8])).is_err());

        assert!(session.has_image());
        let error = session.last_error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert_eq!(error.message_key, "errors.unreadable_image");
    }

    #[test]
    fn test_model_failure_clears_request() {
        let dir = tempfile::tempdir().unwrap();
        let (mut processor, mut session) =
            setup(dir.path(), MockStyleModel::new_failing(dir.path().join("out")));

        session.upload(&mut processor, &Upload::new("a.png", png(16, 16))).unwrap();
        assert!(session.process(&mut processor, Style::Monet).is_err());
        assert!(!session.processing_requested);
        let error = session.last_error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::ExternalModel);
        assert!(error.details.contains("mock model failure"));
    }

    #[test]
    fn test_process_without_upload() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockStyleModel::new(dir.path().join("out"));
        let (mut processor, mut session) = setup(dir.path(), model);
        assert!(session.process(&mut processor, Style::Monet).is_err());
        assert!(session.last_error.is_some());
        session.clear_error();
        assert!(session.last_error.is_none());
    }

    #[test]
    fn test_close_removes_staging_dir() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockStyleModel::new(dir.path().join("out"));
        let (mut processor, mut session) = setup(dir.path(), model);
        session.upload(&mut processor, &Upload::new("a.png", png(8, 8))).unwrap();
        assert!(session.staging_dir.is_dir());

        session.close().unwrap();
        assert!(!session.staging_dir.exists());
        assert!(!session.has_image());
    }
}
