//! Unified style transfer processor
//!
//! This module provides the main `StyleTransferProcessor` that consolidates
//! the round trip around the external model: validate and normalize an
//! upload, stage it, invoke the model, and map the output back onto the
//! original geometry. Both the CLI and the web form drive it.

use crate::{
    config::ProcessorConfig,
    error::{Result, StyleTransferError},
    inference::StyleModel,
    services::{ImageIOService, ProcessingStage, ProgressReporter, ProgressTracker},
    styles::Style,
    tracing_config::spans,
    types::{PreparedImage, ProcessingTimings, StyledResult, Upload},
    utils::{ImagePostprocessor, ImagePreprocessor, PreprocessingOptions, UploadValidator},
};
use image::GenericImageView;
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use tracing::{info as trace_info, instrument, warn as trace_warn};

/// Style transfer processor that consolidates all business logic
pub struct StyleTransferProcessor {
    config: ProcessorConfig,
    model: Box<dyn StyleModel>,
    progress_tracker: Option<ProgressTracker>,
}

impl StyleTransferProcessor {
    /// Create a new processor around a model backend
    ///
    /// # Errors
    ///
    /// Returns `StyleTransferError::InvalidConfig` if the configuration fails validation.
    pub fn new(config: ProcessorConfig, model: Box<dyn StyleModel>) -> Result<Self> {
        config.validate()?;
        info!(
            "Style transfer processor ready (model backend: {}, target size: {})",
            model.name(),
            config.target_size
        );
        Ok(Self {
            config,
            model,
            progress_tracker: None,
        })
    }

    /// Attach a progress reporter
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.set_progress_reporter(reporter);
        self
    }

    /// Replace the progress reporter
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.progress_tracker = Some(ProgressTracker::new(reporter));
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Name of the model backend
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Validate an upload, normalize it and stage it for the model
    ///
    /// At most one staged image lives in `staging_dir`: earlier staged files
    /// are removed before the new one is written. Validation runs before any
    /// filesystem change, so a rejected upload leaves the directory as it was.
    ///
    /// # Errors
    ///
    /// - `FileTooLarge` / `DimensionsTooLarge` / `UnreadableImage` for bad uploads
    /// - `Storage` if the staging directory cannot be prepared or written
    #[instrument(
        skip_all,
        fields(file = %upload.file_name, size_bytes = upload.size_bytes())
    )]
    pub fn save_and_prepare_image(
        &mut self,
        upload: &Upload,
        staging_dir: &Path,
    ) -> Result<PreparedImage> {
        let start = Instant::now();
        self.restart_progress();
        self.report_stage(ProcessingStage::Validating);

        let original = self.track(|config| {
            UploadValidator::check_file_size(upload.size_bytes(), config.max_file_size)?;
            UploadValidator::decode_checked(&upload.bytes, config.max_dimension)
        })?;
        let base_name = UploadValidator::sanitize_base_name(&upload.file_name);

        self.report_stage(ProcessingStage::Normalizing);
        let (square, record) = {
            let (width, height) = original.dimensions();
            let _span = spans::normalize((width, height), self.config.target_size).entered();
            ImagePreprocessor::normalize(&original, &PreprocessingOptions::from(&self.config))
        };
        debug!(
            "Normalized {}x{} -> scaled {:?}, content {:?} at offset {:?}",
            record.original_size.0,
            record.original_size.1,
            record.scaled_size,
            record.square_info.scaled_size,
            record.square_info.offset
        );

        self.report_stage(ProcessingStage::Staging);
        let quality = self.config.staged_jpeg_quality;
        let staged_path = self.track(|_| {
            ImageIOService::ensure_dir(staging_dir)?;
            ImageIOService::clear_staged_files(staging_dir)?;
            ImageIOService::write_staged_jpeg(&square, staging_dir, &base_name, quality)
        })?;

        let file_name = staged_path
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        let prepare_ms = start.elapsed().as_millis() as u64;

        trace_info!(
            staged = %staged_path.display(),
            was_resized = record.was_resized,
            has_padding = record.square_info.has_padding,
            prepare_ms,
            "Upload staged"
        );

        Ok(PreparedImage {
            original,
            base_name,
            file_name,
            staged_path,
            record,
            file_ready: true,
            prepare_ms,
        })
    }

    /// Read an upload from an async stream, then prepare it
    ///
    /// The byte ceiling is enforced while reading.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save_and_prepare_image`], plus `Io` for stream failures.
    pub async fn prepare_from_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        reader: R,
        file_name: &str,
        staging_dir: &Path,
    ) -> Result<PreparedImage> {
        let bytes = ImageIOService::read_upload(reader, self.config.max_file_size).await?;
        self.save_and_prepare_image(&Upload::new(file_name, bytes), staging_dir)
    }

    /// Run the model on a staged image and restore the original geometry
    ///
    /// The model call blocks until it finishes; it is never retried.
    ///
    /// # Errors
    ///
    /// - `Storage` if the staged file is gone
    /// - `ExternalModel` if the model fails or its output is missing or unreadable
    #[instrument(
        skip_all,
        fields(
            style = %style,
            base = %prepared.base_name,
            backend = %self.model.name()
        )
    )]
    pub fn stylize(&mut self, prepared: &PreparedImage, style: Style) -> Result<StyledResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings {
            prepare_ms: prepared.prepare_ms,
            ..ProcessingTimings::default()
        };
        self.restart_progress();

        if !prepared.file_ready || !prepared.staged_path.is_file() {
            let err = StyleTransferError::storage(
                "read staged image",
                &prepared.staged_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "staged image is missing"),
            );
            self.report_error(&err);
            return Err(err);
        }

        self.report_stage(ProcessingStage::Inference);
        let output_path = {
            let _span = spans::inference(style.weights_id(), self.model.name()).entered();
            let inference_start = Instant::now();
            let result = self
                .model
                .invoke(&prepared.staged_path, style.weights_id())
                .map_err(StyleTransferError::from);
            timings.inference_ms = inference_start.elapsed().as_millis() as u64;
            self.track(|_| result)?
        };

        self.report_stage(ProcessingStage::OutputDecoding);
        let decode_start = Instant::now();
        let styled_square = self.track(|_| {
            ImageIOService::load_model_output(&output_path).map_err(StyleTransferError::from)
        })?;
        timings.output_decode_ms = decode_start.elapsed().as_millis() as u64;

        let target = prepared.record.target_size();
        if styled_square.dimensions() != (target, target) {
            trace_warn!(
                width = styled_square.width(),
                height = styled_square.height(),
                expected = target,
                "Model output is not the canvas size; resizing before crop"
            );
        }

        self.report_stage(ProcessingStage::Denormalizing);
        let image = {
            let _span = spans::denormalize(prepared.record.original_size).entered();
            let denormalize_start = Instant::now();
            let image =
                ImagePostprocessor::scale_back_to_original(&styled_square, Some(&prepared.record));
            timings.denormalize_ms = denormalize_start.elapsed().as_millis() as u64;
            image
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.report_completion(timings.clone());
        }

        trace_info!(
            width = image.width(),
            height = image.height(),
            inference_ms = timings.inference_ms,
            total_ms = timings.total_ms,
            "Style transfer completed"
        );

        Ok(StyledResult {
            image,
            style,
            base_name: prepared.base_name.clone(),
            timings,
        })
    }

    /// Prepare an upload and stylize it in one call
    ///
    /// # Errors
    ///
    /// Any error of [`Self::save_and_prepare_image`] or [`Self::stylize`].
    pub fn process_upload(
        &mut self,
        upload: &Upload,
        staging_dir: &Path,
        style: Style,
    ) -> Result<(PreparedImage, StyledResult)> {
        let prepared = self.save_and_prepare_image(upload, staging_dir)?;
        let result = self.stylize(&prepared, style)?;
        Ok((prepared, result))
    }

    fn restart_progress(&mut self) {
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.restart();
        }
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.report_stage(stage);
        }
    }

    fn report_error(&self, err: &StyleTransferError) {
        if let Some(tracker) = self.progress_tracker.as_ref() {
            tracker.report_error(&err.to_string());
        }
    }

    /// Run a step, forwarding any failure to the progress reporter
    fn track<T>(&self, step: impl FnOnce(&ProcessorConfig) -> Result<T>) -> Result<T> {
        step(&self.config).map_err(|err| {
            self.report_error(&err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockStyleModel;
    use crate::error::ErrorKind;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_upload(name: &str, width: u32, height: u32) -> Upload {
        let img = RgbImage::from_pixel(width, height, Rgb([180, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        Upload::new(name, out.into_inner())
    }

    fn processor(results: &Path) -> StyleTransferProcessor {
        StyleTransferProcessor::new(
            ProcessorConfig::default(),
            Box::new(MockStyleModel::new(results)),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ProcessorConfig::default();
        config.target_size = 0;
        let dir = tempfile::tempdir().unwrap();
        let model = MockStyleModel::new(dir.path());
        assert!(StyleTransferProcessor::new(config, Box::new(model)).is_err());
    }

    #[test]
    fn test_prepare_stages_single_square_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("stage");
        let mut processor = processor(&dir.path().join("results"));

        let first = processor
            .save_and_prepare_image(&png_upload("first.png", 400, 800), &staging)
            .unwrap();
        assert!(first.file_ready);
        assert_eq!(first.file_name, "first.jpg");
        assert_eq!(first.record.square_info.offset, (64, 0));

        let second = processor
            .save_and_prepare_image(&png_upload("../second photo.png", 300, 100), &staging)
            .unwrap();
        assert_eq!(second.base_name, "second_photo");
        assert!(!first.staged_path.exists());

        let staged = image::open(&second.staged_path).unwrap();
        assert_eq!(staged.dimensions(), (256, 256));
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 1);
    }

    #[test]
    fn test_rejected_upload_leaves_staging_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("stage");
        let mut processor = processor(&dir.path().join("results"));

        let kept = processor
            .save_and_prepare_image(&png_upload("kept.png", 64, 64), &staging)
            .unwrap();

        let err = processor
            .save_and_prepare_image(&Upload::new("broken.jpg", b"nope".to_vec()), &staging)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(kept.staged_path.exists());
    }

    #[test]
    fn test_unwritable_staging_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("stage");
        std::fs::write(&staging, b"not a directory").unwrap();
        let mut processor = processor(&dir.path().join("results"));

        let err = processor
            .save_and_prepare_image(&png_upload("a.png", 32, 32), &staging)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.message_key(), "errors.storage");
        assert!(staging.is_file());
    }

    #[test]
    fn test_blocked_staged_name_stops_before_model() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("stage");
        std::fs::create_dir_all(staging.join("harbor.jpg")).unwrap();
        let model = MockStyleModel::new(dir.path().join("results"));
        let mut processor =
            StyleTransferProcessor::new(ProcessorConfig::default(), Box::new(model.clone()))
                .unwrap();

        let err = processor
            .process_upload(&png_upload("harbor.png", 32, 32), &staging, Style::Monet)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(model.get_call_history().is_empty());
        assert!(staging.join("harbor.jpg").is_dir());
    }

    #[test]
    fn test_stylize_restores_original_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut processor = processor(&dir.path().join("results"));
        let (prepared, result) = processor
            .process_upload(
                &png_upload("wide.png", 1500, 600),
                &dir.path().join("stage"),
                Style::Cezanne,
            )
            .unwrap();

        assert_eq!(result.dimensions(), (1500, 600));
        assert_eq!(result.style, Style::Cezanne);
        assert_eq!(result.base_name, "wide");
        assert_eq!(result.timings.prepare_ms, prepared.prepare_ms);
        assert!(prepared.record.was_resized);
    }

    #[test]
    fn test_stylize_surfaces_model_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut processor = StyleTransferProcessor::new(
            ProcessorConfig::default(),
            Box::new(MockStyleModel::new_missing_output(dir.path().join("results"))),
        )
        .unwrap();

        let prepared = processor
            .save_and_prepare_image(&png_upload("a.png", 32, 32), &dir.path().join("stage"))
            .unwrap();
        let err = processor.stylize(&prepared, Style::Monet).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalModel);
        assert_eq!(err.message_key(), "errors.model_output_missing");
    }

    #[test]
    fn test_stylize_requires_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut processor = processor(&dir.path().join("results"));
        let mut prepared = processor
            .save_and_prepare_image(&png_upload("a.png", 32, 32), &dir.path().join("stage"))
            .unwrap();
        std::fs::remove_file(&prepared.staged_path).unwrap();

        let err = processor.stylize(&prepared, Style::Monet).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        prepared.file_ready = false;
        assert!(processor.stylize(&prepared, Style::Monet).is_err());
    }

    #[tokio::test]
    async fn test_prepare_from_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut processor = processor(&dir.path().join("results"));
        let upload = png_upload("stream.png", 20, 10);

        let prepared = processor
            .prepare_from_reader(&upload.bytes[..], "stream.png", &dir.path().join("stage"))
            .await
            .unwrap();
        assert_eq!(prepared.record.original_size, (20, 10));
    }
}
