#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Painterly
//!
//! Repaint photographs in the style of a famous painter using pretrained
//! CycleGAN generators.
//!
//! The library owns everything around the model: upload validation,
//! geometric normalization to the square model canvas, staging the model
//! input, invoking the external model, and restoring the result to the exact
//! size of the original upload.
//!
//! ## Features
//!
//! - **Four styles**: Claude Monet, Ukiyo-e, Paul Cézanne, Vincent van Gogh
//! - **Geometry round trip**: downsample, letterbox, crop and upscale back with Lanczos3
//! - **Upload limits**: byte and per-edge pixel ceilings checked before any file is written
//! - **External model**: the pretrained test script runs as a subprocess behind
//!   the [`StyleModel`] trait
//! - **Localized web form**: English and Russian out of the box (enable with `web` feature)
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use painterly::{stylize_from_reader, CommandStyleModel, ProcessorConfig, Style};
//! use tokio::fs::File;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProcessorConfig::builder()
//!     .staging_root("/tmp/painterly")
//!     .build()?;
//! let model = CommandStyleModel::new(config.model.clone(), config.target_size);
//!
//! let file = File::open("harbor.jpg").await?;
//! let result =
//!     stylize_from_reader(file, "harbor.jpg", Style::Monet, config, Box::new(model)).await?;
//! result.save("styled_monet_harbor.png", painterly::OutputFormat::Png, 100)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and progress bar
//! - `web` (default): Interactive upload form served with `tiny_http`
//! - `tracing-json`: JSON log output
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! painterly = { version = "0.1", default-features = false }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod i18n;
pub mod inference;
pub mod processor;
pub mod services;
pub mod session;
pub mod styles;
pub mod tracing_config;
pub mod types;
pub mod utils;
#[cfg(feature = "web")]
pub mod web;

use tokio::io::AsyncRead;

// Public API exports
pub use backends::CommandStyleModel;
pub use config::{ModelCommandConfig, OutputFormat, ProcessorConfig, ProcessorConfigBuilder};
pub use error::{ErrorKind, ModelError, Result, StyleTransferError};
pub use i18n::Translator;
pub use inference::StyleModel;
pub use processor::StyleTransferProcessor;
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use session::{SessionContext, SessionError};
pub use styles::Style;
pub use types::{PreparedImage, ProcessingTimings, ScaleRecord, StyledResult, Upload};
pub use utils::{ImagePostprocessor, ImagePreprocessor, PreprocessingOptions, UploadValidator};

pub use tracing_config::{spans, TracingConfig, TracingFormat};
#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;

/// Stylize an image read from an async stream
///
/// The upload is staged in a fresh directory under the configured staging
/// root, which is removed again once the model has run.
///
/// # Examples
///
/// ```rust,no_run
/// use painterly::{stylize_from_reader, CommandStyleModel, ProcessorConfig, Style};
/// use std::io::Cursor;
///
/// # async fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let config = ProcessorConfig::default();
/// let model = CommandStyleModel::new(config.model.clone(), config.target_size);
/// let result = stylize_from_reader(
///     Cursor::new(upload_bytes),
///     "upload.png",
///     Style::Vangogh,
///     config,
///     Box::new(model),
/// )
/// .await?;
/// let jpeg = result.to_bytes(painterly::OutputFormat::Jpeg, 95)?;
/// # Ok(())
/// # }
/// ```
pub async fn stylize_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    file_name: &str,
    style: Style,
    config: ProcessorConfig,
    model: Box<dyn StyleModel>,
) -> Result<StyledResult> {
    let staging_dir = config
        .staging_root
        .join(format!("run-{}", uuid::Uuid::new_v4()));
    let mut processor = StyleTransferProcessor::new(config, model)?;

    let outcome = match processor
        .prepare_from_reader(reader, file_name, &staging_dir)
        .await
    {
        Ok(prepared) => processor.stylize(&prepared, style),
        Err(e) => Err(e),
    };

    if let Err(e) = ImageIOService::remove_dir(&staging_dir) {
        log::warn!("Failed to remove staging directory {}: {}", staging_dir.display(), e);
    }
    outcome
}
