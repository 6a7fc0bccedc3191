//! Configuration types for style transfer operations

use crate::error::{Result, StyleTransferError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upload byte ceiling (100 MiB)
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
/// Upload per-edge pixel ceiling
pub const MAX_DIMENSION: u32 = 10240;
/// Longest edge kept before letterboxing
pub const MAX_PROCESSING_SIZE: u32 = 1024;
/// Canvas edge length the pretrained model consumes
pub const MODEL_INPUT_SIZE: u32 = 256;

/// Download encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG at full quality
    Png,
    /// Lossy JPEG at a fixed high quality factor
    Jpeg,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = StyleTransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(StyleTransferError::invalid_config(format!(
                "Unknown output format '{}'. Available: png, jpeg",
                other
            ))),
        }
    }
}

/// How to launch the pretrained CycleGAN test script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCommandConfig {
    /// Interpreter or executable to run
    pub program: String,
    /// Script passed as the first argument
    pub script: PathBuf,
    /// Working directory for the process (the model checkout)
    pub working_dir: Option<PathBuf>,
    /// Directory holding `<weights_id>/latest_net_G.pth`
    pub checkpoints_dir: PathBuf,
    /// Directory the script writes `<weights_id>/test_latest/images` into
    pub results_dir: PathBuf,
    /// Additional arguments appended verbatim
    pub extra_args: Vec<String>,
}

impl Default for ModelCommandConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: PathBuf::from("test.py"),
            working_dir: None,
            checkpoints_dir: PathBuf::from("checkpoints"),
            results_dir: PathBuf::from("results"),
            extra_args: Vec::new(),
        }
    }
}

/// Configuration for the style transfer processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Upload byte ceiling
    pub max_file_size: u64,
    /// Upload per-edge pixel ceiling
    pub max_dimension: u32,
    /// Longest edge kept before letterboxing
    pub max_processing_size: u32,
    /// Model canvas edge length
    pub target_size: u32,
    /// JPEG quality of the staged model input (1-100)
    pub staged_jpeg_quality: u8,
    /// JPEG quality of the lossy download (1-100)
    pub download_jpeg_quality: u8,
    /// Letterbox fill color (RGB)
    pub padding_color: [u8; 3],
    /// Root under which each session gets its own staging directory
    pub staging_root: PathBuf,
    /// Optional directory of extra `<locale>.json` translation files
    pub locales_dir: Option<PathBuf>,
    /// Locale used when the requested one lacks a key
    pub default_locale: String,
    /// External model invocation
    pub model: ModelCommandConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_dimension: MAX_DIMENSION,
            max_processing_size: MAX_PROCESSING_SIZE,
            target_size: MODEL_INPUT_SIZE,
            staged_jpeg_quality: 95,
            download_jpeg_quality: 95,
            padding_color: [255, 255, 255], // White padding
            staging_root: default_staging_root(),
            locales_dir: None,
            default_locale: "en".to_string(),
            model: ModelCommandConfig::default(),
        }
    }
}

/// Staging root under the user cache directory, or a relative fallback
fn default_staging_root() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from("staging"),
        |dir| dir.join("painterly").join("staging"),
    )
}

impl ProcessorConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }

    /// Load a configuration file; absent fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            StyleTransferError::invalid_config(format!(
                "Failed to read config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            StyleTransferError::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - All size limits are positive
    /// - `target_size` does not exceed `max_processing_size`
    /// - JPEG qualities: 1-100 (inclusive)
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(StyleTransferError::config_value_error(
                "max file size",
                self.max_file_size,
                "> 0",
                Some(MAX_FILE_SIZE),
            ));
        }
        for (name, value, recommended) in [
            ("max dimension", self.max_dimension, MAX_DIMENSION),
            ("max processing size", self.max_processing_size, MAX_PROCESSING_SIZE),
            ("target size", self.target_size, MODEL_INPUT_SIZE),
        ] {
            if value == 0 {
                return Err(StyleTransferError::config_value_error(
                    name,
                    value,
                    "> 0",
                    Some(recommended),
                ));
            }
        }
        if self.target_size > self.max_processing_size {
            return Err(StyleTransferError::invalid_config(format!(
                "target size {} exceeds max processing size {}",
                self.target_size, self.max_processing_size
            )));
        }
        for (name, quality) in [
            ("staged JPEG quality", self.staged_jpeg_quality),
            ("download JPEG quality", self.download_jpeg_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(StyleTransferError::config_value_error(
                    name,
                    quality,
                    "1-100",
                    Some(95),
                ));
            }
        }
        if self.default_locale.trim().is_empty() {
            return Err(StyleTransferError::invalid_config(
                "default locale must not be empty",
            ));
        }
        Ok(())
    }
}

/// Builder for `ProcessorConfig`
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn max_dimension(mut self, pixels: u32) -> Self {
        self.config.max_dimension = pixels;
        self
    }

    #[must_use]
    pub fn max_processing_size(mut self, pixels: u32) -> Self {
        self.config.max_processing_size = pixels;
        self
    }

    #[must_use]
    pub fn target_size(mut self, pixels: u32) -> Self {
        self.config.target_size = pixels;
        self
    }

    #[must_use]
    pub fn staged_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.staged_jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn download_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.download_jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn padding_color(mut self, color: [u8; 3]) -> Self {
        self.config.padding_color = color;
        self
    }

    #[must_use]
    pub fn staging_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.staging_root = root.into();
        self
    }

    #[must_use]
    pub fn locales_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.locales_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn default_locale<S: Into<String>>(mut self, locale: S) -> Self {
        self.config.default_locale = locale.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: ModelCommandConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ProcessorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
