//! Error types for style transfer operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for style transfer operations
pub type Result<T> = std::result::Result<T, StyleTransferError>;

/// Errors raised by the external model collaborator
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model process could not be started
    #[error("failed to launch model process '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The model process ran but reported failure
    #[error("model process exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The model finished but its output file never appeared
    #[error("model output missing: expected '{}'", .expected.display())]
    OutputMissing { expected: PathBuf },

    /// The model produced a file that could not be decoded as an image
    #[error("model output '{}' could not be decoded: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// Results of an earlier run could not be removed before launching
    #[error("failed to clear previous model results '{}': {source}", .path.display())]
    StaleResults {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification used by frontends to choose how to present an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upload rejected before any side effect
    Validation,
    /// Staging area could not be written or cleaned
    Storage,
    /// External model failed
    ExternalModel,
    /// Configuration or internal failure
    Internal,
}

/// Comprehensive error types for style transfer operations
#[derive(Error, Debug)]
pub enum StyleTransferError {
    /// Upload exceeds the byte ceiling
    #[error("File is too large ({:.1} MB). Max: {:.1} MB", mib(.size_bytes), mib(.limit_bytes))]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    /// Upload exceeds the per-edge pixel ceiling
    #[error("The image is too large ({width}×{height}). Max: {limit}×{limit} pixels")]
    DimensionsTooLarge { width: u32, height: u32, limit: u32 },

    /// Upload could not be decoded as an image
    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    /// Staging area write or cleanup failure
    #[error("Failed to {operation} '{}': {source}", .path.display())]
    Storage {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External model collaborator failure
    #[error("Model error: {0}")]
    ExternalModel(#[from] ModelError),

    /// Input/output errors outside the staging area
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Processing errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

#[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

impl StyleTransferError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a new unreadable image error
    pub fn unreadable<S: Into<String>>(msg: S) -> Self {
        Self::UnreadableImage(msg.into())
    }

    /// Create a staging storage error with operation context
    pub fn storage<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Classify the error for presentation
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileTooLarge { .. }
            | Self::DimensionsTooLarge { .. }
            | Self::UnreadableImage(_) => ErrorKind::Validation,
            Self::Storage { .. }
            | Self::Io(_)
            | Self::ExternalModel(ModelError::StaleResults { .. }) => ErrorKind::Storage,
            Self::ExternalModel(_) => ErrorKind::ExternalModel,
            Self::Image(_) | Self::InvalidConfig(_) | Self::Processing(_) | Self::Internal(_) => {
                ErrorKind::Internal
            },
        }
    }

    /// Whether the error rejected an upload before anything was written
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Translation key of the short message shown to users
    ///
    /// The full `Display` text stays available as diagnostics.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "errors.file_too_large",
            Self::DimensionsTooLarge { .. } => "errors.dimensions_too_large",
            Self::UnreadableImage(_) => "errors.unreadable_image",
            Self::Storage { .. }
            | Self::Io(_)
            | Self::ExternalModel(ModelError::StaleResults { .. }) => "errors.storage",
            Self::ExternalModel(ModelError::OutputMissing { .. }) => "errors.model_output_missing",
            Self::ExternalModel(_) => "errors.model_failed",
            Self::Image(_) | Self::InvalidConfig(_) | Self::Processing(_) | Self::Internal(_) => {
                "errors.internal"
            },
        }
    }

    /// Placeholder arguments for the message named by [`Self::message_key`]
    #[must_use]
    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::FileTooLarge {
                size_bytes,
                limit_bytes,
            } => vec![
                ("size", format!("{:.1}", mib(size_bytes))),
                ("limit", format!("{:.1}", mib(limit_bytes))),
            ],
            Self::DimensionsTooLarge {
                width,
                height,
                limit,
            } => vec![
                ("width", width.to_string()),
                ("height", height.to_string()),
                ("limit", limit.to_string()),
            ],
            _ => Vec::new(),
        }
    }
}
