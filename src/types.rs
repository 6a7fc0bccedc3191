//! Core data types shared between the normalizer, the denormalizer and frontends

use crate::{
    config::OutputFormat,
    error::Result,
    services::OutputFormatHandler,
    styles::Style,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters recorded by the downsampling step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownsampleInfo {
    /// Dimensions before downsampling
    pub original_size: (u32, u32),
    /// Dimensions after downsampling (equal to `original_size` if untouched)
    pub scaled_size: (u32, u32),
    /// Uniform factor applied (1.0 if untouched)
    pub scale_factor: f64,
    /// Whether downsampling occurred
    pub was_resized: bool,
}

impl DownsampleInfo {
    /// Record for an image that was left at its original size
    #[must_use]
    pub fn unchanged(size: (u32, u32)) -> Self {
        Self {
            original_size: size,
            scaled_size: size,
            scale_factor: 1.0,
            was_resized: false,
        }
    }
}

/// Parameters recorded by the letterbox step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareInfo {
    /// Size of the content as placed inside the canvas
    pub scaled_size: (u32, u32),
    /// Top-left canvas coordinate where the content was pasted
    pub offset: (u32, u32),
    /// Factor applied when fitting the content into the canvas
    pub scale_factor: f64,
    /// Canvas edge length
    pub target_size: u32,
    /// Whether letterbox bars are present
    pub has_padding: bool,
}

/// Everything the denormalizer needs to invert the normalizer for one image.
///
/// Produced once per upload and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRecord {
    /// Dimensions of the image as uploaded
    pub original_size: (u32, u32),
    /// Dimensions after the optional downsampling step
    pub scaled_size: (u32, u32),
    /// Downsampling factor (1.0 if none)
    pub scale_factor: f64,
    /// Whether downsampling occurred
    pub was_resized: bool,
    /// Letterbox parameters
    pub square_info: SquareInfo,
}

impl ScaleRecord {
    /// Compose the record from the two forward steps
    #[must_use]
    pub fn new(downsample: DownsampleInfo, square_info: SquareInfo) -> Self {
        Self {
            original_size: downsample.original_size,
            scaled_size: downsample.scaled_size,
            scale_factor: downsample.scale_factor,
            was_resized: downsample.was_resized,
            square_info,
        }
    }

    /// Canvas edge length the model consumes and produces
    #[must_use]
    pub fn target_size(&self) -> u32 {
        self.square_info.target_size
    }
}

/// An uploaded file as received from a frontend
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name
    pub file_name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl Upload {
    #[must_use]
    pub fn new<S: Into<String>>(file_name: S, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Declared size of the upload in bytes
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Result of normalizing and staging one upload
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Unmodified upload, kept for side-by-side display
    pub original: DynamicImage,
    /// Base file name (no extension) used to name model outputs and downloads
    pub base_name: String,
    /// Name of the staged file inside the staging directory
    pub file_name: String,
    /// Full path of the staged square image
    pub staged_path: PathBuf,
    /// Geometry needed to undo the normalization
    pub record: ScaleRecord,
    /// Whether the staged file is on disk and ready for the model
    pub file_ready: bool,
    /// Time spent validating, normalizing and staging
    pub prepare_ms: u64,
}

impl PreparedImage {
    /// Directory the model collaborator reads from
    #[must_use]
    pub fn staging_dir(&self) -> Option<&Path> {
        self.staged_path.parent()
    }
}

/// Timing breakdown for one stylization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Upload decode, validation and normalization
    pub prepare_ms: u64,
    /// External model invocation
    pub inference_ms: u64,
    /// Decoding the model output
    pub output_decode_ms: u64,
    /// Inverse transform back to the original geometry
    pub denormalize_ms: u64,
    /// Whole stylization call
    pub total_ms: u64,
}

/// Denormalized model output ready for display and download
#[derive(Debug, Clone)]
pub struct StyledResult {
    /// Styled image at the original upload size
    pub image: DynamicImage,
    /// Style that produced it
    pub style: Style,
    /// Base name of the upload
    pub base_name: String,
    /// Timing breakdown
    pub timings: ProcessingTimings,
}

impl StyledResult {
    /// Dimensions of the styled image
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Encode the result for download
    ///
    /// `quality` only applies to lossy formats.
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        OutputFormatHandler::encode(&self.image, format, quality)
    }

    /// File name offered for download: `styled_<style>_<base>.<ext>`
    #[must_use]
    pub fn download_name(&self, format: OutputFormat) -> String {
        OutputFormatHandler::download_name(self.style, &self.base_name, format)
    }

    /// Write the encoded result to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat, quality: u8) -> Result<()> {
        let bytes = self.to_bytes(format, quality)?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}
