//! Image I/O operations service
//!
//! Owns every filesystem touch of the pipeline: the single-item staging
//! directory handed to the model, and decoding of the model's output.

use crate::{
    error::{ModelError, Result, StyleTransferError},
    services::OutputFormatHandler,
    config::OutputFormat,
};
use image::{DynamicImage, ImageReader};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension of staged model inputs
pub const STAGED_EXTENSION: &str = "jpg";

/// Service for handling staging-area and image file operations
pub struct ImageIOService;

impl ImageIOService {
    /// Create `dir` (and parents) if missing
    pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| StyleTransferError::storage("create staging directory", dir, e))
    }

    /// Remove every regular file directly inside `dir`
    ///
    /// The directory itself is kept. A missing directory counts as clean.
    /// Returns the number of files removed.
    pub fn clear_staged_files<P: AsRef<Path>>(dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StyleTransferError::storage("list staging directory", dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry =
                entry.map_err(|e| StyleTransferError::storage("list staging directory", dir, e))?;
            let path = entry.path();
            if path.is_file() {
                std::fs::remove_file(&path)
                    .map_err(|e| StyleTransferError::storage("remove staged file", &path, e))?;
                removed += 1;
            }
        }

        if removed > 0 {
            log::debug!("Cleared {} staged file(s) from {}", removed, dir.display());
        }
        Ok(removed)
    }

    /// Encode `image` as JPEG and place it at `<dir>/<base_name>.jpg`
    ///
    /// The bytes go to a temporary file in the same directory first and are
    /// renamed into place, so a failure never leaves a partial staged file.
    pub fn write_staged_jpeg<P: AsRef<Path>>(
        image: &DynamicImage,
        dir: P,
        base_name: &str,
        quality: u8,
    ) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let target = dir.join(format!("{}.{}", base_name, STAGED_EXTENSION));
        let bytes = OutputFormatHandler::encode(image, OutputFormat::Jpeg, quality)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(dir)
            .map_err(|e| StyleTransferError::storage("create temporary staged file", dir, e))?;
        temp.write_all(&bytes)
            .and_then(|()| temp.flush())
            .map_err(|e| StyleTransferError::storage("write staged image", temp.path(), e))?;
        temp.persist(&target)
            .map_err(|e| StyleTransferError::storage("persist staged image", &target, e.error))?;

        log::debug!(
            "Staged {}x{} image at {} ({} bytes)",
            image.width(),
            image.height(),
            target.display(),
            bytes.len()
        );
        Ok(target)
    }

    /// Load an image from a file path
    ///
    /// Tries extension-based format detection first, then content sniffing.
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(StyleTransferError::storage(
                "read image file",
                path_ref,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Trying content detection.",
                    path_ref.display(),
                    e
                );
                let reader = ImageReader::open(path_ref)
                    .and_then(ImageReader::with_guessed_format)
                    .map_err(|io_err| {
                        StyleTransferError::storage("read image data", path_ref, io_err)
                    })?;
                reader.decode().map_err(|content_err| {
                    StyleTransferError::processing(format!(
                        "Failed to load '{}' by extension ({}) or by content ({})",
                        path_ref.display(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Decode the file the model wrote
    pub fn load_model_output<P: AsRef<Path>>(
        path: P,
    ) -> std::result::Result<DynamicImage, ModelError> {
        let path_ref = path.as_ref();
        if !path_ref.is_file() {
            return Err(ModelError::OutputMissing {
                expected: path_ref.to_path_buf(),
            });
        }
        Self::load_image(path_ref).map_err(|e| ModelError::Decode {
            path: path_ref.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Remove a whole session staging directory
    pub fn remove_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
        let dir = dir.as_ref();
        match std::fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StyleTransferError::storage("remove staging directory", dir, e)),
        }
    }

    /// Read an upload from an async reader, stopping one byte past `limit`
    ///
    /// Oversized streams are rejected without buffering them whole.
    pub async fn read_upload<R: tokio::io::AsyncRead + Unpin>(
        reader: R,
        limit: u64,
    ) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        let mut limited = reader.take(limit.saturating_add(1));
        limited.read_to_end(&mut buffer).await?;

        let size_bytes = buffer.len() as u64;
        if size_bytes > limit {
            return Err(StyleTransferError::FileTooLarge {
                size_bytes,
                limit_bytes: limit,
            });
        }
        Ok(buffer)
    }
}
