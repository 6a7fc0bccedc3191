//! Upload validation: byte and pixel ceilings, decoding, file-name hygiene
//!
//! Every check here runs before anything touches the staging directory.

use crate::error::{Result, StyleTransferError};
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Validator for user uploads
pub struct UploadValidator;

impl UploadValidator {
    /// Reject uploads larger than `limit_bytes`
    pub fn check_file_size(size_bytes: u64, limit_bytes: u64) -> Result<()> {
        if size_bytes > limit_bytes {
            return Err(StyleTransferError::FileTooLarge {
                size_bytes,
                limit_bytes,
            });
        }
        Ok(())
    }

    /// Reject images whose longest edge exceeds `limit`
    pub fn check_dimensions(width: u32, height: u32, limit: u32) -> Result<()> {
        if width.max(height) > limit {
            return Err(StyleTransferError::DimensionsTooLarge {
                width,
                height,
                limit,
            });
        }
        if width == 0 || height == 0 {
            return Err(StyleTransferError::unreadable(format!(
                "image has no pixels ({}×{})",
                width, height
            )));
        }
        Ok(())
    }

    /// Read dimensions from the header, check them, then decode the pixels.
    ///
    /// The header check runs first so oversized images are never decoded.
    pub fn decode_checked(bytes: &[u8], max_dimension: u32) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(StyleTransferError::unreadable("upload is empty"));
        }

        let (width, height) = Self::reader(bytes)?
            .into_dimensions()
            .map_err(|e| StyleTransferError::unreadable(e.to_string()))?;
        Self::check_dimensions(width, height, max_dimension)?;

        Self::reader(bytes)?
            .decode()
            .map_err(|e| StyleTransferError::unreadable(e.to_string()))
    }

    fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| StyleTransferError::unreadable(e.to_string()))
    }

    /// Reduce a client-supplied name to a safe base name (no extension).
    ///
    /// Directory components are dropped. Letters and digits of any script
    /// are kept along with `.`, `-` and `_`; everything else becomes `_`.
    /// Empty results fall back to `upload`.
    #[must_use]
    pub fn sanitize_base_name(file_name: &str) -> String {
        let last_component = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .trim();

        let stem = match last_component.rfind('.') {
            Some(0) | None => last_component,
            Some(dot) => last_component.get(..dot).unwrap_or(last_component),
        };

        let cleaned: String = stem
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let cleaned = cleaned.trim_matches('.').to_string();

        if cleaned.is_empty() {
            "upload".to_string()
        } else {
            cleaned
        }
    }
}
