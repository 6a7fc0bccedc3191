//! Output format handling service
//!
//! This module separates download encoding from business logic,
//! making the system more testable and maintainable.

use crate::{
    config::OutputFormat,
    error::{Result, StyleTransferError},
    styles::Style,
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat};
use std::io::Cursor;

/// Service for encoding styled results into download formats
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an image into the given download format
    ///
    /// # Arguments
    /// * `image` - Image to encode
    /// * `format` - Target output format
    /// * `quality` - JPEG quality (1-100), ignored for PNG
    ///
    /// # Examples
    /// ```rust
    /// use painterly::{services::OutputFormatHandler, config::OutputFormat};
    /// use image::DynamicImage;
    ///
    /// let image = DynamicImage::new_rgb8(8, 8);
    /// let bytes = OutputFormatHandler::encode(&image, OutputFormat::Png, 95)?;
    /// assert_eq!(&bytes[1..4], b"PNG");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match format {
            OutputFormat::Png => {
                image
                    .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                    .map_err(|e| {
                        StyleTransferError::processing(format!("Failed to encode PNG: {}", e))
                    })?;
            },
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb_image = image.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                encoder.encode_image(&rgb_image).map_err(|e| {
                    StyleTransferError::processing(format!("Failed to encode JPEG: {}", e))
                })?;
            },
        }
        log::debug!("Encoded {} bytes as {}", buffer.len(), format);
        Ok(buffer)
    }

    /// Get the file extension for a given output format (without the dot)
    ///
    /// ```rust
    /// use painterly::{services::OutputFormatHandler, config::OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// MIME type sent with downloads
    #[must_use]
    pub fn content_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// Whether the format discards detail
    #[must_use]
    pub fn is_lossy(format: OutputFormat) -> bool {
        matches!(format, OutputFormat::Jpeg)
    }

    /// Download file name: `styled_<style>_<base>.<ext>`
    #[must_use]
    pub fn download_name(style: Style, base_name: &str, format: OutputFormat) -> String {
        format!(
            "styled_{}_{}.{}",
            style.key(),
            base_name,
            Self::get_extension(format)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn test_encode_png_is_lossless() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([12, 34, 56, 255])));
        let bytes = OutputFormatHandler::encode(&image, OutputFormat::Png, 95).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.to_rgba8().get_pixel(1, 1), &Rgba([12, 34, 56, 255]));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([200, 0, 0, 128])));
        let bytes = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 95).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let mut noisy = RgbaImage::new(64, 64);
        for (x, y, pixel) in noisy.enumerate_pixels_mut() {
            let v = ((x * 31 + y * 17) % 256) as u8;
            *pixel = Rgba([v, v.wrapping_mul(3), v.wrapping_add(90), 255]);
        }
        let image = DynamicImage::ImageRgba8(noisy);
        let high = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 95).unwrap();
        let low = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 10).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_get_extension_and_content_type() {
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
        assert_eq!(OutputFormatHandler::content_type(OutputFormat::Jpeg), "image/jpeg");
        assert!(OutputFormatHandler::is_lossy(OutputFormat::Jpeg));
        assert!(!OutputFormatHandler::is_lossy(OutputFormat::Png));
    }

    #[test]
    fn test_download_name() {
        assert_eq!(
            OutputFormatHandler::download_name(Style::Vangogh, "harbor", OutputFormat::Jpeg),
            "styled_vangogh_harbor.jpg"
        );
        assert_eq!(
            OutputFormatHandler::download_name(Style::Ukiyoe, "a.b", OutputFormat::Png),
            "styled_ukiyoe_a.b.png"
        );
    }
}
