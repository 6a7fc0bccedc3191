//! Forward geometry: fit an arbitrary upload into the model's square input
//!
//! Two steps run in order. `downsample_to_limit` caps the longest edge, then
//! `letterbox_to_square` scales the result onto a fixed square canvas with
//! centered padding. Both record the parameters needed to undo them.

use crate::types::{DownsampleInfo, ScaleRecord, SquareInfo};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};

/// Resampling filter shared by every resize in both directions
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Longest edge allowed before letterboxing
    pub max_processing_size: u32,
    /// Canvas edge length
    pub target_size: u32,
    /// Padding color for the letterbox bars (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            max_processing_size: crate::config::MAX_PROCESSING_SIZE,
            target_size: crate::config::MODEL_INPUT_SIZE,
            padding_color: [255, 255, 255], // White padding
        }
    }
}

impl From<&crate::config::ProcessorConfig> for PreprocessingOptions {
    fn from(config: &crate::config::ProcessorConfig) -> Self {
        Self {
            max_processing_size: config.max_processing_size,
            target_size: config.target_size,
            padding_color: config.padding_color,
        }
    }
}

/// Normalizer for model input
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Shrink `image` so its longest edge is at most `limit`.
    ///
    /// Images already within the limit are returned unchanged. Otherwise the
    /// long edge becomes exactly `limit` and the short edge is scaled by the
    /// same factor, rounded down.
    #[must_use]
    pub fn downsample_to_limit(image: &DynamicImage, limit: u32) -> (DynamicImage, DownsampleInfo) {
        let (width, height) = image.dimensions();
        let long_edge = width.max(height);

        if long_edge <= limit {
            return (image.clone(), DownsampleInfo::unchanged((width, height)));
        }

        let scaled_size = fit_long_edge((width, height), limit, Rounding::Floor);
        let resized = image.resize_exact(scaled_size.0, scaled_size.1, RESAMPLE_FILTER);

        log::debug!(
            "Downsampled {}x{} to {}x{} (limit {})",
            width,
            height,
            scaled_size.0,
            scaled_size.1,
            limit
        );

        (
            resized,
            DownsampleInfo {
                original_size: (width, height),
                scaled_size,
                scale_factor: f64::from(limit) / f64::from(long_edge),
                was_resized: true,
            },
        )
    }

    /// Scale `image` uniformly to fit a `target_size` square and center it on
    /// a canvas filled with `padding_color`.
    ///
    /// The output is always exactly `target_size × target_size`; content is
    /// never cropped.
    #[must_use]
    pub fn letterbox_to_square(
        image: &DynamicImage,
        target_size: u32,
        padding_color: [u8; 3],
    ) -> (DynamicImage, SquareInfo) {
        let (width, height) = image.dimensions();
        let rgb_image = image.to_rgb8();

        let (new_width, new_height) =
            fit_long_edge((width, height), target_size, Rounding::Nearest);
        let resized: RgbImage = if (new_width, new_height) == (width, height) {
            rgb_image
        } else {
            image::imageops::resize(&rgb_image, new_width, new_height, RESAMPLE_FILTER)
        };

        let mut canvas: RgbImage =
            ImageBuffer::from_pixel(target_size, target_size, Rgb(padding_color));

        // Floor division biases odd remainders toward the top-left.
        let offset_x = (target_size - new_width) / 2;
        let offset_y = (target_size - new_height) / 2;
        image::imageops::replace(&mut canvas, &resized, i64::from(offset_x), i64::from(offset_y));

        let info = SquareInfo {
            scaled_size: (new_width, new_height),
            offset: (offset_x, offset_y),
            scale_factor: f64::from(target_size) / f64::from(width.max(height)),
            target_size,
            has_padding: new_width != target_size || new_height != target_size,
        };

        (DynamicImage::ImageRgb8(canvas), info)
    }

    /// Run both forward steps and compose their parameters
    #[must_use]
    pub fn normalize(
        image: &DynamicImage,
        options: &PreprocessingOptions,
    ) -> (DynamicImage, ScaleRecord) {
        let (downsampled, downsample_info) =
            Self::downsample_to_limit(image, options.max_processing_size);
        let (squared, square_info) =
            Self::letterbox_to_square(&downsampled, options.target_size, options.padding_color);
        (squared, ScaleRecord::new(downsample_info, square_info))
    }
}

#[derive(Debug, Clone, Copy)]
enum Rounding {
    Floor,
    Nearest,
}

/// Scale `size` so its longest edge equals `edge`, preserving aspect ratio.
///
/// Integer arithmetic keeps the long edge exact; the short edge is at least 1.
fn fit_long_edge((width, height): (u32, u32), edge: u32, rounding: Rounding) -> (u32, u32) {
    let long = u64::from(width.max(height));
    let short = u64::from(width.min(height));
    let edge_u64 = u64::from(edge);

    let scaled_short = match rounding {
        Rounding::Floor => short * edge_u64 / long,
        Rounding::Nearest => (2 * short * edge_u64 + long) / (2 * long),
    };
    let scaled_short = u32::try_from(scaled_short).unwrap_or(edge).clamp(1, edge);

    if width >= height {
        (edge, scaled_short)
    } else {
        (scaled_short, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([255, 0, 0])))
    }

    #[test]
    fn test_downsample_within_limit_is_noop() {
        let image = create_test_image(400, 800);
        let (out, info) = ImagePreprocessor::downsample_to_limit(&image, 1024);

        assert_eq!(out.dimensions(), (400, 800));
        assert!(!info.was_resized);
        assert_eq!(info.scaled_size, (400, 800));
        assert!((info.scale_factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_downsample_wide_image() {
        let image = create_test_image(4000, 2000);
        let (out, info) = ImagePreprocessor::downsample_to_limit(&image, 1024);

        assert_eq!(out.dimensions(), (1024, 512));
        assert_eq!(info.scaled_size, (1024, 512));
        assert!(info.was_resized);
        assert!((info.scale_factor - 0.256).abs() < 1e-9);
    }

    #[test]
    fn test_downsample_rounds_short_edge_down() {
        // 3000 * 1024 / 4000 = 768 exactly; 2999 gives 767.74 -> 767
        let image = create_test_image(2999, 4000);
        let (out, info) = ImagePreprocessor::downsample_to_limit(&image, 1024);
        assert_eq!(out.dimensions(), (767, 1024));
        assert_eq!(info.original_size, (2999, 4000));
    }

    #[test]
    fn test_downsample_extreme_aspect_keeps_one_pixel() {
        let image = create_test_image(5000, 1);
        let (out, _) = ImagePreprocessor::downsample_to_limit(&image, 1024);
        assert_eq!(out.dimensions(), (1024, 1));
    }

    #[test]
    fn test_letterbox_portrait() {
        let image = create_test_image(400, 800);
        let (canvas, info) = ImagePreprocessor::letterbox_to_square(&image, 256, [255, 255, 255]);

        assert_eq!(canvas.dimensions(), (256, 256));
        assert_eq!(info.scaled_size, (128, 256));
        assert_eq!(info.offset, (64, 0));
        assert!(info.has_padding);
        assert!((info.scale_factor - 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_letterbox_padding_and_content_pixels() {
        let image = create_test_image(400, 800);
        let (canvas, _) = ImagePreprocessor::letterbox_to_square(&image, 256, [255, 255, 255]);
        let rgb = canvas.to_rgb8();

        // Left bar is white, the middle column is the red content.
        assert_eq!(rgb.get_pixel(10, 128), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(245, 128), &Rgb([255, 255, 255]));
        let center = rgb.get_pixel(128, 128);
        assert!(center[0] > 200 && center[1] < 50 && center[2] < 50);
    }

    #[test]
    fn test_letterbox_square_has_no_padding() {
        let image = create_test_image(300, 300);
        let (canvas, info) = ImagePreprocessor::letterbox_to_square(&image, 256, [255, 255, 255]);
        assert_eq!(canvas.dimensions(), (256, 256));
        assert_eq!(info.scaled_size, (256, 256));
        assert_eq!(info.offset, (0, 0));
        assert!(!info.has_padding);
    }

    #[test]
    fn test_letterbox_odd_remainder_biases_top_left() {
        // 256 * 100 / 201 = 127.36 -> 127, remainder 129 -> offset 64
        let image = create_test_image(201, 100);
        let (_, info) = ImagePreprocessor::letterbox_to_square(&image, 256, [0, 0, 0]);
        assert_eq!(info.scaled_size, (256, 127));
        assert_eq!(info.offset, (0, 64));
    }

    #[test]
    fn test_letterbox_upscales_small_images() {
        let image = create_test_image(32, 16);
        let (_, info) = ImagePreprocessor::letterbox_to_square(&image, 256, [255, 255, 255]);
        assert_eq!(info.scaled_size, (256, 128));
        assert_eq!(info.offset, (0, 64));
    }

    #[test]
    fn test_normalize_composes_record() {
        let image = create_test_image(4000, 2000);
        let (squared, record) =
            ImagePreprocessor::normalize(&image, &PreprocessingOptions::default());

        assert_eq!(squared.dimensions(), (256, 256));
        assert_eq!(record.original_size, (4000, 2000));
        assert_eq!(record.scaled_size, (1024, 512));
        assert_eq!(record.square_info.scaled_size, (256, 128));
        assert_eq!(record.square_info.offset, (0, 64));
    }

    #[test]
    fn test_normalize_respects_custom_padding() {
        let image = create_test_image(100, 50);
        let options = PreprocessingOptions {
            padding_color: [0, 255, 0],
            ..PreprocessingOptions::default()
        };
        let (squared, _) = ImagePreprocessor::normalize(&image, &options);
        assert_eq!(squared.to_rgb8().get_pixel(0, 0), &Rgb([0, 255, 0]));
    }
}
