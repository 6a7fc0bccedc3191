//! Inverse geometry: map the model's square output back onto the upload
//!
//! Undoes the two forward steps in reverse order: crop the letterbox bars,
//! restore the downsampled size, then restore the original size.

use super::preprocessing::RESAMPLE_FILTER;
use crate::types::ScaleRecord;
use image::{DynamicImage, GenericImageView};

/// Denormalizer for model output
pub struct ImagePostprocessor;

impl ImagePostprocessor {
    /// Reconstruct an image with the upload's framing and exact dimensions.
    ///
    /// A missing record returns the input unchanged. Output of any other size
    /// than the canvas is first resized to `target_size × target_size`.
    #[must_use]
    pub fn scale_back_to_original(
        styled_image: &DynamicImage,
        record: Option<&ScaleRecord>,
    ) -> DynamicImage {
        let Some(record) = record else {
            return styled_image.clone();
        };

        let target_size = record.target_size();
        let (original_width, original_height) = record.original_size;

        let canvas = if styled_image.dimensions() == (target_size, target_size) {
            styled_image.clone()
        } else {
            log::debug!(
                "Model output is {}x{}, resizing to {}x{} canvas",
                styled_image.width(),
                styled_image.height(),
                target_size,
                target_size
            );
            styled_image.resize_exact(target_size, target_size, RESAMPLE_FILTER)
        };

        let Some(cropped) = Self::crop_content(&canvas, record) else {
            log::warn!(
                "Letterbox region of {:?} at {:?} is empty on a {}px canvas; resizing full canvas",
                record.square_info.scaled_size,
                record.square_info.offset,
                target_size
            );
            return canvas.resize_exact(original_width, original_height, RESAMPLE_FILTER);
        };

        let restored = if record.scaled_size != record.original_size
            && cropped.dimensions() != record.scaled_size
        {
            let (intermediate_width, intermediate_height) = record.scaled_size;
            cropped.resize_exact(intermediate_width, intermediate_height, RESAMPLE_FILTER)
        } else {
            cropped
        };

        if restored.dimensions() == record.original_size {
            restored
        } else {
            restored.resize_exact(original_width, original_height, RESAMPLE_FILTER)
        }
    }

    /// Cut the non-padding region out of the canvas.
    ///
    /// Bounds are clamped to the canvas; `None` when the clamped region is empty.
    fn crop_content(canvas: &DynamicImage, record: &ScaleRecord) -> Option<DynamicImage> {
        let target_size = record.target_size();
        let (x_offset, y_offset) = record.square_info.offset;
        let (scaled_width, scaled_height) = record.square_info.scaled_size;

        let right = x_offset.saturating_add(scaled_width).min(target_size);
        let bottom = y_offset.saturating_add(scaled_height).min(target_size);

        if right <= x_offset || bottom <= y_offset {
            return None;
        }

        Some(canvas.crop_imm(x_offset, y_offset, right - x_offset, bottom - y_offset))
    }
}
