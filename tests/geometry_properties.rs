//! Property and scenario tests for the normalize / denormalize round trip

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use painterly::{
    config::{MAX_FILE_SIZE, MAX_PROCESSING_SIZE, MODEL_INPUT_SIZE},
    utils::{ImagePostprocessor, ImagePreprocessor, PreprocessingOptions, UploadValidator},
    ProcessorConfig, StyleTransferError, StyleTransferProcessor, Upload,
};

const WHITE: [u8; 3] = [255, 255, 255];

/// Sizes covering square, portrait, landscape, extreme ratios and oversized inputs
const SIZES: &[(u32, u32)] = &[
    (1, 1),
    (1, 300),
    (300, 1),
    (17, 31),
    (256, 256),
    (255, 257),
    (400, 800),
    (640, 480),
    (1024, 1024),
    (1025, 700),
    (1500, 600),
    (2000, 4000),
    (3000, 7),
];

fn gradient(width: u32, height: u32) -> DynamicImage {
    let mut image = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, 128]);
    }
    DynamicImage::ImageRgb8(image)
}

fn model_output() -> DynamicImage {
    let image = RgbImage::from_pixel(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, Rgb([9, 9, 9]));
    DynamicImage::ImageRgb8(image)
}

#[test]
fn test_round_trip_identity_for_small_squares() {
    for edge in [1, 64, 256, 700, MAX_PROCESSING_SIZE] {
        let image = gradient(edge, edge);
        let (square, record) =
            ImagePreprocessor::normalize(&image, &PreprocessingOptions::default());
        let restored = ImagePostprocessor::scale_back_to_original(&square, Some(&record));

        assert!(!record.was_resized);
        assert!(!record.square_info.has_padding);
        assert_eq!(restored.dimensions(), (edge, edge));
    }
}

#[test]
fn test_letterbox_is_always_target_square() {
    for &(width, height) in SIZES {
        for target in [32, 256, 300] {
            let (square, info) =
                ImagePreprocessor::letterbox_to_square(&gradient(width, height), target, WHITE);
            assert_eq!(square.dimensions(), (target, target), "{}x{} -> {}", width, height, target);
            assert_eq!(info.target_size, target);
        }
    }
}

#[test]
fn test_aspect_ratio_preserved_within_one_pixel() {
    for &(width, height) in SIZES {
        let image = gradient(width, height);
        let (_, record) = ImagePreprocessor::normalize(&image, &PreprocessingOptions::default());
        let (scaled_w, scaled_h) = record.square_info.scaled_size;

        // Compare cross products to avoid dividing by a 1-pixel edge
        let expected_h = f64::from(scaled_w) * f64::from(height) / f64::from(width);
        let expected_w = f64::from(scaled_h) * f64::from(width) / f64::from(height);
        let ok = (f64::from(scaled_h) - expected_h).abs() <= 1.0
            || (f64::from(scaled_w) - expected_w).abs() <= 1.0;
        assert!(ok, "{}x{} scaled to {}x{}", width, height, scaled_w, scaled_h);
        assert!(scaled_w >= 1 && scaled_h >= 1);
    }
}

#[test]
fn test_denormalize_restores_original_size() {
    for &(width, height) in SIZES {
        let image = gradient(width, height);
        let (_, record) = ImagePreprocessor::normalize(&image, &PreprocessingOptions::default());
        let restored = ImagePostprocessor::scale_back_to_original(&model_output(), Some(&record));
        assert_eq!(restored.dimensions(), (width, height));
        assert_eq!(record.original_size, (width, height));
    }
}

#[test]
fn test_offsets_stay_inside_canvas() {
    for &(width, height) in SIZES {
        let image = gradient(width, height);
        let (_, record) = ImagePreprocessor::normalize(&image, &PreprocessingOptions::default());
        let info = record.square_info;
        assert!(info.offset.0 + info.scaled_size.0 <= info.target_size);
        assert!(info.offset.1 + info.scaled_size.1 <= info.target_size);
    }
}

#[test]
fn test_portrait_without_downsample() {
    let (_, record) =
        ImagePreprocessor::normalize(&gradient(400, 800), &PreprocessingOptions::default());

    assert!(!record.was_resized);
    assert_eq!(record.square_info.scaled_size, (128, 256));
    assert_eq!(record.square_info.offset, (64, 0));
    assert!(record.square_info.has_padding);

    let restored = ImagePostprocessor::scale_back_to_original(&model_output(), Some(&record));
    assert_eq!(restored.dimensions(), (400, 800));
}

#[test]
fn test_oversized_wide_image_downsampled() {
    let (_, record) =
        ImagePreprocessor::normalize(&gradient(4000, 2000), &PreprocessingOptions::default());

    assert!(record.was_resized);
    assert_eq!(record.scaled_size, (1024, 512));
    assert!((record.scale_factor - 0.256).abs() < 1e-9);
    assert_eq!(record.square_info.scaled_size, (256, 128));
    assert_eq!(record.square_info.offset, (0, 64));

    let restored = ImagePostprocessor::scale_back_to_original(&model_output(), Some(&record));
    assert_eq!(restored.dimensions(), (4000, 2000));
}

#[test]
fn test_oversized_upload_rejected_without_staging() {
    let size = 150 * 1024 * 1024;
    let err = UploadValidator::check_file_size(size, MAX_FILE_SIZE).unwrap_err();
    assert!(matches!(err, StyleTransferError::FileTooLarge { .. }));

    struct Unused;
    impl painterly::StyleModel for Unused {
        fn invoke(
            &mut self,
            _: &std::path::Path,
            _: &str,
        ) -> Result<std::path::PathBuf, painterly::ModelError> {
            panic!("model must not run for a rejected upload");
        }
        fn name(&self) -> &str {
            "unused"
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("session");
    let config = ProcessorConfig::builder().staging_root(dir.path()).build().unwrap();
    let mut processor = StyleTransferProcessor::new(config, Box::new(Unused)).unwrap();

    let upload = Upload::new("huge.png", vec![0u8; size as usize]);
    let err = processor.save_and_prepare_image(&upload, &staging).unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.message_key(), "errors.file_too_large");
    assert!(!staging.exists());
}
