//! Geometry and validation utilities

pub mod postprocessing;
pub mod preprocessing;
pub mod validation;

pub use postprocessing::ImagePostprocessor;
pub use preprocessing::{ImagePreprocessor, PreprocessingOptions, RESAMPLE_FILTER};
pub use validation::UploadValidator;
