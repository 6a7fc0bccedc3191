//! Backend implementations of the external model port
//!
//! - Command backend (runs the pretrained CycleGAN test script as a subprocess)

pub mod command;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

pub use self::command::CommandStyleModel;
