//! Subprocess backend for the pretrained CycleGAN test script
//!
//! Runs the script against a single-item staging directory and locates its
//! output by naming convention:
//! `<results_dir>/<weights_id>/test_latest/images/<base>_fake.png`.

use crate::{
    config::ModelCommandConfig,
    error::ModelError,
    inference::{output_file_name, StyleModel},
};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Longest stderr tail kept in error reports
const STDERR_TAIL_CHARS: usize = 2000;

/// Model backend that shells out to the CycleGAN test script
#[derive(Debug, Clone)]
pub struct CommandStyleModel {
    config: ModelCommandConfig,
    target_size: u32,
}

impl CommandStyleModel {
    /// Create a backend; `target_size` is passed as load and crop size
    #[must_use]
    pub fn new(config: ModelCommandConfig, target_size: u32) -> Self {
        Self {
            config,
            target_size,
        }
    }

    /// Resolve a configured path against the working directory
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.config.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Directory the script writes results for `weights_id` into
    #[must_use]
    pub fn results_dir_for(&self, weights_id: &str) -> PathBuf {
        self.resolve(&self.config.results_dir).join(weights_id)
    }

    /// Where the styled image for `staged_image` is expected to appear
    #[must_use]
    pub fn expected_output(&self, staged_image: &Path, weights_id: &str) -> PathBuf {
        self.results_dir_for(weights_id)
            .join("test_latest")
            .join("images")
            .join(output_file_name(staged_image))
    }

    /// Build the script invocation for one staged image
    #[must_use]
    pub fn build_command(&self, staged_image: &Path, weights_id: &str) -> Command {
        let dataroot = staged_image
            .parent()
            .map_or_else(|| PathBuf::from("."), absolute_or_unchanged);
        let target = self.target_size.to_string();

        let mut command = Command::new(&self.config.program);
        command
            .arg(&self.config.script)
            .arg("--dataroot")
            .arg(dataroot)
            .arg("--name")
            .arg(weights_id)
            .args(["--model", "test", "--no_dropout", "--gpu_ids", "-1"])
            .arg("--checkpoints_dir")
            .arg(self.resolve(&self.config.checkpoints_dir))
            .arg("--results_dir")
            .arg(self.resolve(&self.config.results_dir))
            .args(["--preprocess", "none"])
            .args(["--load_size", &target, "--crop_size", &target])
            .args(&self.config.extra_args);

        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }

    /// Remove results left by a previous run of the same weights
    ///
    /// Fails if anything remains at the results location.
    fn clear_previous_results(&self, weights_id: &str) -> Result<(), ModelError> {
        let dir = self.results_dir_for(weights_id);
        if std::fs::symlink_metadata(&dir).is_err() {
            return Ok(());
        }
        std::fs::remove_dir_all(&dir).map_err(|source| {
            warn!(path = %dir.display(), error = %source, "Failed to clear previous model results");
            ModelError::StaleResults { path: dir, source }
        })
    }
}

fn absolute_or_unchanged(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let char_count = trimmed.chars().count();
    if char_count <= STDERR_TAIL_CHARS {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(char_count - STDERR_TAIL_CHARS).collect()
    }
}

impl StyleModel for CommandStyleModel {
    fn invoke(&mut self, staged_image: &Path, weights_id: &str) -> Result<PathBuf, ModelError> {
        self.clear_previous_results(weights_id)?;

        let mut command = self.build_command(staged_image, weights_id);
        debug!(command = ?command, "Launching model process");

        let output = command.output().map_err(|source| ModelError::Launch {
            program: self.config.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ModelError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let expected = self.expected_output(staged_image, weights_id);
        if !expected.is_file() {
            return Err(ModelError::OutputMissing { expected });
        }

        info!(output = %expected.display(), weights = weights_id, "Model produced styled image");
        Ok(expected)
    }

    fn name(&self) -> &str {
        "command"
    }
}
