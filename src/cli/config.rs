//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{ModelCommandConfig, ProcessorConfig};
use anyhow::{Context, Result};

/// Builds a [`ProcessorConfig`] from the optional config file and CLI overrides
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    pub(crate) fn from_cli(cli: &Cli) -> Result<ProcessorConfig> {
        let mut config = match &cli.config {
            Some(path) => ProcessorConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => ProcessorConfig::default(),
        };

        if let Some(dir) = &cli.staging_dir {
            config.staging_root.clone_from(dir);
        }
        if let Some(dir) = &cli.locales_dir {
            config.locales_dir = Some(dir.clone());
        }
        Self::apply_model_overrides(cli, &mut config.model);

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn apply_model_overrides(cli: &Cli, model: &mut ModelCommandConfig) {
        if let Some(program) = &cli.model_program {
            model.program.clone_from(program);
        }
        if let Some(script) = &cli.model_script {
            model.script.clone_from(script);
        }
        if let Some(dir) = &cli.model_dir {
            model.working_dir = Some(dir.clone());
        }
        if let Some(dir) = &cli.checkpoints_dir {
            model.checkpoints_dir.clone_from(dir);
        }
        if let Some(dir) = &cli.results_dir {
            model.results_dir.clone_from(dir);
        }
    }
}
