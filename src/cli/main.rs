//! Painterly CLI
//!
//! Stylizes a single image from the command line or serves the interactive
//! web form.

use super::config::CliConfigBuilder;
use super::progress::IndicatifProgressReporter;
use crate::{
    backends::CommandStyleModel,
    config::{OutputFormat, ProcessorConfig},
    i18n::Translator,
    processor::StyleTransferProcessor,
    services::{ImageIOService, ProgressReporter},
    styles::Style,
    tracing_config::{TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Painter-style transfer using pretrained CycleGAN weights
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "painterly")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console, global = true)]
    pub log_format: CliLogFormat,

    /// JSON configuration file; CLI flags override its values
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for per-session staging folders
    #[arg(long, value_name = "PATH", global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Directory with additional `<locale>.json` translation files
    #[arg(long, value_name = "PATH", global = true)]
    pub locales_dir: Option<PathBuf>,

    /// Interpreter used to launch the model script
    #[arg(long, value_name = "PROGRAM", global = true)]
    pub model_program: Option<String>,

    /// Model test script
    #[arg(long, value_name = "PATH", global = true)]
    pub model_script: Option<PathBuf>,

    /// Working directory of the model checkout
    #[arg(long, value_name = "PATH", global = true)]
    pub model_dir: Option<PathBuf>,

    /// Directory holding the pretrained weights
    #[arg(long, value_name = "PATH", global = true)]
    pub checkpoints_dir: Option<PathBuf>,

    /// Directory the model writes its results into
    #[arg(long, value_name = "PATH", global = true)]
    pub results_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stylize one image
    Stylize(StylizeArgs),
    /// Serve the interactive web form
    #[cfg(feature = "web")]
    Serve(ServeArgs),
    /// List the available styles
    Styles,
}

#[derive(Args, Debug)]
pub struct StylizeArgs {
    /// Input image (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Painter style
    #[arg(short, long, value_enum, default_value_t = Style::Monet)]
    pub style: Style,

    /// Output file (use "-" for stdout) [default: styled_<style>_<name>.<ext>]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format [default: from the output extension, else png]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (1-100) [default: from configuration]
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Keep the staging directory after processing
    #[arg(long)]
    pub keep_staging: bool,

    /// Hide the progress indicator
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(feature = "web")]
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub addr: String,

    /// Default interface locale
    #[arg(long)]
    pub locale: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format.into())
        .with_run_id(uuid::Uuid::new_v4().to_string())
        .init()
        .context("Failed to initialize tracing subscriber")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    match &cli.command {
        Command::Stylize(args) => stylize(args, config).await,
        #[cfg(feature = "web")]
        Command::Serve(args) => serve(args, config).await,
        Command::Styles => list_styles(&config),
    }
}

async fn stylize(args: &StylizeArgs, config: ProcessorConfig) -> Result<()> {
    let format = resolve_format(args.format, args.output.as_deref());
    let quality = args.jpeg_quality.unwrap_or(config.download_jpeg_quality);
    let staging_dir = config
        .staging_root
        .join(format!("cli-{}", uuid::Uuid::new_v4()));

    let model = CommandStyleModel::new(config.model.clone(), config.target_size);
    let reporter: Box<dyn ProgressReporter> = if args.quiet {
        Box::new(IndicatifProgressReporter::hidden())
    } else {
        Box::new(IndicatifProgressReporter::new())
    };
    let mut processor = StyleTransferProcessor::new(config, Box::new(model))
        .context("Failed to create style transfer processor")?
        .with_progress_reporter(reporter);

    info!("Input: {}", args.input);
    info!("Style: {} ({})", args.style, args.style.weights_id());

    let prepared = if args.input == "-" {
        processor
            .prepare_from_reader(tokio::io::stdin(), "stdin", &staging_dir)
            .await
    } else {
        let file = tokio::fs::File::open(&args.input)
            .await
            .with_context(|| format!("Failed to open input file: {}", args.input))?;
        processor
            .prepare_from_reader(file, &args.input, &staging_dir)
            .await
    };
    let prepared = prepared.context("Failed to prepare input image")?;

    let outcome = tokio::task::block_in_place(|| processor.stylize(&prepared, args.style));

    if args.keep_staging {
        info!("Staging directory kept at {}", staging_dir.display());
    } else if let Err(e) = ImageIOService::remove_dir(&staging_dir) {
        warn!("Failed to remove staging directory {}: {}", staging_dir.display(), e);
    }

    let result = outcome.context("Style transfer failed")?;
    let bytes = result
        .to_bytes(format, quality)
        .context("Failed to encode result")?;

    match args.output.as_deref() {
        Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        },
        Some(path) => write_output(Path::new(path), &bytes)?,
        None => write_output(Path::new(&result.download_name(format)), &bytes)?,
    }

    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    info!("Saved {}", path.display());
    Ok(())
}

/// Explicit format wins; otherwise the output extension decides
fn resolve_format(explicit: Option<CliOutputFormat>, output: Option<&str>) -> OutputFormat {
    if let Some(format) = explicit {
        return format.into();
    }
    output
        .and_then(|path| Path::new(path).extension())
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse::<OutputFormat>().ok())
        .unwrap_or_default()
}

#[cfg(feature = "web")]
async fn serve(args: &ServeArgs, mut config: ProcessorConfig) -> Result<()> {
    if let Some(locale) = &args.locale {
        config.default_locale.clone_from(locale);
    }
    let addr = args.addr.clone();

    tokio::task::spawn_blocking(move || {
        let model = CommandStyleModel::new(config.model.clone(), config.target_size);
        crate::web::serve(&addr, config, Box::new(model))
    })
    .await
    .context("Web server task panicked")?
    .context("Web server failed")
}

fn list_styles(config: &ProcessorConfig) -> Result<()> {
    let translator = Translator::from_config(config).context("Failed to load translations")?;
    let locale = translator.default_locale();
    for style in Style::ALL {
        println!(
            "{:<10} {:<20} {}",
            style.key(),
            translator.style_name(locale, style),
            style.weights_id()
        );
    }
    Ok(())
}
