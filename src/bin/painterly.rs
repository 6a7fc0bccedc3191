//! Painterly CLI Tool
//!
//! Command-line interface for painter-style transfer and the interactive
//! web form.

#[cfg(feature = "cli")]
use painterly::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(2);
}
