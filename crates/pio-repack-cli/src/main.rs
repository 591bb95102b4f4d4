//! pio-repack - repackage prebuilt tool releases as `PlatformIO` packages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pio_repack_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    pio_repack_cli::run(&Cli::parse()).await
}
