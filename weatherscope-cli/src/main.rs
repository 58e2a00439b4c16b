//! Binary crate for the `weatherscope` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive city picking and configuration
//! - Rendering the dashboard and map events as text

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod terminal_map;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `show --raw` output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
