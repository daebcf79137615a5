//! wheelpack - offline wheel downloader CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wheelpack_cli::{Cli, execute};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
    tracing::debug!("Debug logging enabled.");

    match execute(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
