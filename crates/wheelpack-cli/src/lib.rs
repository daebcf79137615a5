//! wheelpack - offline wheel downloader
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Reads a `requirements.txt`, downloads every requirement (plus its
//! dependencies) with `pip download` across a matrix of target platforms and
//! interpreters, and writes an installation script that works without
//! network access.
//!
//! # Output Layout
//!
//! ```text
//! wheels_offline/
//! ├── flask/          # one directory per requirement
//! ├── requests/
//! └── *.whl           # promoted wheels (with --promote)
//! installation-instructions.bat
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use wheelpack_core::paths::{DEFAULT_DEST_DIR, DEFAULT_REQUIREMENTS_FILE};
use wheelpack_core::{
    Config, Driver, FetchPolicy, PipFetcher, RunReport, ScriptFlavor, ScriptWriter, aggregate,
    paths, requirement,
};

pub mod summary;

#[derive(Debug, Parser)]
#[command(name = "wheelpack")]
#[command(
    author,
    version,
    about = "Download Python wheels and their dependencies from a requirements file for offline installation."
)]
pub struct Cli {
    /// Path to the requirements file
    #[arg(short, long, default_value = DEFAULT_REQUIREMENTS_FILE)]
    pub requirements: PathBuf,

    /// Directory to download wheels into
    #[arg(short, long, env = "WHEELPACK_DEST", default_value = DEFAULT_DEST_DIR)]
    pub dest: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML configuration file (strategy matrix, overrides, tool, ...)
    #[arg(short, long, env = "WHEELPACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after the first successful strategy, or try them all
    #[arg(long, value_name = "first-success|exhaustive")]
    pub policy: Option<FetchPolicy>,

    /// Copy the first successful download set into the destination root
    #[arg(long)]
    pub promote: bool,

    /// Kill a fetch attempt after this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Fetch tool program (default: pip)
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<String>,

    /// Where to write the installation script
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Installation script dialect
    #[arg(long, value_name = "batch|shell")]
    pub script_format: Option<ScriptFlavor>,

    /// Also write the run report as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Resolve the effective configuration: defaults, then file, then flags.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if self.promote {
            config.promote = true;
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }
        if let Some(tool) = &self.tool {
            config.tool.program.clone_from(tool);
            config.tool.args.clear();
        }
        if let Some(format) = self.script_format {
            config.script.format = format;
        }
        if let Some(path) = &self.script {
            config.script.path = Some(path.clone());
        }
        Ok(config)
    }
}

/// Execute a full download run.
///
/// Returns an error only for fatal setup problems; failed requirements are
/// part of the returned report.
pub fn execute(cli: &Cli) -> Result<RunReport> {
    let config = cli.load_config()?;

    let requirements = requirement::load(&cli.requirements)?;
    let abs_dest = paths::prepare_dest_root(&cli.dest)?;
    tracing::info!("Using base download directory: {}", abs_dest.display());
    tracing::debug!(
        "Loaded {} requirement(s) from '{}'",
        requirements.len(),
        cli.requirements.display()
    );

    let fetcher = PipFetcher::new(&config.tool, config.timeout());
    if !fetcher.is_available() {
        tracing::warn!(
            "'{}' was not found on PATH; every attempt will fail until it is installed",
            fetcher.program()
        );
    }

    let script_path = config.script_path();
    let sink = ScriptWriter::new(&script_path, config.script.format);
    let driver = Driver::new(&fetcher, &sink, &config);

    let report = aggregate::run(&requirements, &cli.dest, &driver);

    summary::log_summary(&report, &cli.requirements, &abs_dest, &script_path);

    if let Some(path) = &cli.report {
        let json = report.to_json().context("Failed to serialize run report")?;
        if let Err(err) = std::fs::write(path, json) {
            tracing::error!("Failed to write report {}: {err}", path.display());
        } else {
            tracing::info!("Run report written to {}", path.display());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["wheelpack"]);
        assert_eq!(cli.requirements, PathBuf::from("requirements.txt"));
        assert!(!cli.verbose);
        let config = cli.load_config().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "wheelpack",
            "-r",
            "reqs.txt",
            "-d",
            "out",
            "-v",
            "--policy",
            "first-success",
            "--promote",
            "--timeout",
            "90",
            "--tool",
            "pip3",
            "--script-format",
            "shell",
        ]);
        assert_eq!(cli.requirements, PathBuf::from("reqs.txt"));
        assert_eq!(cli.dest, PathBuf::from("out"));
        assert!(cli.verbose);

        let config = cli.load_config().unwrap();
        assert_eq!(config.policy, FetchPolicy::FirstSuccess);
        assert!(config.promote);
        assert_eq!(config.timeout_secs, Some(90));
        assert_eq!(config.tool.program, "pip3");
        assert_eq!(config.script_path(), PathBuf::from("installation-instructions.sh"));
    }

    #[test]
    fn test_bad_policy_is_rejected() {
        assert!(Cli::try_parse_from(["wheelpack", "--policy", "maybe"]).is_err());
    }
}
