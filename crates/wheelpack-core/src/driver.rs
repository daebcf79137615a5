//! Per-requirement fetch loop.
//!
//! For one requirement the driver walks the strategy list in order, runs the
//! fetch tool once per strategy, and records an [`AttemptOutcome`] for every
//! attempt. The first success triggers the one-time side effects (install
//! instruction, optional promotion copy); [`FetchPolicy`] decides whether
//! the loop stops there.

use std::io;
use std::path::Path;
use std::time::Instant;

use crate::config::{Config, FetchPolicy};
use crate::fetch::{FetchError, FetchRequest, Fetcher};
use crate::paths::package_dir;
use crate::promote::{is_same_dir, promote_files};
use crate::report::{AttemptOutcome, PackageResult};
use crate::requirement::RequirementSpec;
use crate::script::InstructionSink;
use crate::strategy::StrategyConstraint;

/// Result of driving one requirement through the strategy list.
#[derive(Debug, Clone)]
pub struct PackageAttempts {
    /// Final per-package state.
    pub result: PackageResult,
    /// Attempts in the order they ran.
    pub attempts: Vec<AttemptOutcome>,
}

/// Groups the collaborators used for every requirement in a run.
#[derive(Clone, Copy)]
pub struct Driver<'a> {
    fetcher: &'a dyn Fetcher,
    sink: &'a dyn InstructionSink,
    config: &'a Config,
}

impl std::fmt::Debug for Driver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Driver<'a> {
    /// Create a driver.
    pub fn new(
        fetcher: &'a dyn Fetcher,
        sink: &'a dyn InstructionSink,
        config: &'a Config,
    ) -> Self {
        Self {
            fetcher,
            sink,
            config,
        }
    }

    /// The configuration this driver runs with.
    pub fn config(&self) -> &Config {
        self.config
    }

    /// The instruction sink this driver records into.
    pub fn sink(&self) -> &dyn InstructionSink {
        self.sink
    }

    /// Tokens passed to the fetch tool for `requirement`.
    ///
    /// A configured override is split on whitespace; otherwise the
    /// requirement is passed through as a single argument.
    pub fn specifier_for(&self, requirement: &RequirementSpec) -> Vec<String> {
        match self.config.override_for(requirement.bare_name()) {
            Some(spec) => spec.split_whitespace().map(String::from).collect(),
            None => vec![requirement.as_str().to_string()],
        }
    }

    /// Try every strategy for `requirement` according to the configured policy.
    ///
    /// Never fails: every problem is recorded as a failed attempt.
    pub fn attempt(
        &self,
        requirement: &RequirementSpec,
        dest_root: &Path,
        strategies: &[StrategyConstraint],
        progress: &str,
    ) -> PackageAttempts {
        let name = requirement.bare_name();
        let dest = package_dir(dest_root, &requirement.dir_name());
        let specifier = self.specifier_for(requirement);
        let spec_display = specifier.join(" ");
        let total = strategies.len();

        tracing::info!("Processing {progress}: [{name}] (Full spec: {requirement})");

        let mut attempts = Vec::with_capacity(total);
        let mut successes = 0usize;

        for (index, constraint) in strategies.iter().enumerate() {
            let attempt_no = index + 1;
            let attempt_progress = format!("[{attempt_no}/{total}]");
            tracing::info!("  {progress} Attempt {attempt_progress}: Strategy = {constraint}");

            let started = Instant::now();
            let outcome = match std::fs::create_dir_all(&dest) {
                Ok(()) => {
                    tracing::debug!("    Ensured subdirectory exists: {}", dest.display());
                    self.fetcher
                        .fetch(&FetchRequest {
                            dest: &dest,
                            constraint,
                            specifier: &specifier,
                        })
                        .map_err(|err| describe_fetch_error(&err, progress, name, &attempt_progress))
                }
                Err(err) => {
                    let msg = format!("Failed to create subdirectory {}: {err}", dest.display());
                    tracing::error!("    {progress} Pkg: {name} - Attempt {attempt_progress}: {msg}");
                    Err(msg)
                }
            };
            let duration = started.elapsed();
            tracing::debug!(
                "    Pip call duration for {progress} Pkg: {name} - Attempt {attempt_progress}: {:.4} seconds",
                duration.as_secs_f64()
            );

            let success = outcome.is_ok();
            attempts.push(AttemptOutcome {
                requirement: requirement.clone(),
                strategy_index: attempt_no,
                constraint: constraint.clone(),
                success,
                duration,
                diagnostic: outcome.err(),
            });

            if !success {
                tracing::warn!(
                    "    {progress} Attempt {attempt_progress} FAILED for spec '{spec_display}' with strategy: {constraint}"
                );
                continue;
            }

            successes += 1;
            tracing::info!(
                "    {progress} Attempt {attempt_progress} SUCCEEDED for spec '{spec_display}' with strategy: {constraint}"
            );

            if successes == 1 {
                self.on_first_success(requirement, dest_root, &dest, progress);
            }

            if self.config.policy == FetchPolicy::FirstSuccess {
                tracing::info!(
                    "  {progress} First successful download achieved for {name}. Stopping attempts."
                );
                break;
            }
        }

        if successes > 0 {
            tracing::info!(
                "Successfully downloaded artifacts for {progress} [{name}] in {successes} attempt(s)."
            );
        } else {
            tracing::error!(
                "FAILED to download any suitable artifacts for {progress} [{name}] after {total} attempts."
            );
        }

        PackageAttempts {
            result: PackageResult {
                requirement: requirement.clone(),
                success: successes > 0,
                successful_attempts: successes,
                attempts: attempts.len(),
                destination: dest,
            },
            attempts,
        }
    }

    fn on_first_success(
        &self,
        requirement: &RequirementSpec,
        dest_root: &Path,
        dest: &Path,
        progress: &str,
    ) {
        if let Err(err) = self.sink.record(requirement, dest) {
            tracing::error!("    Failed to write install instruction for {requirement}: {err}");
        }

        if !self.config.promote {
            return;
        }
        if is_same_dir(dest, dest_root) {
            tracing::warn!(
                "    {progress} Skipping promotion for {requirement}: its download directory is the base directory {}",
                dest_root.display()
            );
            return;
        }
        tracing::info!(
            "    {progress} Copying wheels from first successful attempt ({}) to base ({})...",
            dest.display(),
            dest_root.display()
        );
        match promote_files(dest, dest_root) {
            Ok(count) => tracing::debug!("    {progress} Copied {count} file(s)"),
            Err(err) if err.kind() == io::ErrorKind::NotFound && !dest.is_dir() => {
                tracing::warn!(
                    "    {progress} Source directory for copying not found or not a directory: {}",
                    dest.display()
                );
            }
            Err(err) => tracing::error!(
                "    {progress} Error copying files from {} to {}: {err}",
                dest.display(),
                dest_root.display()
            ),
        }
    }
}

fn describe_fetch_error(err: &FetchError, progress: &str, name: &str, attempt: &str) -> String {
    let context = format!("{progress} Pkg: {name} - Attempt {attempt}");
    match err {
        FetchError::ToolNotFound { .. } | FetchError::Spawn { .. } | FetchError::Wait(_) => {
            tracing::error!("    ERROR: {err} ({context})");
        }
        FetchError::TimedOut { .. } => {
            tracing::error!("    ERROR: Pip command {err} for {context}");
        }
        FetchError::NonZeroExit { .. } => {
            tracing::warn!("    Pip command failed for {context}: {err}");
        }
    }
    err.to_string()
}
