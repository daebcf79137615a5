//! External fetch tool boundary.
//!
//! The driver only sees [`Fetcher`]; [`PipFetcher`] is the production
//! implementation that shells out to `pip download`.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

use crate::config::ToolConfig;
use crate::strategy::StrategyConstraint;

/// Why a single fetch attempt failed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The tool ran and rejected the request.
    #[error("exited with code {code}. Stderr: {}{}", one_line(.stderr), stdout_suffix(.stdout))]
    NonZeroExit {
        /// Exit code (`-1` if terminated by a signal).
        code: i32,
        /// Captured standard error.
        stderr: String,
        /// Captured standard output.
        stdout: String,
    },

    /// The tool executable could not be found.
    #[error("cannot find '{program}'. Is Python installed correctly and in PATH?")]
    ToolNotFound {
        /// Program that was looked up.
        program: String,
    },

    /// The tool did not finish within the configured limit and was killed.
    #[error("timed out after {}s", .limit.as_secs_f64())]
    TimedOut {
        /// Configured limit.
        limit: Duration,
    },

    /// The tool could not be started.
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        /// Program that failed to launch.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the running tool failed.
    #[error("failed waiting for fetch tool: {0}")]
    Wait(#[source] std::io::Error),
}

fn one_line(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        "(No stderr output)".to_string()
    } else {
        text.replace('\n', " ")
    }
}

fn stdout_suffix(stdout: &str) -> String {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        String::new()
    } else {
        format!("\n    stdout (on error):\n{stdout}")
    }
}

/// Everything needed for one fetch invocation.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Download destination (`--dest`).
    pub dest: &'a Path,
    /// Target flags.
    pub constraint: &'a StrategyConstraint,
    /// Requirement tokens passed positionally.
    pub specifier: &'a [String],
}

/// Something that can download a requirement into a directory.
pub trait Fetcher: Send + Sync {
    /// Run one download attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing why the attempt failed.
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), FetchError>;
}

/// Runs `<program> [args..] download --dest <dir> --disable-pip-version-check ..`.
#[derive(Debug, Clone)]
pub struct PipFetcher {
    program: String,
    prefix_args: Vec<String>,
    timeout: Option<Duration>,
}

impl PipFetcher {
    /// Build from tool settings and an optional per-invocation timeout.
    pub fn new(tool: &ToolConfig, timeout: Option<Duration>) -> Self {
        Self {
            program: tool.program.clone(),
            prefix_args: tool.args.clone(),
            timeout,
        }
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the program resolves on `PATH` (or as a path).
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Arguments for a request, excluding the program itself.
    pub fn args(&self, request: &FetchRequest<'_>) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        args.push("download".to_string());
        args.push("--dest".to_string());
        args.push(request.dest.display().to_string());
        args.push("--disable-pip-version-check".to_string());
        args.extend(request.constraint.to_args());
        args.extend(request.specifier.iter().cloned());
        args
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let Some(mut pipe) = pipe else {
            return String::new();
        };
        let mut buf = Vec::new();
        if let Err(err) = pipe.read_to_end(&mut buf) {
            tracing::debug!(
                "    Reading fetch tool output failed after {} bytes: {err}",
                buf.len()
            );
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Kill a child we stopped waiting on and collect its exit status.
fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!("    Killing fetch tool failed: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("    Reaping fetch tool failed: {err}");
    }
}

impl Fetcher for PipFetcher {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), FetchError> {
        let args = self.args(request);
        tracing::debug!("    Full command: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    FetchError::Spawn {
                        program: self.program.clone(),
                        source,
                    }
                }
            })?;

        // Drain both pipes concurrently so the child never blocks on a full buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => match child.wait_timeout(limit) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    reap(&mut child);
                    return Err(FetchError::TimedOut { limit });
                }
                Err(err) => {
                    reap(&mut child);
                    return Err(FetchError::Wait(err));
                }
            },
            None => child.wait().map_err(FetchError::Wait)?,
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if status.success() {
            if !stderr.trim().is_empty() {
                tracing::debug!("    pip stderr: {}", one_line(&stderr));
            }
            Ok(())
        } else {
            Err(FetchError::NonZeroExit {
                code: status.code().unwrap_or(-1),
                stderr,
                stdout,
            })
        }
    }
}
