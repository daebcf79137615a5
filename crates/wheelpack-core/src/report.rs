//! Run results and timing statistics.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::requirement::RequirementSpec;
use crate::strategy::StrategyConstraint;

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Result of one fetch tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    /// Requirement being fetched.
    pub requirement: RequirementSpec,
    /// 1-based position in the strategy list.
    pub strategy_index: usize,
    /// Constraint used for this attempt.
    pub constraint: StrategyConstraint,
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Wall-clock time of the attempt.
    #[serde(rename = "duration_secs", serialize_with = "as_secs")]
    pub duration: Duration,
    /// Failure details, if any.
    pub diagnostic: Option<String>,
}

/// Final state of one requirement.
#[derive(Debug, Clone, Serialize)]
pub struct PackageResult {
    /// Requirement as written.
    pub requirement: RequirementSpec,
    /// At least one attempt succeeded.
    pub success: bool,
    /// Number of successful attempts.
    pub successful_attempts: usize,
    /// Number of attempts made.
    pub attempts: usize,
    /// Per-package download directory.
    pub destination: PathBuf,
}

/// Min/max/mean/total over a series of attempt durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingStats {
    /// Number of samples.
    pub count: usize,
    /// Shortest attempt.
    #[serde(rename = "min_secs", serialize_with = "as_secs")]
    pub min: Duration,
    /// Longest attempt.
    #[serde(rename = "max_secs", serialize_with = "as_secs")]
    pub max: Duration,
    /// Arithmetic mean.
    #[serde(rename = "mean_secs", serialize_with = "as_secs")]
    pub mean: Duration,
    /// Sum of all samples.
    #[serde(rename = "total_secs", serialize_with = "as_secs")]
    pub total: Duration,
}

impl TimingStats {
    /// Compute statistics, or `None` for an empty series.
    pub fn from_durations(durations: &[Duration]) -> Option<Self> {
        let min = durations.iter().min().copied()?;
        let max = durations.iter().max().copied()?;
        let total: Duration = durations.iter().sum();
        let count = durations.len();
        let mean = Duration::from_nanos((total.as_nanos() / count as u128) as u64);
        Some(Self {
            count,
            min,
            max,
            mean,
            total,
        })
    }
}

/// Aggregated outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// One entry per requirement, in input order.
    pub packages: Vec<PackageResult>,
    /// Every attempt across all requirements, in execution order.
    pub attempts: Vec<AttemptOutcome>,
    /// Timing over all attempts; `None` if no attempt was made.
    pub timing: Option<TimingStats>,
    /// Wall-clock time of the whole run.
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl RunReport {
    /// Assemble a report; timing statistics are derived from `attempts`.
    pub fn new(
        packages: Vec<PackageResult>,
        attempts: Vec<AttemptOutcome>,
        elapsed: Duration,
    ) -> Self {
        let durations: Vec<Duration> = attempts.iter().map(|a| a.duration).collect();
        Self {
            packages,
            timing: TimingStats::from_durations(&durations),
            attempts,
            elapsed,
        }
    }

    /// Requirements with at least one successful attempt.
    pub fn succeeded(&self) -> impl Iterator<Item = &PackageResult> {
        self.packages.iter().filter(|p| p.success)
    }

    /// Requirements with no successful attempt.
    pub fn failed(&self) -> impl Iterator<Item = &PackageResult> {
        self.packages.iter().filter(|p| !p.success)
    }

    /// Number of requirements processed.
    pub fn processed_count(&self) -> usize {
        self.packages.len()
    }

    /// Number of requirements downloaded.
    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    /// Number of requirements that failed.
    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates [`serde_json::Error`].
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
