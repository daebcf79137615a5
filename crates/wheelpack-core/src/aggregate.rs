//! Run-level orchestration.
//!
//! Generates the strategy list once, drives every requirement through the
//! [`Driver`] in input order, and folds the results into a [`RunReport`].

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use crate::driver::Driver;
use crate::report::RunReport;
use crate::requirement::RequirementSpec;
use crate::strategy;

const SEPARATOR: &str = "------------------------------------------------------------------";

/// Requirements whose distinct bare names sanitize to the same directory.
///
/// Keys are the lower-cased directory name; only groups with more than one
/// distinct bare name are returned.
pub fn dir_collisions(requirements: &[RequirementSpec]) -> BTreeMap<String, Vec<&RequirementSpec>> {
    let mut groups: BTreeMap<String, Vec<&RequirementSpec>> = BTreeMap::new();
    for req in requirements {
        groups.entry(req.dir_name().to_lowercase()).or_default().push(req);
    }
    groups.retain(|_, reqs| {
        let mut names: Vec<String> = reqs.iter().map(|r| r.bare_name().to_lowercase()).collect();
        names.sort();
        names.dedup();
        names.len() > 1
    });
    groups
}

fn warn_on_collisions(requirements: &[RequirementSpec]) {
    for req in requirements.iter().filter(|r| r.dir_name().is_empty()) {
        tracing::warn!(
            "Requirement '{req}' has no usable directory name; its artifacts will land in the destination root"
        );
    }
    for (dir, reqs) in dir_collisions(requirements) {
        let names: Vec<&str> = reqs.iter().map(|r| r.as_str()).collect();
        tracing::warn!(
            "Requirements {} all map to subdirectory '{dir}'; their artifacts will share it",
            names.join(", ")
        );
    }
}

/// Process every requirement sequentially and build the final report.
pub fn run(requirements: &[RequirementSpec], dest_root: &Path, driver: &Driver<'_>) -> RunReport {
    let started = Instant::now();
    let strategies = strategy::generate(&driver.config().strategy);
    let total = requirements.len();

    warn_on_collisions(requirements);

    if let Err(err) = driver.sink().begin(dest_root) {
        tracing::error!("Failed to write initial installation script: {err}");
    }

    if total == 0 {
        tracing::warn!("No valid package specifications found.");
    }
    tracing::info!(
        "Found {total} packages to process, {} strategies each (policy: {}).",
        strategies.len(),
        driver.config().policy
    );
    tracing::info!("Starting offline dependency download...");
    tracing::info!("{}", "=".repeat(SEPARATOR.len()));

    let mut packages = Vec::with_capacity(total);
    let mut attempts = Vec::new();

    for (index, requirement) in requirements.iter().enumerate() {
        let progress = format!("[{}/{total}]", index + 1);
        let outcome = driver.attempt(requirement, dest_root, &strategies, &progress);
        attempts.extend(outcome.attempts);
        packages.push(outcome.result);
        tracing::info!("{SEPARATOR}");
    }

    let report = RunReport::new(packages, attempts, started.elapsed());

    if let Err(err) = driver.sink().finish(&report) {
        tracing::error!("Failed to finalize installation script: {err}");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, FetchPolicy};
    use crate::fetch::{FetchError, FetchRequest, Fetcher};
    use crate::requirement::parse;
    use crate::script::{ScriptFlavor, ScriptWriter};
    use crate::strategy::StrategyMatrix;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Fails every request naming `requests`, succeeds otherwise.
    struct PickyFetcher {
        calls: Mutex<usize>,
    }

    impl Fetcher for PickyFetcher {
        fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), FetchError> {
            *self.calls.lock().unwrap() += 1;
            if request.specifier.iter().any(|s| s.starts_with("requests")) {
                Err(FetchError::NonZeroExit {
                    code: 1,
                    stderr: "ERROR: No matching distribution found".into(),
                    stdout: String::new(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn small_matrix() -> StrategyMatrix {
        StrategyMatrix {
            platforms: vec!["any".into()],
            python_versions: vec!["3.12".into()],
            implementations: vec!["cp".into(), "py".into()],
            binary_only: vec![true],
            abi_prefix: "cp".into(),
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let tmp = tempdir().unwrap();
        let requirements = parse("requests==2.31.0\n\n# a comment\n-r other.txt\nflask\n");
        assert_eq!(
            requirements.iter().map(RequirementSpec::as_str).collect::<Vec<_>>(),
            vec!["requests==2.31.0", "flask"]
        );

        let script = tmp.path().join("install.bat");
        let sink = ScriptWriter::new(&script, ScriptFlavor::Batch);
        let fetcher = PickyFetcher {
            calls: Mutex::new(0),
        };
        let config = Config {
            policy: FetchPolicy::FirstSuccess,
            strategy: small_matrix(),
            ..Config::default()
        };
        let driver = Driver::new(&fetcher, &sink, &config);
        let dest = tmp.path().join("wheels");

        let report = run(&requirements, &dest, &driver);
        let strategy_count = strategy::generate(&config.strategy).len();

        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed().next().unwrap().requirement.as_str(), "requests==2.31.0");
        assert_eq!(report.succeeded().next().unwrap().requirement.as_str(), "flask");
        // requests: every strategy; flask: stops at the first
        assert_eq!(report.attempts.len(), strategy_count + 1);
        assert_eq!(*fetcher.calls.lock().unwrap(), strategy_count + 1);
        assert_eq!(report.timing.unwrap().count, strategy_count + 1);

        let text = std::fs::read_to_string(&script).unwrap();
        assert_eq!(text.matches("pip install --no-index").count(), 1);
        assert!(text.contains("REM Install 'flask' (Original requirement)"));
        assert!(!text.contains("Install 'requests"));
        assert!(text.contains("REM   missing: requests==2.31.0"));
    }

    #[test]
    fn test_results_keep_input_order() {
        let tmp = tempdir().unwrap();
        let requirements = parse("zeta\nrequests\nalpha\n");
        let sink = ScriptWriter::new(tmp.path().join("i.bat"), ScriptFlavor::Batch);
        let fetcher = PickyFetcher {
            calls: Mutex::new(0),
        };
        let config = Config {
            strategy: small_matrix(),
            ..Config::default()
        };
        let driver = Driver::new(&fetcher, &sink, &config);

        let report = run(&requirements, tmp.path(), &driver);
        let order: Vec<_> = report.packages.iter().map(|p| p.requirement.as_str()).collect();
        assert_eq!(order, vec!["zeta", "requests", "alpha"]);

        // Exhaustive: every requirement tried every strategy
        let per_req = strategy::generate(&config.strategy).len();
        assert_eq!(report.attempts.len(), per_req * 3);
    }

    #[test]
    fn test_empty_run_has_no_timing() {
        let tmp = tempdir().unwrap();
        let sink = ScriptWriter::new(tmp.path().join("i.sh"), ScriptFlavor::Shell);
        let fetcher = PickyFetcher {
            calls: Mutex::new(0),
        };
        let config = Config::default();
        let driver = Driver::new(&fetcher, &sink, &config);

        let report = run(&[], tmp.path(), &driver);
        assert_eq!(report.processed_count(), 0);
        assert!(report.timing.is_none());
        assert!(report.elapsed < Duration::from_secs(5));
        assert!(tmp.path().join("i.sh").is_file());
    }

    #[test]
    fn test_dir_collisions() {
        let requirements = parse("zope.interface\nzopeinterface==1\nflask\nflask>=2\nFlask\n");
        let collisions = dir_collisions(&requirements);
        assert_eq!(collisions.len(), 1);
        let group = &collisions["zopeinterface"];
        assert_eq!(group.len(), 2);
    }
}
