//! End-of-run summary written to the log stream.

use std::path::Path;
use std::time::Duration;

use wheelpack_core::RunReport;

/// `N minutes and S.SS seconds`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let minutes = (total / 60.0).floor() as u64;
    let seconds = total - (minutes as f64) * 60.0;
    format!("{minutes} minutes and {seconds:.2} seconds")
}

/// Log counts, failures and timing statistics for a finished run.
pub fn log_summary(report: &RunReport, requirements_file: &Path, dest_root: &Path, script: &Path) {
    let rule = "=".repeat(66);
    tracing::info!("{rule}");
    tracing::info!("Offline dependency download process finished.");
    tracing::info!(
        "Processed {}/{} top-level requirements from '{}'.",
        report.processed_count(),
        report.packages.len(),
        requirements_file.display()
    );
    tracing::info!(
        "{} packages had at least one successful download strategy.",
        report.succeeded_count()
    );

    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() {
        tracing::warn!(
            "FAILED to download any suitable artifacts for {} packages after all attempts:",
            failed.len()
        );
        for pkg in &failed {
            tracing::warn!("  - {}", pkg.requirement);
        }
        tracing::warn!("Offline installation will likely fail for these packages.");
    }

    tracing::info!(
        "Downloaded wheels are organized in subdirectories within: {}",
        dest_root.display()
    );
    tracing::info!("Review '{}' for offline installation steps.", script.display());

    match &report.timing {
        Some(stats) => {
            tracing::info!("--- Pip Download Timing Statistics ---");
            tracing::info!("  Total pip download calls: {}", stats.count);
            tracing::info!("  Total time in pip calls: {:.2} seconds", stats.total.as_secs_f64());
            tracing::info!("  Minimum time per call:   {:.4} seconds", stats.min.as_secs_f64());
            tracing::info!("  Maximum time per call:   {:.4} seconds", stats.max.as_secs_f64());
            tracing::info!("  Average time per call:   {:.4} seconds", stats.mean.as_secs_f64());
        }
        None => tracing::info!("--- No pip download calls were recorded. ---"),
    }

    tracing::info!("--- Script finished in: {} ---", format_elapsed(report.elapsed));
}
