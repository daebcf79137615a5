//! Offline installation script.
//!
//! The script is written in three stages: [`InstructionSink::begin`]
//! truncates the file and writes the header, [`InstructionSink::record`]
//! appends one install block per requirement (first success only), and
//! [`InstructionSink::finish`] appends the footer with the run summary.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::report::RunReport;
use crate::requirement::RequirementSpec;

/// Destination for install instructions.
///
/// Implementations are called sequentially by the driver; methods take
/// `&self` so a sink can be shared behind a reference.
pub trait InstructionSink: Send + Sync {
    /// Start a fresh instruction set for `dest_root`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the underlying write.
    fn begin(&self, dest_root: &Path) -> io::Result<()>;

    /// Record how to install `requirement` from `package_dir`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the underlying write.
    fn record(&self, requirement: &RequirementSpec, package_dir: &Path) -> io::Result<()>;

    /// Close the instruction set.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the underlying write.
    fn finish(&self, report: &RunReport) -> io::Result<()>;
}

/// Script dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFlavor {
    /// Windows batch file.
    #[default]
    Batch,
    /// POSIX shell script.
    Shell,
}

impl ScriptFlavor {
    /// File name used when no explicit path is configured.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Batch => "installation-instructions.bat",
            Self::Shell => "installation-instructions.sh",
        }
    }

    fn comment(self) -> &'static str {
        match self {
            Self::Batch => "REM",
            Self::Shell => "#",
        }
    }

    fn echo(self, text: &str) -> String {
        match (self, text.is_empty()) {
            (Self::Batch, true) => "echo.".to_string(),
            (Self::Batch, false) => format!("echo {text}"),
            (Self::Shell, true) => "echo".to_string(),
            (Self::Shell, false) => format!("echo \"{text}\""),
        }
    }

    /// Path as it should appear in a `--find-links` argument.
    fn find_links(self, dir: &Path) -> String {
        let display = dir.display().to_string();
        match self {
            Self::Batch => {
                let display = display.replace('/', "\\");
                if dir.is_absolute() {
                    display
                } else {
                    format!(".\\{display}")
                }
            }
            Self::Shell => {
                if dir.is_absolute() {
                    display
                } else {
                    format!("./{display}")
                }
            }
        }
    }
}

impl FromStr for ScriptFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batch" | "bat" => Ok(Self::Batch),
            "shell" | "sh" => Ok(Self::Shell),
            other => Err(format!(
                "unknown script format '{other}' (expected 'batch' or 'shell')"
            )),
        }
    }
}

/// Render the script header.
pub fn render_header(flavor: ScriptFlavor, dest_root: &Path) -> String {
    let rem = flavor.comment();
    let base = std::path::absolute(dest_root).unwrap_or_else(|_| dest_root.to_path_buf());
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut out = String::new();

    match flavor {
        ScriptFlavor::Batch => out.push_str("@echo off\n"),
        ScriptFlavor::Shell => out.push_str("#!/bin/sh\n"),
    }
    let _ = writeln!(out, "{rem} Auto-generated script for offline installation");
    let _ = writeln!(
        out,
        "{rem} Generated by wheelpack {} on {generated}",
        crate::VERSION
    );
    let _ = writeln!(out, "{rem} Base wheel directory: {}", base.display());
    let _ = writeln!(out, "{}", flavor.echo(""));
    let _ = writeln!(
        out,
        "{rem} --- Optional: Create and activate a virtual environment ---"
    );
    let _ = writeln!(out, "{rem} python -m venv my_offline_env");
    match flavor {
        ScriptFlavor::Batch => {
            let _ = writeln!(out, "{rem} call my_offline_env\\Scripts\\activate");
        }
        ScriptFlavor::Shell => {
            let _ = writeln!(out, "{rem} . my_offline_env/bin/activate");
        }
    }
    let _ = writeln!(out, "{}", flavor.echo(""));
    let _ = writeln!(
        out,
        "{}",
        flavor.echo("Checking pip version and compatible tags...")
    );
    out.push_str("pip --version\npip debug --verbose\n");
    let _ = writeln!(out, "{}", flavor.echo(""));
    let _ = writeln!(out, "{}", flavor.echo("Listing packages before installation..."));
    out.push_str("pip list\n");
    let _ = writeln!(out, "{}", flavor.echo(&"=".repeat(60)));
    let _ = writeln!(out, "{}", flavor.echo("Starting installations..."));
    let _ = writeln!(out, "{}", flavor.echo(""));
    out
}

/// Render one install block.
pub fn render_block(flavor: ScriptFlavor, requirement: &RequirementSpec, package_dir: &Path) -> String {
    format!(
        "{rem} Install '{req}' (Original requirement)\n\
         pip install --no-index --find-links \"{links}\" \"{req}\"\n\n",
        rem = flavor.comment(),
        req = requirement.as_str(),
        links = flavor.find_links(package_dir),
    )
}

/// Render the footer, including a summary of the run.
pub fn render_footer(flavor: ScriptFlavor, report: &RunReport) -> String {
    let rem = flavor.comment();
    let mut out = String::new();
    let _ = writeln!(out, "{}", flavor.echo(""));
    let _ = writeln!(out, "{}", flavor.echo(&"=".repeat(60)));
    let _ = writeln!(out, "{}", flavor.echo("Installation commands executed."));
    let _ = writeln!(out, "{}", flavor.echo("Listing packages after installation..."));
    out.push_str("pip list\n");
    let _ = writeln!(out, "{}", flavor.echo(&"=".repeat(60)));
    let _ = writeln!(
        out,
        "{rem} Summary: {} of {} requirement(s) downloaded, {} failed",
        report.succeeded_count(),
        report.processed_count(),
        report.failed_count()
    );
    for failed in report.failed() {
        let _ = writeln!(out, "{rem}   missing: {}", failed.requirement);
    }
    match flavor {
        ScriptFlavor::Batch => {
            let _ = writeln!(out, "{rem} --- Optional: Deactivate virtual environment ---");
            let _ = writeln!(out, "{rem} call deactivate");
            let _ = writeln!(out, "{}", flavor.echo(""));
            let _ = writeln!(
                out,
                "{}",
                flavor.echo("Script finished. Closing in 500 seconds...")
            );
            out.push_str("timeout /t 500 /nobreak > nul\n");
        }
        ScriptFlavor::Shell => {
            let _ = writeln!(out, "{rem} --- Optional: Deactivate virtual environment ---");
            let _ = writeln!(out, "{rem} deactivate");
            let _ = writeln!(out, "{}", flavor.echo("Script finished."));
        }
    }
    out
}

/// Writes instructions to a batch or shell script on disk.
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    path: PathBuf,
    flavor: ScriptFlavor,
}

impl ScriptWriter {
    /// Create a writer; nothing touches the disk until [`InstructionSink::begin`].
    pub fn new(path: impl Into<PathBuf>, flavor: ScriptFlavor) -> Self {
        Self {
            path: path.into(),
            flavor,
        }
    }

    /// Script location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(text.as_bytes())
    }
}

impl InstructionSink for ScriptWriter {
    fn begin(&self, dest_root: &Path) -> io::Result<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(render_header(self.flavor, dest_root).as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if self.flavor == ScriptFlavor::Shell {
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o755))?;
            }
        }
        Ok(())
    }

    fn record(&self, requirement: &RequirementSpec, package_dir: &Path) -> io::Result<()> {
        self.append(&render_block(self.flavor, requirement, package_dir))
    }

    fn finish(&self, report: &RunReport) -> io::Result<()> {
        self.append(&render_footer(self.flavor, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::PackageResult;
    use tempfile::tempdir;

    fn report_with(results: Vec<PackageResult>) -> RunReport {
        RunReport::new(results, Vec::new(), std::time::Duration::ZERO)
    }

    fn result(req: &str, success: bool) -> PackageResult {
        PackageResult {
            requirement: RequirementSpec::new(req),
            success,
            successful_attempts: usize::from(success),
            attempts: 1,
            destination: PathBuf::from("wheels").join(req),
        }
    }

    #[test]
    fn test_batch_block() {
        let block = render_block(
            ScriptFlavor::Batch,
            &RequirementSpec::new("flask>=3"),
            Path::new("wheels_offline/flask"),
        );
        assert_eq!(
            block,
            "REM Install 'flask>=3' (Original requirement)\n\
             pip install --no-index --find-links \".\\wheels_offline\\flask\" \"flask>=3\"\n\n"
        );
    }

    #[test]
    fn test_shell_block() {
        let block = render_block(
            ScriptFlavor::Shell,
            &RequirementSpec::new("flask"),
            Path::new("wheels_offline/flask"),
        );
        assert!(block.starts_with("# Install 'flask'"));
        assert!(block.contains("--find-links \"./wheels_offline/flask\" \"flask\""));
    }

    #[test]
    fn test_header_and_footer() {
        let header = render_header(ScriptFlavor::Batch, Path::new("wheels"));
        assert!(header.starts_with("@echo off\n"));
        assert!(header.contains("REM Base wheel directory: "));
        assert!(header.contains("pip list\n"));

        let footer = render_footer(
            ScriptFlavor::Shell,
            &report_with(vec![result("a", true), result("b==1", false)]),
        );
        assert!(footer.contains("pip list\n"));
        assert!(footer.contains("# Summary: 1 of 2 requirement(s) downloaded, 1 failed"));
        assert!(footer.contains("#   missing: b==1"));
    }

    #[test]
    fn test_writer_truncates_then_appends() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("install.sh");
        std::fs::write(&path, "stale contents\n").unwrap();

        let writer = ScriptWriter::new(&path, ScriptFlavor::Shell);
        writer.begin(tmp.path()).unwrap();
        writer
            .record(&RequirementSpec::new("flask"), Path::new("w/flask"))
            .unwrap();
        writer.finish(&report_with(vec![result("flask", true)])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("#!/bin/sh\n"));
        assert!(!text.contains("stale contents"));
        assert_eq!(text.matches("pip install --no-index").count(), 1);
        assert!(text.trim_end().ends_with("echo \"Script finished.\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_writer_reports_io_errors() {
        let tmp = tempdir().unwrap();
        let writer = ScriptWriter::new(tmp.path().join("missing/dir/x.bat"), ScriptFlavor::Batch);
        assert!(writer.begin(tmp.path()).is_err());
    }

    #[test]
    fn test_flavor_from_str() {
        assert_eq!("sh".parse::<ScriptFlavor>().unwrap(), ScriptFlavor::Shell);
        assert_eq!("BATCH".parse::<ScriptFlavor>().unwrap(), ScriptFlavor::Batch);
        assert!("pwsh".parse::<ScriptFlavor>().is_err());
    }
}
