//! Requirement list parsing.
//!
//! Only the line filtering pip itself would need to skip is done here:
//! comments, blank lines and option lines (`-r other.txt`, `--index-url ..`)
//! are dropped, everything else is passed through untouched.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::RequirementsError;
use crate::paths::sanitize_dir_name;

/// Characters that terminate the package name in a requirement line.
const NAME_TERMINATORS: &[char] = &['<', '>', '=', '!', '~', ';', '@'];

/// One requirement line, e.g. `requests==2.31.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequirementSpec {
    raw: String,
    #[serde(skip)]
    bare_name: String,
}

impl RequirementSpec {
    /// Build a requirement from an already-filtered line.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into().trim().to_string();
        let bare_name = raw
            .split(NAME_TERMINATORS)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Self { raw, bare_name }
    }

    /// The requirement exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Package name with the version constraint removed.
    pub fn bare_name(&self) -> &str {
        &self.bare_name
    }

    /// Filesystem-safe directory name derived from the bare name.
    pub fn dir_name(&self) -> String {
        sanitize_dir_name(&self.bare_name)
    }
}

impl fmt::Display for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Filter requirement file contents down to specifiers, preserving order.
pub fn parse(text: &str) -> Vec<RequirementSpec> {
    text.lines().filter_map(filter_line).map(RequirementSpec::new).collect()
}

fn filter_line(line: &str) -> Option<&str> {
    let mut spec = line.trim();
    if spec.is_empty() || spec.starts_with('#') {
        return None;
    }
    if let Some((head, _comment)) = spec.split_once(" #") {
        spec = head.trim();
    }
    if spec.is_empty() || spec.starts_with('-') {
        return None;
    }
    Some(spec)
}

/// Read and filter a requirements file.
///
/// # Errors
///
/// Returns [`RequirementsError::NotFound`] if `path` is not a file, or
/// [`RequirementsError::Read`] if it cannot be read as UTF-8 text.
pub fn load(path: &Path) -> Result<Vec<RequirementSpec>, RequirementsError> {
    if !path.is_file() {
        return Err(RequirementsError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| RequirementsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let specs = parse(&text);
    tracing::debug!("Parsed {} requirement(s) from {}", specs.len(), path.display());
    Ok(specs)
}
