//! Filesystem layout helpers.

use std::path::{Path, PathBuf};

use crate::error::SetupError;

/// Requirements file read when none is given on the command line.
pub const DEFAULT_REQUIREMENTS_FILE: &str = "requirements.txt";

/// Destination root used when none is given on the command line.
pub const DEFAULT_DEST_DIR: &str = "wheels_offline";

/// Strip every character outside `[A-Za-z0-9_-]`.
///
/// ```
/// use wheelpack_core::paths::sanitize_dir_name;
///
/// assert_eq!(sanitize_dir_name("zope.interface"), "zopeinterface");
/// assert_eq!(sanitize_dir_name("typing_extensions"), "typing_extensions");
/// ```
pub fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Per-package download directory: `<root>/<sanitized name>`
pub fn package_dir(root: &Path, dir_name: &str) -> PathBuf {
    root.join(dir_name)
}

/// Create the destination root and return its absolute path.
///
/// # Errors
///
/// Returns [`SetupError::CreateDest`] if the directory cannot be created.
pub fn prepare_dest_root(dest: &Path) -> Result<PathBuf, SetupError> {
    std::fs::create_dir_all(dest).map_err(|source| SetupError::CreateDest {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(std::path::absolute(dest).unwrap_or_else(|_| dest.to_path_buf()))
}
