//! Copy a package's first successful download set into the shared root.

use std::io;
use std::path::Path;

/// Whether `a` and `b` name the same directory.
///
/// Falls back to a lexical comparison when either path cannot be resolved.
pub fn is_same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.components().eq(b.components()),
    }
}

/// Copy every regular file in `src` into `dst`, overwriting same-named files.
///
/// Subdirectories are skipped. Returns the number of files copied.
///
/// # Errors
///
/// Returns [`io::ErrorKind::NotFound`] if `src` is not a directory,
/// [`io::ErrorKind::InvalidInput`] if `src` and `dst` are the same directory
/// (copying a file onto itself truncates it), or the error of a failed copy.
pub fn promote_files(src: &Path, dst: &Path) -> io::Result<usize> {
    if !src.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", src.display()),
        ));
    }
    if is_same_dir(src, dst) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is both source and destination", src.display()),
        ));
    }

    let mut copied = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let target = dst.join(entry.file_name());
        tracing::debug!("      Copying {} to {}", entry.path().display(), target.display());
        std::fs::copy(entry.path(), &target)?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copies_files_only() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("flask");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("flask-3.0-py3-none-any.whl"), "wheel").unwrap();
        std::fs::write(src.join("click-8.1-py3-none-any.whl"), "click").unwrap();
        std::fs::write(src.join("nested/ignored.whl"), "x").unwrap();

        let copied = promote_files(&src, tmp.path()).unwrap();
        assert_eq!(copied, 2);
        assert!(tmp.path().join("flask-3.0-py3-none-any.whl").is_file());
        assert!(tmp.path().join("click-8.1-py3-none-any.whl").is_file());
        assert!(!tmp.path().join("ignored.whl").exists());
    }

    #[test]
    fn test_overwrites_existing() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("pkg");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.whl"), "new").unwrap();
        std::fs::write(tmp.path().join("a.whl"), "old").unwrap();

        promote_files(&src, tmp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path().join("a.whl")).unwrap(), "new");
    }

    #[test]
    fn test_same_dir_is_rejected_and_untouched() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("a.whl"), "WHEELDATA").unwrap();

        // `root/.` resolves to `root`
        let err = promote_files(&tmp.path().join("."), tmp.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("a.whl")).unwrap(),
            "WHEELDATA"
        );
    }

    #[test]
    fn test_is_same_dir() {
        let tmp = tempdir().unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        assert!(is_same_dir(tmp.path(), &sub.join("..")));
        assert!(!is_same_dir(tmp.path(), &sub));
        assert!(is_same_dir(Path::new("missing/x"), Path::new("missing/x")));
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let tmp = tempdir().unwrap();
        let err = promote_files(&tmp.path().join("absent"), tmp.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
