/// Conflict-safe destination naming.
///
/// A desired destination that is already taken is replaced by the first free
/// `name (N).ext` sibling, checked against the live filesystem at call time.
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Picks destination paths that never clobber an existing file.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Returns `desired` unchanged if `overwrite` is set or nothing exists
    /// there, otherwise the first free `stem (N).ext` candidate, N = 1, 2, ...
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortdir::conflict::ConflictResolver;
    /// use std::path::Path;
    ///
    /// // With Images/jpg/a.jpg already present:
    /// let path = ConflictResolver::resolve(Path::new("Images/jpg/a.jpg"), false);
    /// assert_eq!(path, Path::new("Images/jpg/a (1).jpg"));
    /// ```
    pub fn resolve(desired: &Path, overwrite: bool) -> PathBuf {
        Self::resolve_with(desired, overwrite, is_occupied)
    }

    /// Like [`resolve`](Self::resolve), but also treats every path in
    /// `reserved` as taken.
    ///
    /// Dry runs use this to account for destinations that earlier files in
    /// the same run would have occupied.
    pub fn resolve_reserved(
        desired: &Path,
        overwrite: bool,
        reserved: &HashSet<PathBuf>,
    ) -> PathBuf {
        Self::resolve_with(desired, overwrite, |path| {
            reserved.contains(path) || is_occupied(path)
        })
    }

    fn resolve_with(desired: &Path, overwrite: bool, taken: impl Fn(&Path) -> bool) -> PathBuf {
        if overwrite || !taken(desired) {
            return desired.to_path_buf();
        }

        let mut n: u64 = 1;
        loop {
            let candidate = numbered_candidate(desired, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// True if anything, including a dangling symlink, sits at `path`.
pub fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn numbered_candidate(desired: &Path, n: u64) -> PathBuf {
    let mut name = OsString::new();
    if let Some(stem) = desired.file_stem() {
        name.push(stem);
    }
    name.push(format!(" ({n})"));
    if let Some(ext) = desired.extension() {
        name.push(".");
        name.push(ext);
    }
    desired.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_free_destination_is_returned_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("a.jpg");

        assert_eq!(ConflictResolver::resolve(&desired, false), desired);
    }

    #[test]
    fn test_overwrite_returns_desired_even_when_taken() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("a.jpg");
        fs::write(&desired, "x").expect("Failed to write test file");

        assert_eq!(ConflictResolver::resolve(&desired, true), desired);
    }

    #[test]
    fn test_taken_destination_gets_numbered_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("report.final.pdf");
        fs::write(&desired, "x").expect("Failed to write test file");
        fs::write(temp_dir.path().join("report.final (1).pdf"), "x")
            .expect("Failed to write test file");

        let resolved = ConflictResolver::resolve(&desired, false);
        assert_eq!(resolved, temp_dir.path().join("report.final (2).pdf"));
        assert!(!resolved.exists());
    }

    #[test]
    fn test_name_without_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("README");
        fs::write(&desired, "x").expect("Failed to write test file");

        assert_eq!(
            ConflictResolver::resolve(&desired, false),
            temp_dir.path().join("README (1)")
        );
    }

    #[test]
    fn test_resolve_is_stable_when_nothing_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("a.jpg");
        fs::write(&desired, "x").expect("Failed to write test file");

        let first = ConflictResolver::resolve(&desired, false);
        let second = ConflictResolver::resolve(&desired, false);
        assert_eq!(first, second);

        // Once the first answer is used, the next call moves on.
        fs::write(&first, "y").expect("Failed to write test file");
        assert_eq!(
            ConflictResolver::resolve(&desired, false),
            temp_dir.path().join("a (2).jpg")
        );
    }

    #[test]
    fn test_reserved_paths_count_as_taken() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("a.jpg");
        let mut reserved = HashSet::new();
        reserved.insert(desired.clone());

        assert_eq!(
            ConflictResolver::resolve_reserved(&desired, false, &reserved),
            temp_dir.path().join("a (1).jpg")
        );
        assert_eq!(
            ConflictResolver::resolve_reserved(&desired, true, &reserved),
            desired
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_occupied() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("link.txt");
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), &desired)
            .expect("Failed to create symlink");

        assert!(is_occupied(&desired));
        assert_eq!(
            ConflictResolver::resolve(&desired, false),
            temp_dir.path().join("link (1).txt")
        );
    }
}
