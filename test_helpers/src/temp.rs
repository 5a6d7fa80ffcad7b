//! UTF-8 scratch directories for tests writing generated output.

use anyhow::{Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary directory with a UTF-8 path, removed on drop.
///
/// # Examples
///
/// ```
/// use ctb_confgen_test_helpers::temp::Utf8TempDir;
///
/// let scratch = Utf8TempDir::new().expect("temp dir");
/// assert!(scratch.path().is_dir());
/// ```
#[derive(Debug)]
pub struct Utf8TempDir {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl Utf8TempDir {
    /// Creates a fresh directory under the system temp location.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or its path is not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow!("non UTF-8 temp dir {}", path.display()))?;
        Ok(Self { _dir: dir, path })
    }

    /// Root of the directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// `name` resolved under the directory; nothing is created.
    #[must_use]
    pub fn join(&self, name: &str) -> Utf8PathBuf {
        self.path.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::Utf8TempDir;

    #[test]
    fn directory_is_removed_on_drop() {
        let scratch = Utf8TempDir::new().expect("temp dir");
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        drop(scratch);
        assert!(!path.exists());
    }
}
