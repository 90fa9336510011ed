//! Temp folder builders for tests that need a real directory tree on disk
//! (`.tonic` creation, the folder watcher, the sync manager's persistence
//! files).

use std::path::Path;

use tempfile::TempDir;

/// A scratch directory populated with a fixed set of relative-path/content
/// pairs. Dropped (and deleted) at the end of the owning test.
pub struct FixtureFolder {
    dir: TempDir,
}

impl FixtureFolder {
    /// Create a new empty scratch directory.
    ///
    /// # Panics
    ///
    /// Panics if a temp directory cannot be created; acceptable in test
    /// code where there is no caller to recover.
    #[must_use]
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("create temp folder fixture") }
    }

    /// Create a scratch directory containing `files` (relative path, raw
    /// bytes), creating any intermediate subdirectories.
    #[must_use]
    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        let fixture = Self::new();
        for (path, contents) in files {
            fixture.write(path, contents);
        }
        fixture
    }

    /// Write (or overwrite) a file at `relative_path`, creating parent
    /// directories as needed.
    pub fn write(&self, relative_path: &str, contents: &[u8]) {
        let full_path = self.dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture parent dir");
        }
        std::fs::write(&full_path, contents).expect("write fixture file");
    }

    /// Remove a file previously written with [`Self::write`].
    pub fn remove(&self, relative_path: &str) {
        let _ = std::fs::remove_file(self.dir.path().join(relative_path));
    }

    /// The folder root, for handing to a `FolderWatcher`, `GitAnchorAdapter`,
    /// or `.tonic` builder under test.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for FixtureFolder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_files_creates_nested_paths() {
        let fixture = FixtureFolder::with_files(&[("a.txt", b"hello"), ("sub/b.bin", &[0x00, 0x01, 0x02])]);
        assert_eq!(std::fs::read(fixture.root().join("a.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(fixture.root().join("sub/b.bin")).unwrap(), vec![0x00, 0x01, 0x02]);
    }

    #[test]
    fn remove_deletes_a_written_file() {
        let fixture = FixtureFolder::with_files(&[("a.txt", b"hello")]);
        fixture.remove("a.txt");
        assert!(!fixture.root().join("a.txt").exists());
    }
}
