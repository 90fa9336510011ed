//! Writes and removes the daemon's PID file (spec.md §6: `daemon.pid`).

use std::path::Path;

/// Write the current process id to `path`, creating parent directories
/// as needed.
///
/// # Errors
///
/// Returns an error if the parent directory or file cannot be created.
pub(crate) fn write_pid_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, std::process::id().to_string())
}

/// Remove the PID file, ignoring a missing file.
pub(crate) fn remove_pid_file(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove pid file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_remove_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("daemon.pid");
        write_pid_file(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.parse::<u32>().unwrap(), std::process::id());

        remove_pid_file(&path);
        assert!(!path.exists());
    }

    #[test]
    fn remove_missing_file_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        remove_pid_file(&dir.path().join("absent.pid"));
    }
}
