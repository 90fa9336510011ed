//! PID file handling (spec.md §4.13: `get_daemon_pid()`).

use std::path::{Path, PathBuf};
use std::time::Duration;

const PID_FILENAME: &str = "daemon.pid";
const READ_RETRIES: u32 = 3;
const READ_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Default location of the daemon's PID file.
///
/// # Errors
///
/// Returns an error if the home directory cannot be resolved.
pub fn pid_file_path() -> ccbt_config::ConfigResult<PathBuf> {
    Ok(ccbt_config::daemon_home_dir()?.join(PID_FILENAME))
}

/// Read and validate the daemon's PID file, with a small retry loop to
/// tolerate a writer that is mid-write. Returns `None` if the file is
/// absent, unparseable, or names a process that is no longer running
/// (in the latter case the stale file is removed).
pub async fn get_daemon_pid(path: &Path) -> Option<u32> {
    for attempt in 0..READ_RETRIES {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let Some(pid) = contents.trim().parse::<u32>().ok().filter(|pid| *pid > 0) else {
                    return None;
                };
                if process_exists(pid) {
                    return Some(pid);
                }
                let _ = std::fs::remove_file(path);
                return None;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(_) if attempt + 1 < READ_RETRIES => tokio::time::sleep(READ_RETRY_DELAY).await,
            Err(_) => return None,
        }
    }
    None
}

/// Whether a process with the given id currently exists.
///
/// On Linux this reads `/proc/<pid>`; other platforms have no portable
/// stdlib equivalent, so this conservatively assumes the process is
/// running rather than discarding a possibly-valid PID file.
#[cfg(target_os = "linux")]
fn process_exists(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_exists(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get_daemon_pid(&dir.path().join("daemon.pid")).await.is_none());
    }

    #[tokio::test]
    async fn malformed_contents_return_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        std::fs::write(&path, "not-a-pid").unwrap();
        assert!(get_daemon_pid(&path).await.is_none());
    }

    #[tokio::test]
    async fn stale_pid_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        std::fs::write(&path, "999999999").unwrap();
        assert!(get_daemon_pid(&path).await.is_none());
        assert!(!path.exists(), "stale PID file should have been removed");
    }

    #[tokio::test]
    async fn own_pid_is_recognized_as_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        std::fs::write(&path, std::process::id().to_string()).unwrap();
        assert_eq!(get_daemon_pid(&path).await, Some(std::process::id()));
    }
}
