//! Polling-based folder watcher.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::error::{WatcherError, WatcherResult};
use crate::model::{FileStamp, WatchEvent};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Watches a folder tree for created, modified, and deleted files by
/// periodically re-walking it and diffing against the previous snapshot.
///
/// There is no dependency on OS-level filesystem notification APIs; a plain
/// polling loop keeps this portable and trivially testable, at the cost of
/// detection latency bounded by the poll interval.
pub struct FolderWatcher {
    root: PathBuf,
    poll_interval: Duration,
    sender: broadcast::Sender<WatchEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FolderWatcher {
    /// Create a watcher for `root`. Call [`FolderWatcher::start`] to begin
    /// polling.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            sender,
            task: Mutex::new(None),
        })
    }

    /// Create a watcher for `root` with a non-default poll interval (2s
    /// otherwise).
    #[must_use]
    pub fn with_poll_interval(root: impl Into<PathBuf>, poll_interval: Duration) -> Arc<Self> {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            root: root.into(),
            poll_interval,
            sender,
            task: Mutex::new(None),
        })
    }

    /// The folder this watcher polls.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subscribe to change events. Each subscriber receives every event
    /// published after it subscribes; a slow subscriber may see
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    /// Start the polling loop in the background, if not already running.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial snapshot of `root` fails.
    #[instrument(name = "watcher.start", skip(self), fields(root = %self.root.display()))]
    pub async fn start(self: &Arc<Self>) -> WatcherResult<()> {
        let mut guard = self.task.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let initial = Self::snapshot(&self.root)?;
        let watcher = Arc::clone(self);
        let handle = tokio::spawn(async move { watcher.run_loop(initial).await });
        *guard = Some(handle);
        Ok(())
    }

    /// Stop the polling loop, if running.
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }

    /// Whether the polling loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    async fn run_loop(self: Arc<Self>, mut previous: HashMap<PathBuf, FileStamp>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.tick().await; // first tick fires immediately; already captured as `previous`

        loop {
            ticker.tick().await;
            let current = match Self::snapshot(&self.root) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "failed to snapshot watch root, skipping this poll");
                    continue;
                }
            };

            for event in diff_snapshots(&previous, &current) {
                debug!(?event, "detected change");
                // No receivers is the common case between subscriptions; not an error.
                let _ = self.sender.send(event);
            }
            previous = current;
        }
    }

    /// Walk `root` and record each regular file's size and modification
    /// time, keyed by path relative to `root`. Entries under `.git` or
    /// `.xet` are skipped, since those are metadata directories rather than
    /// synced content.
    fn snapshot(root: &Path) -> WatcherResult<HashMap<PathBuf, FileStamp>> {
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory { path: root.to_path_buf() });
        }

        let mut stamps = HashMap::new();
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.file_name().to_str().is_none_or(|name| name != ".git" && name != ".xet")
        });

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            stamps.insert(
                relative,
                FileStamp {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                },
            );
        }

        Ok(stamps)
    }
}

fn diff_snapshots(previous: &HashMap<PathBuf, FileStamp>, current: &HashMap<PathBuf, FileStamp>) -> Vec<WatchEvent> {
    let mut events = Vec::new();

    for (path, stamp) in current {
        match previous.get(path) {
            None => events.push(WatchEvent::Created(path.clone())),
            Some(previous_stamp) if previous_stamp != stamp => events.push(WatchEvent::Modified(path.clone())),
            Some(_) => {}
        }
    }
    for path in previous.keys() {
        if !current.contains_key(path) {
            events.push(WatchEvent::Deleted(path.clone()));
        }
    }

    events.sort_by(|a, b| a.path().cmp(b.path()));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn detects_created_modified_deleted() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"one").await.unwrap();

        let watcher = FolderWatcher::with_poll_interval(dir.path(), StdDuration::from_millis(50));
        let mut events = watcher.subscribe();
        watcher.start().await.unwrap();

        tokio::fs::write(dir.path().join("b.txt"), b"two").await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(40)).await;
        tokio::fs::write(dir.path().join("a.txt"), b"one changed").await.unwrap();
        tokio::fs::remove_file(dir.path().join("a.txt")).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            match tokio::time::timeout(StdDuration::from_secs(2), events.recv()).await {
                Ok(Ok(event)) => seen.push(event),
                _ => break,
            }
        }

        watcher.stop().await;
        assert!(seen.iter().any(|e| matches!(e, WatchEvent::Created(p) if p == Path::new("b.txt"))));
        assert!(seen.iter().any(|e| matches!(e, WatchEvent::Deleted(p) if p == Path::new("a.txt"))));
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = FolderWatcher::new(dir.path());
        watcher.start().await.unwrap();
        assert!(watcher.is_running().await);
        watcher.start().await.unwrap();
        assert!(watcher.is_running().await);
        watcher.stop().await;
        assert!(!watcher.is_running().await);
    }

    #[test]
    fn diff_reports_all_three_kinds() {
        let mut previous = HashMap::new();
        previous.insert(PathBuf::from("keep.txt"), FileStamp { modified: None, len: 1 });
        previous.insert(PathBuf::from("gone.txt"), FileStamp { modified: None, len: 1 });
        previous.insert(PathBuf::from("changed.txt"), FileStamp { modified: None, len: 1 });

        let mut current = HashMap::new();
        current.insert(PathBuf::from("keep.txt"), FileStamp { modified: None, len: 1 });
        current.insert(PathBuf::from("changed.txt"), FileStamp { modified: None, len: 2 });
        current.insert(PathBuf::from("new.txt"), FileStamp { modified: None, len: 1 });

        let events = diff_snapshots(&previous, &current);
        assert_eq!(events.len(), 3);
        assert!(events.contains(&WatchEvent::Created(PathBuf::from("new.txt"))));
        assert!(events.contains(&WatchEvent::Modified(PathBuf::from("changed.txt"))));
        assert!(events.contains(&WatchEvent::Deleted(PathBuf::from("gone.txt"))));
    }
}
