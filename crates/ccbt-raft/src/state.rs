//! Persistent Raft state: term, vote, and log.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RaftError, RaftResult};

/// A single entry in the replicated log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Term in which the leader created this entry.
    pub term: u64,
    /// Position within the log (zero-based); equal to the index the entry
    /// was appended at.
    pub index: u64,
    /// Opaque command payload; interpretation belongs to the apply
    /// callback, not the Raft node.
    pub command: serde_json::Value,
    /// Unix timestamp (seconds) at append time.
    pub timestamp: f64,
}

fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default()
}

/// Persistent Raft state: `current_term`, `voted_for`, and the log.
///
/// `commit_index`/`last_applied` are `-1` (modeled as `i64`) when the log
/// is empty; the log itself is zero-indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaftState {
    /// Latest term this node has seen.
    pub current_term: u64,
    /// Candidate voted for in `current_term`, if any.
    pub voted_for: Option<String>,
    /// The replicated log.
    pub log: Vec<LogEntry>,
    /// Index of highest log entry known to be committed; `-1` when empty.
    pub commit_index: i64,
    /// Index of highest log entry applied to the state machine; `-1` when
    /// nothing has been applied.
    pub last_applied: i64,
}

impl Default for RaftState {
    fn default() -> Self {
        Self {
            current_term: 0,
            voted_for: None,
            log: Vec::new(),
            commit_index: -1,
            last_applied: -1,
        }
    }
}

impl RaftState {
    /// Append `command` at the next index under `term`, returning the new
    /// entry.
    pub fn append_entry(&mut self, term: u64, command: serde_json::Value) -> &LogEntry {
        let index = self.log.len() as u64;
        self.log.push(LogEntry {
            term,
            index,
            command,
            timestamp: now_secs(),
        });
        self.log.last().expect("just pushed")
    }

    /// Truncate the log to drop any entry at or after `index`, then append
    /// `entries`. Used by `AppendEntries` to resolve conflicting suffixes.
    pub fn truncate_and_append(&mut self, from_index: u64, entries: Vec<LogEntry>) {
        self.log.truncate(from_index as usize);
        self.log.extend(entries);
    }

    /// Fetch the entry at `index`, if any.
    #[must_use]
    pub fn get_entry(&self, index: u64) -> Option<&LogEntry> {
        self.log.get(index as usize)
    }

    /// Index of the last log entry, or `-1` if the log is empty.
    #[must_use]
    pub fn last_log_index(&self) -> i64 {
        self.log.len() as i64 - 1
    }

    /// Term of the last log entry, or `0` if the log is empty.
    #[must_use]
    pub fn last_log_term(&self) -> u64 {
        self.log.last().map_or(0, |entry| entry.term)
    }

    /// Save state to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`RaftError::PersistenceFailed`] on any I/O failure. Per
    /// contract this must abort the RPC handler that triggered the save,
    /// leaving in-memory state unchanged.
    pub async fn save(&self, path: &Path) -> RaftResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| RaftError::PersistenceFailed {
                path: path.display().to_string(),
                source,
            })?;
        }
        let bytes = serde_json::to_vec_pretty(self).expect("RaftState serialization is infallible");
        tokio::fs::write(path, bytes).await.map_err(|source| RaftError::PersistenceFailed {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "saved raft state");
        Ok(())
    }

    /// Load state from `path`. Any failure (missing file, corrupt JSON)
    /// yields default state rather than propagating, matching the
    /// non-fatal load semantics of the state this was ported from.
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<Self>(&bytes) {
                Ok(state) => {
                    debug!(path = %path.display(), "loaded raft state");
                    state
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "corrupt raft state file, using default");
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no raft state file, using default");
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read raft state file, using default");
                Self::default()
            }
        }
    }
}

/// Default relative location for Raft state within a folder's `.xet`
/// metadata directory.
#[must_use]
pub fn default_state_path(folder: &Path) -> PathBuf {
    folder.join(".xet").join("raft").join("raft_state.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_has_sentinel_index_and_term() {
        let state = RaftState::default();
        assert_eq!(state.last_log_index(), -1);
        assert_eq!(state.last_log_term(), 0);
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let mut state = RaftState::default();
        state.append_entry(1, serde_json::json!({"op": "a"}));
        state.append_entry(1, serde_json::json!({"op": "b"}));
        assert_eq!(state.last_log_index(), 1);
        assert_eq!(state.get_entry(0).unwrap().index, 0);
        assert_eq!(state.get_entry(1).unwrap().index, 1);
    }

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_state_path(dir.path());

        let mut state = RaftState::default();
        state.current_term = 4;
        state.voted_for = Some("node-b".to_string());
        state.append_entry(4, serde_json::json!({"op": "noop"}));
        state.save(&path).await.unwrap();

        let loaded = RaftState::load(&path).await;
        assert_eq!(loaded.current_term, 4);
        assert_eq!(loaded.voted_for.as_deref(), Some("node-b"));
        assert_eq!(loaded.log.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let loaded = RaftState::load(&path).await;
        assert_eq!(loaded.current_term, 0);
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raft_state.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let loaded = RaftState::load(&path).await;
        assert_eq!(loaded.current_term, 0);
    }
}
