//! Persistence of `<folder>/.xet/consensus_state.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ccbt_tonic::ChunkHash;
use data_encoding::HEXLOWER;
use tracing::{info, warn};

use crate::error::SyncResult;
use crate::model::PersistedSyncState;

/// Conventional path for a folder's persisted consensus state.
#[must_use]
pub fn default_state_path(folder: &Path) -> PathBuf {
    folder.join(".xet").join("consensus_state.json")
}

/// Persist `state` to `path`, creating parent directories as needed.
pub async fn save(path: &Path, state: &PersistedSyncState) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| crate::error::SyncError::Io { operation: "sync.persist.mkdir", source })?;
    }
    let json = serde_json::to_vec_pretty(state)?;
    tokio::fs::write(path, json).await.map_err(|source| crate::error::SyncError::Io { operation: "sync.persist.write", source })?;
    info!(path = %path.display(), "persisted sync manager state");
    Ok(())
}

/// Restore state from `path`. A missing or unparsable file yields `None`
/// rather than an error, matching the "best-effort restore" contract used
/// throughout this component's failure handling.
pub async fn load(path: &Path) -> Option<PersistedSyncState> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to parse persisted sync state; starting fresh");
            None
        }
    }
}

/// Encode a vote map keyed by raw chunk hashes into the hex-keyed form
/// used on disk.
#[must_use]
pub fn encode_votes(votes: &HashMap<ChunkHash, HashMap<String, bool>>) -> HashMap<String, HashMap<String, bool>> {
    votes.iter().map(|(hash, peers)| (HEXLOWER.encode(hash), peers.clone())).collect()
}

/// Decode a hex-keyed vote map back into raw chunk hashes, skipping any
/// key that is not valid 32-byte hex.
#[must_use]
pub fn decode_votes(votes: &HashMap<String, HashMap<String, bool>>) -> HashMap<ChunkHash, HashMap<String, bool>> {
    votes
        .iter()
        .filter_map(|(hex, peers)| {
            let bytes = HEXLOWER.decode(hex.as_bytes()).ok()?;
            let hash: ChunkHash = bytes.try_into().ok()?;
            Some((hash, peers.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_state_path(dir.path());

        let mut votes = HashMap::new();
        votes.insert("peer-a".to_string(), true);
        let mut raw_votes = HashMap::new();
        raw_votes.insert([7u8; 32], votes);

        let state = PersistedSyncState { sync_mode: "consensus".to_string(), consensus_threshold: 0.6, consensus_votes: encode_votes(&raw_votes) };

        save(&path, &state).await.unwrap();
        let restored = load(&path).await.unwrap();
        assert_eq!(restored.sync_mode, "consensus");
        assert_eq!(decode_votes(&restored.consensus_votes), raw_votes);
    }

    #[tokio::test]
    async fn missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_state_path(dir.path());
        assert!(load(&path).await.is_none());
    }
}
