//! The sync manager: per-folder update queue and policy-driven commit
//! pipeline (component C8, spec.md §4.8).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ccbt_byzantine::{ByzantineAggregator, Vote};
use ccbt_raft::{ApplyCommand, RaftNode};
use ccbt_tonic::{ChunkHash, SyncMode};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::election::{elect_source, DEFAULT_SOURCE_ELECTION_INTERVAL_SECS};
use crate::error::SyncResult;
use crate::model::{ConflictResolver, LatestWinsResolver, PeerSyncState, PersistedSyncState, SyncStats, UpdateEntry, UpdateHandler};
use crate::persistence::{decode_votes, default_state_path, encode_votes, load, save};
use crate::queue::UpdateQueue;

/// Default bound on the number of queued, unapplied updates.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
/// Default retries before a failing update is dropped.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Timeout for a `process_updates` pass under non-consensus policies.
pub const NON_CONSENSUS_TIMEOUT: Duration = Duration::from_secs(300);
/// Timeout for a `process_updates` pass under the consensus policy.
pub const CONSENSUS_TIMEOUT: Duration = Duration::from_secs(600);

fn now_secs() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

struct State {
    sync_mode: SyncMode,
    source_peers: HashSet<String>,
    peer_states: HashMap<String, PeerSyncState>,
    consensus_votes: HashMap<ChunkHash, HashMap<String, bool>>,
    raft_submitted: HashSet<(String, ChunkHash)>,
    stats: SyncStats,
}

/// Per-folder update queue and policy engine.
///
/// Owns at most one of `{raft, byzantine}` (spec.md §3 ownership); both are
/// attached post-construction via [`Self::set_raft`] / [`Self::set_byzantine`]
/// because the Raft node's apply callback must hold a reference back to
/// this manager, which cannot exist until the manager itself does.
pub struct SyncManager {
    folder: PathBuf,
    self_peer_id: String,
    consensus_threshold: f64,
    max_retries: u32,
    queue: Mutex<UpdateQueue>,
    state: RwLock<State>,
    raft: RwLock<Option<Arc<RaftNode>>>,
    byzantine: RwLock<Option<Arc<ByzantineAggregator>>>,
    handler: RwLock<Option<Arc<dyn UpdateHandler>>>,
    conflict_resolver: RwLock<Arc<dyn ConflictResolver>>,
    election_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncManager {
    /// Construct a manager rooted at `folder` under the given initial sync
    /// mode. `self_peer_id` is this node's own peer id, used for the
    /// implicit self-yes vote injected in the Byzantine consensus path.
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>, sync_mode: SyncMode, consensus_threshold: f64, self_peer_id: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            self_peer_id: self_peer_id.into(),
            consensus_threshold,
            max_retries: DEFAULT_MAX_RETRIES,
            queue: Mutex::new(UpdateQueue::new(DEFAULT_MAX_QUEUE_SIZE)),
            state: RwLock::new(State {
                sync_mode,
                source_peers: HashSet::new(),
                peer_states: HashMap::new(),
                consensus_votes: HashMap::new(),
                raft_submitted: HashSet::new(),
                stats: SyncStats::default(),
            }),
            raft: RwLock::new(None),
            byzantine: RwLock::new(None),
            handler: RwLock::new(None),
            conflict_resolver: RwLock::new(Arc::new(LatestWinsResolver)),
            election_task: Mutex::new(None),
        }
    }

    /// Attach the Raft node used for the `consensus` policy. At most one of
    /// `{raft, byzantine}` should be set; setting Raft clears Byzantine.
    pub async fn set_raft(&self, raft: Arc<RaftNode>) {
        *self.raft.write().await = Some(raft);
        *self.byzantine.write().await = None;
    }

    /// Attach the Byzantine aggregator used for the `consensus` policy when
    /// Raft is not configured.
    pub async fn set_byzantine(&self, byzantine: Arc<ByzantineAggregator>) {
        *self.byzantine.write().await = Some(byzantine);
        *self.raft.write().await = None;
    }

    /// Set the handler invoked to apply accepted updates, and the conflict
    /// resolver used under `best_effort`/`broadcast`. Called once by the
    /// folder manager at `start()`.
    pub async fn set_handler(&self, handler: Arc<dyn UpdateHandler>, conflict_resolver: Arc<dyn ConflictResolver>) {
        *self.handler.write().await = Some(handler);
        *self.conflict_resolver.write().await = conflict_resolver;
    }

    /// Replace the active sync mode atomically.
    pub async fn set_sync_mode(&self, mode: SyncMode) {
        self.state.write().await.sync_mode = mode;
    }

    /// The active sync mode.
    pub async fn sync_mode(&self) -> SyncMode {
        self.state.read().await.sync_mode
    }

    /// Register a peer id as a designated source.
    pub async fn add_source_peer(&self, peer_id: impl Into<String>) {
        self.state.write().await.source_peers.insert(peer_id.into());
    }

    /// Remove a peer id from the designated-source set.
    pub async fn remove_source_peer(&self, peer_id: &str) {
        self.state.write().await.source_peers.remove(peer_id);
    }

    /// Upsert a peer's synchronization state.
    pub async fn update_peer_state(&self, peer: PeerSyncState) {
        self.state.write().await.peer_states.insert(peer.peer_id.clone(), peer);
    }

    /// Current count of queued, unapplied updates.
    pub async fn queue_depth(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Snapshot of current aggregate stats.
    pub async fn stats(&self) -> SyncStats {
        self.state.read().await.stats
    }

    /// Snapshot of all known peer states.
    pub async fn peer_states(&self) -> Vec<PeerSyncState> {
        self.state.read().await.peer_states.values().cloned().collect()
    }

    /// Enqueue a new update. Returns `false` (and drops the update) if the
    /// queue is already at capacity.
    #[instrument(name = "sync.queue_update", skip_all)]
    pub async fn queue_update(&self, file_path: impl Into<String>, chunk_hash: ChunkHash, git_ref: Option<String>, priority: i32, source_peer: Option<String>) -> bool {
        let entry = UpdateEntry::new(file_path, chunk_hash, git_ref, now_secs(), priority, source_peer, self.max_retries);
        let accepted = self.queue.lock().await.push(entry);
        if !accepted {
            self.state.write().await.stats.updates_dropped_queue_full += 1;
            warn!("update queue full; dropping new update");
        }
        accepted
    }

    /// Record an external vote for `chunk_hash` from `peer_id`. Returns
    /// whether the simple-ratio rule now considers consensus reached; this
    /// is advisory when Raft or Byzantine mode is active.
    pub async fn vote_on_update(&self, chunk_hash: ChunkHash, peer_id: impl Into<String>, vote: bool) -> bool {
        let mut state = self.state.write().await;
        state.consensus_votes.entry(chunk_hash).or_default().insert(peer_id.into(), vote);
        let votes = &state.consensus_votes[&chunk_hash];
        let yes = votes.values().filter(|v| **v).count();
        yes as f64 / votes.len() as f64 >= self.consensus_threshold
    }

    /// Run one processing pass, dispatching to the policy-specific handler
    /// under a policy-specific timeout. Returns the number of updates
    /// applied; a timed-out pass returns `0` without raising.
    #[instrument(name = "sync.process_updates", skip(self))]
    pub async fn process_updates(&self) -> SyncResult<usize> {
        let mode = self.sync_mode().await;
        let timeout = if mode == SyncMode::Consensus { CONSENSUS_TIMEOUT } else { NON_CONSENSUS_TIMEOUT };

        match tokio::time::timeout(timeout, self.process_updates_inner(mode)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(mode = mode.as_str(), "process_updates pass exceeded its timeout");
                Ok(0)
            }
        }
    }

    async fn process_updates_inner(&self, mode: SyncMode) -> SyncResult<usize> {
        match mode {
            SyncMode::Designated => self.process_designated().await,
            SyncMode::BestEffort | SyncMode::Broadcast => self.process_best_effort().await,
            SyncMode::Consensus => self.process_consensus().await,
        }
    }

    async fn process_designated(&self) -> SyncResult<usize> {
        let Some(handler) = self.handler.read().await.clone() else {
            return Ok(0);
        };
        let entries = self.queue.lock().await.drain_all();
        let source_peers = self.state.read().await.source_peers.clone();

        let mut applied = 0usize;
        let mut requeue = Vec::new();
        for mut entry in entries {
            let eligible = entry.source_peer.as_deref().is_some_and(|peer| source_peers.contains(peer));
            if !eligible {
                self.state.write().await.stats.updates_skipped += 1;
                requeue.push(entry);
                continue;
            }

            match handler.apply(&entry).await {
                Ok(()) => {
                    applied += 1;
                    self.state.write().await.stats.updates_applied += 1;
                }
                Err(err) => {
                    entry.retry_count += 1;
                    if entry.retry_count >= entry.max_retries {
                        warn!(file = %entry.file_path, error = %err, "dropping update after exhausting retries");
                        self.state.write().await.stats.updates_failed += 1;
                    } else {
                        requeue.push(entry);
                    }
                }
            }
        }

        let mut queue = self.queue.lock().await;
        for entry in requeue {
            queue.push(entry);
        }
        Ok(applied)
    }

    async fn process_best_effort(&self) -> SyncResult<usize> {
        let Some(handler) = self.handler.read().await.clone() else {
            return Ok(0);
        };
        let resolver = self.conflict_resolver.read().await.clone();
        let entries = self.queue.lock().await.drain_all();

        let mut by_file: HashMap<String, UpdateEntry> = HashMap::new();
        for entry in entries {
            match by_file.remove(&entry.file_path) {
                Some(existing) => {
                    let winner = resolver.resolve(existing, entry).await;
                    by_file.insert(winner.file_path.clone(), winner);
                }
                None => {
                    by_file.insert(entry.file_path.clone(), entry);
                }
            }
        }

        let mut winners: Vec<UpdateEntry> = by_file.into_values().collect();
        winners.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.timestamp.cmp(&b.timestamp)));

        let mut applied = 0usize;
        let mut requeue = Vec::new();
        for mut entry in winners {
            match handler.apply(&entry).await {
                Ok(()) => {
                    applied += 1;
                    self.state.write().await.stats.updates_applied += 1;
                }
                Err(err) => {
                    entry.retry_count += 1;
                    if entry.retry_count >= entry.max_retries {
                        warn!(file = %entry.file_path, error = %err, "dropping update after exhausting retries");
                        self.state.write().await.stats.updates_failed += 1;
                    } else {
                        requeue.push(entry);
                    }
                }
            }
        }

        let mut queue = self.queue.lock().await;
        for entry in requeue {
            queue.push(entry);
        }
        Ok(applied)
    }

    async fn process_consensus(&self) -> SyncResult<usize> {
        if let Some(raft) = self.raft.read().await.clone() {
            return self.process_consensus_raft(&raft).await;
        }
        if let Some(byzantine) = self.byzantine.read().await.clone() {
            return self.process_consensus_byzantine(&byzantine).await;
        }
        self.process_consensus_fallback().await
    }

    async fn process_consensus_raft(&self, raft: &RaftNode) -> SyncResult<usize> {
        let entries = self.queue.lock().await.drain_all();
        let mut kept = Vec::new();
        for entry in entries {
            let already_submitted = {
                let state = self.state.read().await;
                state.raft_submitted.contains(&(entry.file_path.clone(), entry.chunk_hash))
            };
            if already_submitted {
                kept.push(entry);
                continue;
            }

            let Ok(command) = serde_json::to_value(&entry) else {
                kept.push(entry);
                continue;
            };
            if raft.append_entry(command).await {
                self.state.write().await.raft_submitted.insert((entry.file_path.clone(), entry.chunk_hash));
            }
            kept.push(entry);
        }

        let mut queue = self.queue.lock().await;
        for entry in kept {
            queue.push(entry);
        }
        // Application and removal happen later via the ApplyCommand callback.
        Ok(0)
    }

    async fn process_consensus_byzantine(&self, byzantine: &ByzantineAggregator) -> SyncResult<usize> {
        let Some(handler) = self.handler.read().await.clone() else {
            return Ok(0);
        };
        let entries = self.queue.lock().await.drain_all();

        let mut applied = 0usize;
        let mut requeue = Vec::new();
        for mut entry in entries {
            let mut votes: Vec<Vote> = {
                let state = self.state.read().await;
                state.consensus_votes.get(&entry.chunk_hash).map(|peers| peers.iter().map(|(peer, vote)| Vote::new(peer.clone(), *vote)).collect()).unwrap_or_default()
            };
            // Implicit self-yes, per spec.md §9(iii); double-counts if this
            // node is also tallied externally under its own peer id.
            votes.push(Vote::new(&self.self_peer_id, true));

            let reached = byzantine.aggregate_votes(&votes).map(|tally| tally.reached).unwrap_or(false);
            if reached {
                match handler.apply(&entry).await {
                    Ok(()) => {
                        applied += 1;
                        let mut state = self.state.write().await;
                        state.stats.updates_applied += 1;
                        state.consensus_votes.remove(&entry.chunk_hash);
                    }
                    Err(err) => {
                        warn!(file = %entry.file_path, error = %err, "handler failed after consensus reached");
                        entry.retry_count += 1;
                        if entry.retry_count >= entry.max_retries {
                            self.state.write().await.stats.updates_failed += 1;
                        } else {
                            requeue.push(entry);
                        }
                    }
                }
            } else {
                entry.retry_count += 1;
                if entry.retry_count >= entry.max_retries {
                    self.state.write().await.stats.updates_failed += 1;
                } else {
                    requeue.push(entry);
                }
            }
        }

        let mut queue = self.queue.lock().await;
        for entry in requeue {
            queue.push(entry);
        }
        Ok(applied)
    }

    async fn process_consensus_fallback(&self) -> SyncResult<usize> {
        let Some(handler) = self.handler.read().await.clone() else {
            return Ok(0);
        };
        let entries = self.queue.lock().await.drain_all();

        let mut applied = 0usize;
        let mut requeue = Vec::new();
        for mut entry in entries {
            let peer_count = self.state.read().await.peer_states.len();
            let reached = if peer_count == 0 {
                true
            } else {
                let state = self.state.read().await;
                let yes = state.consensus_votes.get(&entry.chunk_hash).map(|v| v.values().filter(|vote| **vote).count()).unwrap_or(0);
                (yes as f64 / peer_count as f64) >= self.consensus_threshold
            };

            if reached {
                match handler.apply(&entry).await {
                    Ok(()) => {
                        applied += 1;
                        let mut state = self.state.write().await;
                        state.stats.updates_applied += 1;
                        state.consensus_votes.remove(&entry.chunk_hash);
                    }
                    Err(err) => {
                        warn!(file = %entry.file_path, error = %err, "handler failed after fallback consensus reached");
                        entry.retry_count += 1;
                        if entry.retry_count >= entry.max_retries {
                            self.state.write().await.stats.updates_failed += 1;
                        } else {
                            requeue.push(entry);
                        }
                    }
                }
            } else {
                entry.retry_count += 1;
                if entry.retry_count >= entry.max_retries {
                    self.state.write().await.stats.updates_failed += 1;
                } else {
                    requeue.push(entry);
                }
            }
        }

        let mut queue = self.queue.lock().await;
        for entry in requeue {
            queue.push(entry);
        }
        Ok(applied)
    }

    /// Spawn the background designated-source election loop. No-op if
    /// already running. Scores peers every `interval` and promotes the
    /// highest scorer above the 0.5 threshold (spec.md §4.8).
    pub async fn start_source_election_loop(self: &Arc<Self>, interval: Duration) {
        let mut task = self.election_task.lock().await;
        if task.is_some() {
            return;
        }
        let manager = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                manager.run_source_election().await;
            }
        }));
    }

    /// Default election interval.
    #[must_use]
    pub const fn default_election_interval() -> Duration {
        Duration::from_secs(DEFAULT_SOURCE_ELECTION_INTERVAL_SECS)
    }

    async fn run_source_election(&self) {
        let now = now_secs();
        let mut state = self.state.write().await;
        let Some(winner) = elect_source(&state.peer_states, now) else {
            return;
        };
        for (peer_id, peer) in state.peer_states.iter_mut() {
            peer.is_source = *peer_id == winner;
        }
        state.source_peers.insert(winner.clone());
        info!(peer_id = %winner, "promoted new designated source peer");
    }

    /// Stop background tasks and persist consensus votes / mode to
    /// `<folder>/.xet/consensus_state.json`.
    pub async fn stop(&self) -> SyncResult<()> {
        if let Some(task) = self.election_task.lock().await.take() {
            task.abort();
        }
        if let Some(raft) = self.raft.read().await.as_ref() {
            raft.stop().await;
        }
        self.persist().await
    }

    /// Persist current mode and consensus votes without stopping the
    /// manager; used for periodic checkpointing as well as at `stop()`.
    pub async fn persist(&self) -> SyncResult<()> {
        let state = self.state.read().await;
        let persisted = PersistedSyncState {
            sync_mode: state.sync_mode.as_str().to_string(),
            consensus_threshold: self.consensus_threshold,
            consensus_votes: encode_votes(&state.consensus_votes),
        };
        drop(state);
        save(&default_state_path(&self.folder), &persisted).await
    }

    /// Restore persisted consensus votes, if a state file exists.
    pub async fn restore(&self) {
        let Some(persisted) = load(&default_state_path(&self.folder)).await else {
            return;
        };
        let mut state = self.state.write().await;
        state.consensus_votes = decode_votes(&persisted.consensus_votes);
        debug!(folder = %self.folder.display(), "restored persisted sync manager state");
    }

    /// Path to this manager's folder root.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

#[async_trait]
impl ApplyCommand for SyncManager {
    /// Invoked by the Raft node once a log entry is committed. Applies the
    /// committed update and removes it (and its in-flight marker) from the
    /// local queue — the only point at which a Raft-routed entry leaves the
    /// queue, per spec.md §4.8.
    async fn apply(&self, command: serde_json::Value) {
        let Ok(entry): Result<UpdateEntry, _> = serde_json::from_value(command) else {
            warn!("raft delivered a command that did not decode as an UpdateEntry");
            return;
        };

        let Some(handler) = self.handler.read().await.clone() else {
            return;
        };

        match handler.apply(&entry).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.stats.updates_applied += 1;
                state.raft_submitted.remove(&(entry.file_path.clone(), entry.chunk_hash));
            }
            Err(err) => {
                warn!(file = %entry.file_path, error = %err, "handler failed applying committed raft entry");
                let mut state = self.state.write().await;
                state.stats.updates_failed += 1;
                state.raft_submitted.remove(&(entry.file_path.clone(), entry.chunk_hash));
            }
        }

        let mut queue = self.queue.lock().await;
        if let Some(removed) = queue.remove_first(|queued| queued.file_path == entry.file_path && queued.chunk_hash == entry.chunk_hash) {
            debug!(file = %removed.file_path, "removed raft-committed entry from local queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    struct RecordingHandler {
        applied: Mutex<Vec<String>>,
        fail_paths: HashSet<String>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self { applied: Mutex::new(Vec::new()), fail_paths: HashSet::new() }
        }

        fn failing(paths: &[&str]) -> Self {
            Self { applied: Mutex::new(Vec::new()), fail_paths: paths.iter().map(|s| (*s).to_string()).collect() }
        }
    }

    #[async_trait]
    impl UpdateHandler for RecordingHandler {
        async fn apply(&self, entry: &UpdateEntry) -> Result<(), String> {
            if self.fail_paths.contains(&entry.file_path) {
                return Err("forced failure".to_string());
            }
            self.applied.lock().await.push(entry.file_path.clone());
            Ok(())
        }
    }

    fn manager(mode: SyncMode) -> Arc<SyncManager> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(SyncManager::new(dir.into_path(), mode, 0.6, "self-peer"))
    }

    #[tokio::test]
    async fn designated_only_applies_eligible_source_updates() {
        let mgr = manager(SyncMode::Designated);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;
        mgr.add_source_peer("trusted").await;

        mgr.queue_update("a.txt", [1u8; 32], None, 0, Some("trusted".to_string())).await;
        mgr.queue_update("b.txt", [2u8; 32], None, 0, Some("stranger".to_string())).await;

        let applied = mgr.process_updates().await.unwrap();
        assert_eq!(applied, 1);
        assert_eq!(*handler.applied.lock().await, vec!["a.txt".to_string()]);
        assert_eq!(mgr.queue_depth().await, 1, "skipped entry remains queued");
    }

    #[tokio::test]
    async fn designated_drops_after_max_retries() {
        let mgr = manager(SyncMode::Designated);
        let handler = Arc::new(RecordingHandler::failing(&["a.txt"]));
        mgr.set_handler(handler, Arc::new(LatestWinsResolver)).await;
        mgr.add_source_peer("trusted").await;
        mgr.queue_update("a.txt", [1u8; 32], None, 0, Some("trusted".to_string())).await;

        for _ in 0..DEFAULT_MAX_RETRIES {
            mgr.process_updates().await.unwrap();
        }

        assert_eq!(mgr.queue_depth().await, 0);
        assert_eq!(mgr.stats().await.updates_failed, 1);
    }

    #[tokio::test]
    async fn best_effort_resolves_conflicting_updates_to_same_file() {
        let mgr = manager(SyncMode::BestEffort);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;

        mgr.queue_update("a.txt", [1u8; 32], None, 1, None).await;
        mgr.queue_update("a.txt", [2u8; 32], None, 9, None).await;

        let applied = mgr.process_updates().await.unwrap();
        assert_eq!(applied, 1);
        assert_eq!(*handler.applied.lock().await, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn best_effort_applies_in_priority_order() {
        let mgr = manager(SyncMode::BestEffort);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;

        mgr.queue_update("low.txt", [1u8; 32], None, 1, None).await;
        mgr.queue_update("high.txt", [2u8; 32], None, 9, None).await;

        mgr.process_updates().await.unwrap();
        assert_eq!(*handler.applied.lock().await, vec!["high.txt".to_string(), "low.txt".to_string()]);
    }

    #[tokio::test]
    async fn queue_update_drops_when_full() {
        let mgr = manager(SyncMode::BestEffort);
        for i in 0..DEFAULT_MAX_QUEUE_SIZE {
            assert!(mgr.queue_update(format!("f{i}"), [0u8; 32], None, 0, None).await);
        }
        assert!(!mgr.queue_update("overflow", [0u8; 32], None, 0, None).await);
        assert_eq!(mgr.stats().await.updates_dropped_queue_full, 1);
    }

    #[tokio::test]
    async fn consensus_fallback_applies_immediately_with_no_peers() {
        let mgr = manager(SyncMode::Consensus);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;

        mgr.queue_update("a.txt", [1u8; 32], None, 0, None).await;
        let applied = mgr.process_updates().await.unwrap();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn consensus_fallback_requires_threshold_with_peers() {
        let mgr = manager(SyncMode::Consensus);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;
        mgr.update_peer_state(PeerSyncState::new("peer-a", 0)).await;

        let chunk = [9u8; 32];
        mgr.queue_update("a.txt", chunk, None, 0, None).await;
        let applied = mgr.process_updates().await.unwrap();
        assert_eq!(applied, 0, "no votes cast yet, ratio is 0");

        assert!(mgr.vote_on_update(chunk, "peer-a", true).await);
        let applied = mgr.process_updates().await.unwrap();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn consensus_byzantine_self_yes_can_reach_threshold_alone() {
        let mgr = manager(SyncMode::Consensus);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;
        mgr.set_byzantine(Arc::new(ByzantineAggregator::with_default_threshold(false).unwrap())).await;

        mgr.queue_update("a.txt", [1u8; 32], None, 0, None).await;
        let applied = mgr.process_updates().await.unwrap();
        assert_eq!(applied, 1, "implicit self-yes alone exceeds the 0.66 threshold with one voter");
    }

    #[tokio::test]
    async fn consensus_raft_applies_via_commit_callback() {
        let mgr = manager(SyncMode::Consensus);
        let handler = Arc::new(RecordingHandler::new());
        mgr.set_handler(handler.clone(), Arc::new(LatestWinsResolver)).await;

        // Mirrors the real wiring: the folder manager passes the sync
        // manager itself as the Raft apply callback, so committed entries
        // flow back through `ApplyCommand::apply` automatically.
        let raft = Arc::new(RaftNode::new("solo", None, StdDuration::from_millis(30), StdDuration::from_millis(10), None, Some(Arc::clone(&mgr) as Arc<dyn ApplyCommand>)).await);
        mgr.set_raft(Arc::clone(&raft)).await;
        raft.start().await;
        tokio::time::sleep(StdDuration::from_millis(150)).await;
        assert_eq!(raft.role().await, ccbt_raft::RaftRole::Leader);

        mgr.queue_update("a.txt", [1u8; 32], None, 0, None).await;
        mgr.process_updates().await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(150)).await;
        assert_eq!(*handler.applied.lock().await, vec!["a.txt".to_string()]);
        assert_eq!(mgr.queue_depth().await, 0);
        raft.stop().await;
    }
}
