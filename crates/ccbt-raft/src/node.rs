//! Raft node: leader election, log replication, and the apply loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::RaftResult;
use crate::state::{default_state_path, LogEntry, RaftState};
use crate::transport::{AppendEntriesRequest, AppendEntriesResponse, RaftTransport, RequestVoteRequest, RequestVoteResponse};

const APPLY_POLL_INTERVAL: Duration = Duration::from_millis(20);
const ELECTION_POLL_INTERVAL: Duration = Duration::from_millis(5);
const FOLLOWER_IDLE_INTERVAL: Duration = Duration::from_millis(20);

/// Role a [`RaftNode`] occupies at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaftRole {
    /// Default role; responds to RPCs, does not initiate work.
    Follower,
    /// Running an election.
    Candidate,
    /// Current cluster leader; sends heartbeats and replicates entries.
    Leader,
}

/// Callback invoked once a log entry is committed and ready to be applied
/// to the owning component's state machine. This is the sole path by
/// which committed commands reach the caller.
#[async_trait]
pub trait ApplyCommand: Send + Sync {
    /// Apply a committed command.
    async fn apply(&self, command: serde_json::Value);
}

struct Inner {
    state: RaftState,
    role: RaftRole,
    leader_id: Option<String>,
    election_deadline: Instant,
    next_index: HashMap<String, u64>,
    match_index: HashMap<String, i64>,
}

/// A single-process Raft consensus node.
///
/// Transport and the apply callback are both pluggable; with neither
/// configured, and no peers, the node forms a degenerate single-node
/// cluster that wins elections unopposed.
pub struct RaftNode {
    node_id: String,
    inner: Mutex<Inner>,
    peers: RwLock<std::collections::HashSet<String>>,
    election_timeout: Duration,
    heartbeat_interval: Duration,
    state_path: Option<std::path::PathBuf>,
    transport: Option<Arc<dyn RaftTransport>>,
    apply_callback: Option<Arc<dyn ApplyCommand>>,
    running: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RaftNode {
    /// Construct a node for `folder`, loading any persisted state from
    /// `<folder>/.xet/raft/raft_state.json`. Pass `None` for an in-memory
    /// node (used in tests).
    pub async fn new(
        node_id: impl Into<String>,
        state_path: Option<std::path::PathBuf>,
        election_timeout: Duration,
        heartbeat_interval: Duration,
        transport: Option<Arc<dyn RaftTransport>>,
        apply_callback: Option<Arc<dyn ApplyCommand>>,
    ) -> Self {
        let state = match &state_path {
            Some(path) => RaftState::load(path).await,
            None => RaftState::default(),
        };

        let node_id = node_id.into();
        let mut inner = Inner {
            state,
            role: RaftRole::Follower,
            leader_id: None,
            election_deadline: Instant::now(),
            next_index: HashMap::new(),
            match_index: HashMap::new(),
        };
        Self::arm_timer(&mut inner, election_timeout);

        Self {
            node_id,
            inner: Mutex::new(inner),
            peers: RwLock::new(std::collections::HashSet::new()),
            election_timeout,
            heartbeat_interval,
            state_path,
            transport,
            apply_callback,
            running: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Construct a node rooted at `folder`, using the conventional state
    /// path under `.xet/raft/`.
    pub async fn for_folder(
        node_id: impl Into<String>,
        folder: &std::path::Path,
        election_timeout: Duration,
        heartbeat_interval: Duration,
        transport: Option<Arc<dyn RaftTransport>>,
        apply_callback: Option<Arc<dyn ApplyCommand>>,
    ) -> Self {
        Self::new(node_id, Some(default_state_path(folder)), election_timeout, heartbeat_interval, transport, apply_callback).await
    }

    /// Add a peer to the cluster (no-op for self).
    pub async fn add_peer(&self, peer_id: impl Into<String>) {
        let peer_id = peer_id.into();
        if peer_id != self.node_id {
            self.peers.write().await.insert(peer_id);
        }
    }

    /// Remove a peer from the cluster.
    pub async fn remove_peer(&self, peer_id: &str) {
        self.peers.write().await.remove(peer_id);
    }

    /// This node's identifier.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Current role.
    pub async fn role(&self) -> RaftRole {
        self.inner.lock().await.role
    }

    /// Current term.
    pub async fn current_term(&self) -> u64 {
        self.inner.lock().await.state.current_term
    }

    /// Currently known leader, if any.
    pub async fn leader_id(&self) -> Option<String> {
        self.inner.lock().await.leader_id.clone()
    }

    /// Start the election, heartbeat, and apply background loops.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(node_id = %self.node_id, "starting raft node");

        let mut tasks = self.tasks.lock().await;
        let election = Arc::clone(self);
        let heartbeat = Arc::clone(self);
        let apply = Arc::clone(self);
        tasks.push(tokio::spawn(async move { election.election_loop().await }));
        tasks.push(tokio::spawn(async move { heartbeat.leader_loop().await }));
        tasks.push(tokio::spawn(async move { apply.apply_loop().await }));
    }

    /// Stop all background loops and persist state.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        let inner = self.inner.lock().await;
        if let Some(path) = &self.state_path {
            if let Err(err) = inner.state.save(path).await {
                warn!(error = %err, "failed to persist raft state on stop");
            }
        }
        info!(node_id = %self.node_id, "stopped raft node");
    }

    /// Append `command` to the log (leader only). Returns `false` if this
    /// node is not currently the leader or persistence failed.
    #[instrument(name = "raft.append_entry", skip(self, command))]
    pub async fn append_entry(&self, command: serde_json::Value) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.role != RaftRole::Leader {
            return false;
        }

        let term = inner.state.current_term;
        let mut new_state = inner.state.clone();
        new_state.append_entry(term, command);

        // Degenerate single-node cluster: nothing to replicate to, commit now.
        if self.peers.read().await.is_empty() {
            new_state.commit_index = new_state.last_log_index();
        }

        match self.persist_and_commit(&mut inner, new_state).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to persist appended entry");
                false
            }
        }
    }

    /// Handle an incoming `RequestVote` RPC.
    pub async fn vote_request(&self, request: RequestVoteRequest) -> RaftResult<RequestVoteResponse> {
        let mut inner = self.inner.lock().await;

        if request.term < inner.state.current_term {
            return Ok(RequestVoteResponse { term: inner.state.current_term, vote_granted: false });
        }

        let became_follower = request.term > inner.state.current_term;
        let mut new_state = inner.state.clone();
        if became_follower {
            new_state.current_term = request.term;
            new_state.voted_for = None;
        }

        let can_vote = new_state.voted_for.is_none() || new_state.voted_for.as_deref() == Some(request.candidate_id.as_str());
        let log_ok = request.last_log_term > new_state.last_log_term()
            || (request.last_log_term == new_state.last_log_term() && request.last_log_index >= new_state.last_log_index());
        let grant = can_vote && log_ok;
        if grant {
            new_state.voted_for = Some(request.candidate_id.clone());
        }

        if became_follower || new_state.voted_for != inner.state.voted_for {
            self.persist_and_commit(&mut inner, new_state).await?;
        }
        if became_follower {
            inner.role = RaftRole::Follower;
        }
        if grant {
            self.reset_election_timer(&mut inner);
            info!(candidate = %request.candidate_id, term = request.term, "granted vote");
        }

        Ok(RequestVoteResponse { term: inner.state.current_term, vote_granted: grant })
    }

    /// Handle an incoming `AppendEntries` RPC (including heartbeats with
    /// empty `entries`).
    pub async fn append_entries_rpc(&self, request: AppendEntriesRequest) -> RaftResult<AppendEntriesResponse> {
        let mut inner = self.inner.lock().await;

        if request.term < inner.state.current_term {
            return Ok(AppendEntriesResponse { term: inner.state.current_term, success: false });
        }

        let became_follower = request.term > inner.state.current_term;
        let mut new_state = inner.state.clone();
        if became_follower {
            new_state.current_term = request.term;
            new_state.voted_for = None;
        }

        if request.prev_log_index >= 0 {
            let prev_ok = new_state.get_entry(request.prev_log_index as u64).is_some_and(|entry| entry.term == request.prev_log_term);
            if !prev_ok {
                if became_follower {
                    self.persist_and_commit(&mut inner, new_state).await?;
                }
                inner.role = RaftRole::Follower;
                inner.leader_id = Some(request.leader_id);
                self.reset_election_timer(&mut inner);
                return Ok(AppendEntriesResponse { term: inner.state.current_term, success: false });
            }
        }

        let log_changed = !request.entries.is_empty();
        if log_changed {
            let from_index = (request.prev_log_index + 1).max(0) as u64;
            new_state.truncate_and_append(from_index, request.entries);
        }
        if request.leader_commit > new_state.commit_index {
            new_state.commit_index = request.leader_commit.min(new_state.last_log_index());
        }

        if log_changed || became_follower {
            self.persist_and_commit(&mut inner, new_state).await?;
        } else {
            inner.state.commit_index = new_state.commit_index;
        }
        inner.role = RaftRole::Follower;
        inner.leader_id = Some(request.leader_id);
        self.reset_election_timer(&mut inner);

        Ok(AppendEntriesResponse { term: inner.state.current_term, success: true })
    }

    async fn persist_and_commit(&self, inner: &mut Inner, new_state: RaftState) -> RaftResult<()> {
        if let Some(path) = &self.state_path {
            new_state.save(path).await?;
        }
        inner.state = new_state;
        Ok(())
    }

    fn arm_timer(inner: &mut Inner, election_timeout: Duration) {
        let jitter: f64 = rand::rng().random_range(0.0..1.0);
        let timeout = election_timeout.as_secs_f64() * (1.0 + jitter);
        inner.election_deadline = Instant::now() + Duration::from_secs_f64(timeout);
    }

    fn reset_election_timer(&self, inner: &mut Inner) {
        Self::arm_timer(inner, self.election_timeout);
    }

    async fn election_loop(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(ELECTION_POLL_INTERVAL).await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let mut inner = self.inner.lock().await;
            if inner.role == RaftRole::Leader || Instant::now() < inner.election_deadline {
                continue;
            }

            let candidate_term = inner.state.current_term + 1;
            let mut new_state = inner.state.clone();
            new_state.current_term = candidate_term;
            new_state.voted_for = Some(self.node_id.clone());
            if let Err(err) = self.persist_and_commit(&mut inner, new_state).await {
                warn!(error = %err, "failed to persist election state, skipping this round");
                continue;
            }
            inner.role = RaftRole::Candidate;
            inner.leader_id = None;
            self.reset_election_timer(&mut inner);
            let last_log_index = inner.state.last_log_index();
            let last_log_term = inner.state.last_log_term();
            drop(inner);

            info!(term = candidate_term, "starting election");
            let peers: Vec<String> = self.peers.read().await.iter().cloned().collect();
            let mut votes = 1usize; // self-vote

            if let Some(transport) = &self.transport {
                let request = RequestVoteRequest {
                    term: candidate_term,
                    candidate_id: self.node_id.clone(),
                    last_log_index,
                    last_log_term,
                };
                let responses = futures_util::future::join_all(peers.iter().map(|peer| {
                    let transport = Arc::clone(transport);
                    let request = request.clone();
                    let peer = peer.clone();
                    async move { transport.send_vote_request(&peer, request).await }
                }))
                .await;
                votes += responses.into_iter().flatten().filter(|r| r.vote_granted).count();
            }

            let won = votes > peers.len() / 2;
            let mut inner = self.inner.lock().await;
            if inner.role == RaftRole::Candidate && inner.state.current_term == candidate_term {
                if won {
                    inner.role = RaftRole::Leader;
                    inner.leader_id = Some(self.node_id.clone());
                    inner.next_index = peers.iter().map(|p| (p.clone(), (inner.state.last_log_index() + 1) as u64)).collect();
                    inner.match_index = peers.iter().map(|p| (p.clone(), -1i64)).collect();
                    info!(term = candidate_term, votes, "elected leader");
                } else {
                    inner.role = RaftRole::Follower;
                    self.reset_election_timer(&mut inner);
                    debug!(term = candidate_term, votes, "lost election");
                }
            }
        }
    }

    async fn leader_loop(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            let is_leader = self.inner.lock().await.role == RaftRole::Leader;
            if is_leader {
                self.replicate_to_peers().await;
                tokio::time::sleep(self.heartbeat_interval).await;
            } else {
                tokio::time::sleep(FOLLOWER_IDLE_INTERVAL).await;
            }
        }
    }

    async fn replicate_to_peers(self: &Arc<Self>) {
        let Some(transport) = self.transport.clone() else { return };

        let (term, leader_id, commit_index, log, peers, next_index) = {
            let inner = self.inner.lock().await;
            (
                inner.state.current_term,
                self.node_id.clone(),
                inner.state.commit_index,
                inner.state.log.clone(),
                self.peers.read().await.iter().cloned().collect::<Vec<_>>(),
                inner.next_index.clone(),
            )
        };

        for peer in peers {
            let next_idx = next_index.get(&peer).copied().unwrap_or(0);
            let prev_log_index = next_idx as i64 - 1;
            let prev_log_term = if prev_log_index >= 0 {
                log.get(prev_log_index as usize).map_or(0, |e: &LogEntry| e.term)
            } else {
                0
            };
            let entries: Vec<LogEntry> = log.get(next_idx as usize..).map(<[LogEntry]>::to_vec).unwrap_or_default();
            let num_entries = entries.len();
            let request = AppendEntriesRequest {
                term,
                leader_id: leader_id.clone(),
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit: commit_index,
            };

            let node = Arc::clone(self);
            let transport = Arc::clone(&transport);
            let peer_for_task = peer.clone();
            tokio::spawn(async move {
                if let Some(response) = transport.send_append_entries(&peer_for_task, request).await {
                    node.handle_append_entries_response(&peer_for_task, term, next_idx, num_entries, response).await;
                }
            });
        }
    }

    async fn handle_append_entries_response(&self, peer: &str, sent_term: u64, sent_next_index: u64, num_entries: usize, response: AppendEntriesResponse) {
        let mut inner = self.inner.lock().await;
        if inner.role != RaftRole::Leader || inner.state.current_term != sent_term {
            return;
        }

        if response.success {
            let new_match = sent_next_index as i64 + num_entries as i64 - 1;
            inner.match_index.insert(peer.to_string(), new_match);
            inner.next_index.insert(peer.to_string(), (new_match + 1) as u64);
            self.advance_commit_index(&mut inner);
        } else if response.term > inner.state.current_term {
            let mut new_state = inner.state.clone();
            new_state.current_term = response.term;
            new_state.voted_for = None;
            if self.persist_and_commit(&mut inner, new_state).await.is_ok() {
                inner.role = RaftRole::Follower;
                self.reset_election_timer(&mut inner);
            }
        } else {
            let current = inner.next_index.get(peer).copied().unwrap_or(1);
            inner.next_index.insert(peer.to_string(), current.saturating_sub(1));
        }
    }

    fn advance_commit_index(&self, inner: &mut Inner) {
        let total_nodes = inner.match_index.len() + 1;
        let mut indices: Vec<i64> = inner.match_index.values().copied().collect();
        indices.push(inner.state.last_log_index());
        indices.sort_unstable();
        let majority_index = indices[total_nodes - (total_nodes / 2 + 1)];

        if majority_index > inner.state.commit_index {
            let term_at_index = inner.state.get_entry(majority_index.max(0) as u64).map(|e| e.term);
            if majority_index >= 0 && term_at_index == Some(inner.state.current_term) {
                inner.state.commit_index = majority_index;
            }
        }
    }

    async fn apply_loop(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            loop {
                let next_entry = {
                    let mut inner = self.inner.lock().await;
                    if inner.state.last_applied < inner.state.commit_index {
                        inner.state.last_applied += 1;
                        inner.state.get_entry(inner.state.last_applied as u64).cloned()
                    } else {
                        None
                    }
                };
                match next_entry {
                    Some(entry) => {
                        if let Some(callback) = &self.apply_callback {
                            callback.apply(entry.command).await;
                        }
                    }
                    None => break,
                }
            }
            tokio::time::sleep(APPLY_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingCallback {
        count: AtomicUsize,
    }

    #[async_trait]
    impl ApplyCommand for CountingCallback {
        async fn apply(&self, _command: serde_json::Value) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn single_node_wins_election_and_applies() {
        let callback = Arc::new(CountingCallback { count: AtomicUsize::new(0) });
        let node = Arc::new(
            RaftNode::new(
                "solo",
                None,
                Duration::from_millis(50),
                Duration::from_millis(10),
                None,
                Some(callback.clone() as Arc<dyn ApplyCommand>),
            )
            .await,
        );
        node.start().await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(node.role().await, RaftRole::Leader);

        let accepted = node.append_entry(serde_json::json!({"type": "noop"})).await;
        assert!(accepted);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(callback.count.load(Ordering::SeqCst), 1);

        node.stop().await;
    }

    #[tokio::test]
    async fn non_leader_rejects_append_entry() {
        let node = RaftNode::new("follower", None, Duration::from_secs(10), Duration::from_millis(50), None, None).await;
        assert!(!node.append_entry(serde_json::json!({"type": "noop"})).await);
    }

    #[tokio::test]
    async fn vote_request_with_stale_term_is_rejected() {
        let node = RaftNode::new("n1", None, Duration::from_secs(10), Duration::from_millis(50), None, None).await;
        {
            let mut inner = node.inner.lock().await;
            inner.state.current_term = 5;
        }
        let response = node
            .vote_request(RequestVoteRequest { term: 3, candidate_id: "n2".to_string(), last_log_index: -1, last_log_term: 0 })
            .await
            .unwrap();
        assert!(!response.vote_granted);
        assert_eq!(response.term, 5);
    }

    #[tokio::test]
    async fn vote_request_grants_once_per_term() {
        let node = RaftNode::new("n1", None, Duration::from_secs(10), Duration::from_millis(50), None, None).await;
        let request = RequestVoteRequest { term: 1, candidate_id: "n2".to_string(), last_log_index: -1, last_log_term: 0 };
        let first = node.vote_request(request.clone()).await.unwrap();
        assert!(first.vote_granted);

        let other = RequestVoteRequest { term: 1, candidate_id: "n3".to_string(), last_log_index: -1, last_log_term: 0 };
        let second = node.vote_request(other).await.unwrap();
        assert!(!second.vote_granted);
    }

    #[tokio::test]
    async fn append_entries_rejects_mismatched_prev_log() {
        let node = RaftNode::new("follower", None, Duration::from_secs(10), Duration::from_millis(50), None, None).await;
        let request = AppendEntriesRequest {
            term: 1,
            leader_id: "leader".to_string(),
            prev_log_index: 0,
            prev_log_term: 5,
            entries: vec![],
            leader_commit: -1,
        };
        let response = node.append_entries_rpc(request).await.unwrap();
        assert!(!response.success);
    }

    #[tokio::test]
    async fn append_entries_accepts_and_advances_commit() {
        let node = RaftNode::new("follower", None, Duration::from_secs(10), Duration::from_millis(50), None, None).await;
        let entry = LogEntry { term: 1, index: 0, command: serde_json::json!({"type": "noop"}), timestamp: 0.0 };
        let request = AppendEntriesRequest {
            term: 1,
            leader_id: "leader".to_string(),
            prev_log_index: -1,
            prev_log_term: 0,
            entries: vec![entry],
            leader_commit: 0,
        };
        let response = node.append_entries_rpc(request).await.unwrap();
        assert!(response.success);
        assert_eq!(node.inner.lock().await.state.commit_index, 0);
        assert_eq!(node.leader_id().await.as_deref(), Some("leader"));
    }
}
