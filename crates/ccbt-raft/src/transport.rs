//! Pluggable RPC transport for Raft peer communication.
//!
//! A [`RaftNode`](crate::RaftNode) does not own a network; it is handed a
//! transport implementing [`RaftTransport`] and calls it for both RPC kinds.
//! Without peers configured, elections and replication simply have no one
//! to contact, which degenerates into a single-node cluster that wins
//! elections unopposed — the common case in tests.

use async_trait::async_trait;

use crate::state::LogEntry;

/// `RequestVote` RPC arguments (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestVoteRequest {
    /// Candidate's term.
    pub term: u64,
    /// Candidate requesting the vote.
    pub candidate_id: String,
    /// Index of the candidate's last log entry.
    pub last_log_index: i64,
    /// Term of the candidate's last log entry.
    pub last_log_term: u64,
}

/// `RequestVote` RPC response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestVoteResponse {
    /// Responder's current term, for the candidate to update itself with.
    pub term: u64,
    /// Whether the vote was granted.
    pub vote_granted: bool,
}

/// `AppendEntries` RPC arguments (§4.6), doubling as the heartbeat when
/// `entries` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendEntriesRequest {
    /// Leader's term.
    pub term: u64,
    /// Leader identifier, so followers know who to redirect clients to.
    pub leader_id: String,
    /// Index of the log entry immediately preceding `entries`.
    pub prev_log_index: i64,
    /// Term of the entry at `prev_log_index`.
    pub prev_log_term: u64,
    /// New entries to append (empty for a heartbeat).
    pub entries: Vec<LogEntry>,
    /// Leader's `commit_index`.
    pub leader_commit: i64,
}

/// `AppendEntries` RPC response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppendEntriesResponse {
    /// Responder's current term.
    pub term: u64,
    /// Whether the entries were accepted.
    pub success: bool,
}

/// Async peer transport for Raft RPCs. Implementations carry whatever
/// networking is appropriate (HTTP, an in-process channel for tests, …).
#[async_trait]
pub trait RaftTransport: Send + Sync {
    /// Send a `RequestVote` RPC to `peer`. `None` signals the request
    /// could not be delivered (peer unreachable, timed out); this is
    /// treated the same as a withheld vote.
    async fn send_vote_request(&self, peer: &str, request: RequestVoteRequest) -> Option<RequestVoteResponse>;

    /// Send an `AppendEntries` RPC to `peer`. `None` signals the request
    /// could not be delivered; recovery relies on the next heartbeat
    /// rather than an explicit retry.
    async fn send_append_entries(&self, peer: &str, request: AppendEntriesRequest) -> Option<AppendEntriesResponse>;
}
