#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions, clippy::too_many_arguments)]

//! Single-process Raft consensus node: leader election, log replication,
//! and a committed-command apply loop, for strongly-ordered folder update
//! replication under the `consensus` sync policy.

mod error;
mod node;
mod state;
mod transport;

pub use error::{RaftError, RaftResult};
pub use node::{ApplyCommand, RaftNode, RaftRole};
pub use state::{default_state_path, LogEntry, RaftState};
pub use transport::{AppendEntriesRequest, AppendEntriesResponse, RaftTransport, RequestVoteRequest, RequestVoteResponse};
