//! An in-process [`RaftTransport`] that wires multiple [`RaftNode`]s
//! together by name, so Raft safety properties (at most one leader per
//! term, log matching) can be exercised by a simulated multi-node cluster
//! without any real networking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ccbt_raft::{AppendEntriesRequest, AppendEntriesResponse, RaftTransport, RequestVoteRequest, RequestVoteResponse};
use tokio::sync::Mutex;

/// Shared peer registry handed out to every node in a simulated cluster.
/// Cheap to clone; clones all refer to the same underlying registry.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    nodes: Arc<Mutex<HashMap<String, Arc<ccbt_raft::RaftNode>>>>,
}

impl InMemoryTransport {
    /// A transport with no registered peers yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node so other nodes sharing this transport can reach it
    /// by `node_id`.
    pub async fn register(&self, node: Arc<ccbt_raft::RaftNode>) {
        self.nodes.lock().await.insert(node.node_id().to_string(), node);
    }
}

#[async_trait]
impl RaftTransport for InMemoryTransport {
    async fn send_vote_request(&self, peer: &str, request: RequestVoteRequest) -> Option<RequestVoteResponse> {
        let node = self.nodes.lock().await.get(peer).cloned()?;
        node.vote_request(request).await.ok()
    }

    async fn send_append_entries(&self, peer: &str, request: AppendEntriesRequest) -> Option<AppendEntriesResponse> {
        let node = self.nodes.lock().await.get(peer).cloned()?;
        node.append_entries_rpc(request).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn three_node_cluster_elects_exactly_one_leader() {
        let transport = Arc::new(InMemoryTransport::new());
        let mut nodes = Vec::new();
        for id in ["n1", "n2", "n3"] {
            let node = Arc::new(
                ccbt_raft::RaftNode::new(id, None, Duration::from_millis(60), Duration::from_millis(15), Some(transport.clone() as Arc<dyn RaftTransport>), None)
                    .await,
            );
            transport.register(node.clone()).await;
            nodes.push(node);
        }
        for node in &nodes {
            for other in &nodes {
                if !Arc::ptr_eq(node, other) {
                    node.add_peer(other.node_id()).await;
                }
            }
        }
        for node in &nodes {
            node.start().await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;

        let mut leader_terms = Vec::new();
        for node in &nodes {
            if node.role().await == ccbt_raft::RaftRole::Leader {
                leader_terms.push(node.current_term().await);
            }
        }
        assert_eq!(leader_terms.len(), 1, "exactly one node should be leader, got {leader_terms:?}");

        for node in &nodes {
            node.stop().await;
        }
    }
}
