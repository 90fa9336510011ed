//! Persisted allowlist data model.

use serde::{Deserialize, Serialize};

/// One peer's allowlist record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Unix timestamp (seconds) when the peer was first added.
    pub added_at: f64,
    /// Hex-encoded Ed25519 public key, if the peer registered one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Free-form metadata, including the optional `alias` key.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PeerEntry {
    pub(crate) fn new(added_at: f64) -> Self {
        Self {
            added_at,
            public_key: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub(crate) fn alias(&self) -> Option<&str> {
        self.metadata.get("alias").and_then(serde_json::Value::as_str)
    }
}

/// On-disk allowlist payload, wrapped in a version envelope to match the
/// wire format written by [`crate::AllowlistStore::save`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowlistFile {
    /// Peer id to allowlist record.
    pub peers: std::collections::BTreeMap<String, PeerEntry>,
    /// Payload schema version.
    pub version: u32,
}
