//! Typed data model for `.tonic` metadata.

use crate::error::TonicError;

/// 32-byte SHA-256 digest of a `.tonic`'s bencoded `info` dictionary.
///
/// This is the folder's stable external identifier. Equality and ordering
/// are bytewise; the hex form is the canonical external representation.
pub type InfoHash = [u8; 32];

/// Opaque 32-byte content hash produced by the external chunker.
pub type ChunkHash = [u8; 32];

/// Per-file metadata carried in `xet metadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Folder-relative UTF-8 path; never escapes the folder root.
    pub path: String,
    /// Digest identifying this file's content as a whole.
    pub file_hash: [u8; 32],
    /// Ordered list of chunk hashes covering this file (piece order).
    pub chunk_hashes: Vec<ChunkHash>,
    /// File size in bytes.
    pub size: u64,
}

/// One of the four sync policies a `.tonic` can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Updates from a privileged designated peer are accepted without vote.
    Designated,
    /// Updates are applied in priority order with conflict resolution.
    BestEffort,
    /// Like best-effort, plus the handler fans out to all peers.
    Broadcast,
    /// Updates require Raft or Byzantine-threshold agreement.
    Consensus,
}

impl SyncMode {
    /// Render the canonical wire string for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Designated => "designated",
            Self::BestEffort => "best_effort",
            Self::Broadcast => "broadcast",
            Self::Consensus => "consensus",
        }
    }

    /// Parse a sync mode from its wire string, rejecting unknown tags.
    ///
    /// # Errors
    ///
    /// Returns [`TonicError::InvalidField`] for any value outside the
    /// closed set of four recognized tags.
    pub fn parse(value: &str) -> Result<Self, TonicError> {
        match value {
            "designated" => Ok(Self::Designated),
            "best_effort" => Ok(Self::BestEffort),
            "broadcast" => Ok(Self::Broadcast),
            "consensus" => Ok(Self::Consensus),
            _ => Err(TonicError::InvalidField {
                field: "sync mode",
            }),
        }
    }
}

/// A single entry in the flat `files` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Folder-relative path, stored as ordered path components.
    pub path: Vec<String>,
    /// File length in bytes.
    pub length: u64,
    /// Whole-file content digest.
    pub file_hash: [u8; 32],
}

/// One node of the nested `file tree` representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTreeEntry {
    /// A leaf describing a single file's length and content hash.
    File {
        /// File length in bytes.
        length: u64,
        /// Whole-file content digest.
        file_hash: [u8; 32],
    },
    /// A directory mapping child names to further tree nodes.
    Dir(std::collections::BTreeMap<String, FileTreeEntry>),
}

/// The `info` sub-dictionary: the part whose hash is the info-hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonicInfo {
    /// Display name for the synchronized folder.
    pub name: String,
    /// Tonic format version; currently always 1.
    pub tonic_version: u32,
    /// Sum of all file sizes.
    pub total_length: u64,
    /// Flat file list (kept alongside `file_tree` for the duality contract).
    pub files: Vec<FileEntry>,
    /// Nested directory view of the same files.
    pub file_tree: std::collections::BTreeMap<String, FileTreeEntry>,
}

/// The XET-specific chunk metadata carried alongside `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XetMetadata {
    /// Flat, unordered set of every chunk hash referenced by the folder.
    pub chunk_hashes: Vec<ChunkHash>,
    /// Per-file chunk metadata (ordered chunk lists, one entry per file).
    pub files: Vec<FileMetadata>,
    /// Opaque piece metadata passed through without interpretation.
    pub piece_metadata: Option<Vec<u8>>,
    /// Optional xorb (chunk-group) hashes.
    pub xorb_hashes: Option<Vec<[u8; 32]>>,
}

/// The full on-wire `.tonic` metadata container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonicMetadata {
    /// Folder identity and layout.
    pub info: TonicInfo,
    /// XET chunk metadata.
    pub xet_metadata: XetMetadata,
    /// Sync policy this folder was created under.
    pub sync_mode: SyncMode,
    /// Optional primary tracker announce URL.
    pub announce: Option<String>,
    /// Optional tiered tracker announce list.
    pub announce_list: Option<Vec<Vec<String>>>,
    /// Optional Git commit refs anchoring this snapshot.
    pub git_refs: Option<Vec<String>>,
    /// Optional designated source peer ids.
    pub source_peers: Option<Vec<String>>,
    /// Optional 32-byte commitment hash of the peer allowlist.
    pub allowlist_hash: Option<[u8; 32]>,
    /// Optional creation timestamp (seconds since epoch).
    pub created_at: Option<i64>,
    /// Optional free-form comment.
    pub comment: Option<String>,
}
