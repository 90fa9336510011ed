//! The closed event-type enum and the envelope wrapping every emitted event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed, append-only set of event kinds the engine emits.
///
/// Every variant has a stable wire string (see [`EventType::as_str`] /
/// [`EventType::parse`]); new kinds are added, never renamed or removed, to
/// keep old subscriber filters valid across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Torrent lifecycle
    /// A torrent was added to the session.
    TorrentAdded,
    /// A torrent was removed from the session.
    TorrentRemoved,
    /// A torrent completed downloading.
    TorrentCompleted,
    /// A torrent's lifecycle state changed.
    TorrentStateChanged,
    /// A torrent encountered an error.
    TorrentError,

    // Metadata-fetch phases
    /// Metadata fetch for a torrent started.
    MetadataFetchStarted,
    /// Metadata fetch made incremental progress.
    MetadataFetchProgress,
    /// Metadata fetch completed.
    MetadataFetchCompleted,
    /// Metadata fetch failed.
    MetadataFetchFailed,

    // File selection
    /// Per-file download selection changed.
    FileSelectionChanged,
    /// A file finished downloading.
    FileCompleted,
    /// File integrity verification finished.
    FileVerified,

    // Peer lifecycle
    /// A peer connection was established.
    PeerConnected,
    /// A peer connection was closed.
    PeerDisconnected,
    /// A peer was banned.
    PeerBanned,

    // Seeding
    /// Seeding started for a torrent.
    SeedingStarted,
    /// Seeding stopped for a torrent.
    SeedingStopped,

    // Service lifecycle
    /// The daemon service started.
    ServiceStarted,
    /// The daemon service is stopping.
    ServiceStopping,
    /// The daemon service stopped.
    ServiceStopped,

    // Tracker phases
    /// A tracker announce was sent.
    TrackerAnnounceSent,
    /// A tracker announce succeeded.
    TrackerAnnounceSucceeded,
    /// A tracker announce failed.
    TrackerAnnounceFailed,
    /// A tracker scrape completed.
    TrackerScraped,

    // Piece lifecycle
    /// A piece download started.
    PieceStarted,
    /// A piece finished downloading and passed its hash check.
    PieceCompleted,
    /// A piece failed its hash check.
    PieceFailed,

    // Progress
    /// Periodic aggregate progress update.
    Progress,

    // XET folder-sync (ccbt-specific additions)
    /// A folder-sync update was applied.
    FolderUpdateApplied,
    /// A folder-sync update failed after exhausting retries.
    FolderUpdateFailed,
    /// A folder's sync mode changed.
    FolderSyncModeChanged,
    /// Raft elected a new leader for a folder.
    FolderLeaderElected,
    /// Consensus was reached (or failed) for a chunk.
    FolderConsensusResult,
}

impl EventType {
    /// All variants, in declaration order — used to build "all types"
    /// subscriptions and for exhaustiveness tests.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TorrentAdded,
            Self::TorrentRemoved,
            Self::TorrentCompleted,
            Self::TorrentStateChanged,
            Self::TorrentError,
            Self::MetadataFetchStarted,
            Self::MetadataFetchProgress,
            Self::MetadataFetchCompleted,
            Self::MetadataFetchFailed,
            Self::FileSelectionChanged,
            Self::FileCompleted,
            Self::FileVerified,
            Self::PeerConnected,
            Self::PeerDisconnected,
            Self::PeerBanned,
            Self::SeedingStarted,
            Self::SeedingStopped,
            Self::ServiceStarted,
            Self::ServiceStopping,
            Self::ServiceStopped,
            Self::TrackerAnnounceSent,
            Self::TrackerAnnounceSucceeded,
            Self::TrackerAnnounceFailed,
            Self::TrackerScraped,
            Self::PieceStarted,
            Self::PieceCompleted,
            Self::PieceFailed,
            Self::Progress,
            Self::FolderUpdateApplied,
            Self::FolderUpdateFailed,
            Self::FolderSyncModeChanged,
            Self::FolderLeaderElected,
            Self::FolderConsensusResult,
        ]
    }

    /// Stable wire string for this event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        serde_variant_name(self)
    }
}

fn serde_variant_name(value: EventType) -> &'static str {
    match value {
        EventType::TorrentAdded => "torrent_added",
        EventType::TorrentRemoved => "torrent_removed",
        EventType::TorrentCompleted => "torrent_completed",
        EventType::TorrentStateChanged => "torrent_state_changed",
        EventType::TorrentError => "torrent_error",
        EventType::MetadataFetchStarted => "metadata_fetch_started",
        EventType::MetadataFetchProgress => "metadata_fetch_progress",
        EventType::MetadataFetchCompleted => "metadata_fetch_completed",
        EventType::MetadataFetchFailed => "metadata_fetch_failed",
        EventType::FileSelectionChanged => "file_selection_changed",
        EventType::FileCompleted => "file_completed",
        EventType::FileVerified => "file_verified",
        EventType::PeerConnected => "peer_connected",
        EventType::PeerDisconnected => "peer_disconnected",
        EventType::PeerBanned => "peer_banned",
        EventType::SeedingStarted => "seeding_started",
        EventType::SeedingStopped => "seeding_stopped",
        EventType::ServiceStarted => "service_started",
        EventType::ServiceStopping => "service_stopping",
        EventType::ServiceStopped => "service_stopped",
        EventType::TrackerAnnounceSent => "tracker_announce_sent",
        EventType::TrackerAnnounceSucceeded => "tracker_announce_succeeded",
        EventType::TrackerAnnounceFailed => "tracker_announce_failed",
        EventType::TrackerScraped => "tracker_scraped",
        EventType::PieceStarted => "piece_started",
        EventType::PieceCompleted => "piece_completed",
        EventType::PieceFailed => "piece_failed",
        EventType::Progress => "progress",
        EventType::FolderUpdateApplied => "folder_update_applied",
        EventType::FolderUpdateFailed => "folder_update_failed",
        EventType::FolderSyncModeChanged => "folder_sync_mode_changed",
        EventType::FolderLeaderElected => "folder_leader_elected",
        EventType::FolderConsensusResult => "folder_consensus_result",
    }
}

/// Priority class used for subscription filtering, independent of queue
/// priority (`UpdateEntry::priority`, which is a signed integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    /// Service lifecycle and unrecoverable failures.
    Critical,
    /// Consensus results, peer bans, tracker failures.
    High,
    /// Ordinary lifecycle transitions.
    Normal,
    /// High-frequency, low-value updates (piece/progress).
    Low,
}

impl EventType {
    /// The priority class this event type is classified under.
    #[must_use]
    pub const fn priority(self) -> EventPriority {
        match self {
            Self::ServiceStarted | Self::ServiceStopping | Self::ServiceStopped | Self::TorrentError | Self::MetadataFetchFailed | Self::FolderUpdateFailed => {
                EventPriority::Critical
            }
            Self::PeerBanned | Self::TrackerAnnounceFailed | Self::FolderConsensusResult | Self::FolderLeaderElected | Self::TorrentCompleted => EventPriority::High,
            Self::PieceStarted | Self::PieceCompleted | Self::PieceFailed | Self::Progress => EventPriority::Low,
            _ => EventPriority::Normal,
        }
    }
}

/// A single emitted event: its type, a monotonic timestamp, and an opaque
/// JSON payload whose shape depends on `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The kind of event.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Optional info-hash this event pertains to, used for filtering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// Event-specific payload.
    pub data: serde_json::Value,
}

impl Event {
    /// Construct an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, info_hash: Option<String>, data: serde_json::Value) -> Self {
        Self { event_type, timestamp: Utc::now(), info_hash, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_wire_string() {
        let mut seen = std::collections::HashSet::new();
        for &variant in EventType::all() {
            assert!(seen.insert(variant.as_str()), "duplicate wire string for {variant:?}");
        }
        assert_eq!(seen.len(), EventType::all().len());
    }
}
