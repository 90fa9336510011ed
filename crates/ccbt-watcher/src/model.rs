//! Change events emitted by [`crate::FolderWatcher`].

use std::path::PathBuf;
use std::time::SystemTime;

/// A single filesystem change detected between two snapshots.
///
/// Paths are relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A new file appeared.
    Created(PathBuf),
    /// An existing file's size or modification time changed.
    Modified(PathBuf),
    /// A previously-seen file is gone.
    Deleted(PathBuf),
}

impl WatchEvent {
    /// The path this event concerns, regardless of variant.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
        }
    }
}

/// Snapshot of a single file's identity at a point in time, used to detect
/// changes between polls without hashing file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileStamp {
    pub(crate) modified: Option<SystemTime>,
    pub(crate) len: u64,
}
