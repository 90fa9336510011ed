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
#![allow(clippy::module_name_repetitions)]

//! Bencode codec, `.tonic` metadata container, and `tonic?:` URI codec.
//!
//! A `.tonic` file is the folder-sync analogue of a `.torrent`: a bencoded
//! dictionary whose `info` sub-dictionary's SHA-256 digest is the folder's
//! stable identifier (the info-hash). See [`tonic`] for the container and
//! [`link`] for the magnet-style URI that carries an info-hash plus sync
//! policy hints.

pub mod bencode;
pub mod error;
pub mod link;
pub mod model;
pub mod tonic;

pub use error::{TonicError, TonicResult};
pub use link::TonicLink;
pub use model::{
    ChunkHash, FileMetadata, FileTreeEntry, InfoHash, SyncMode, TonicInfo, TonicMetadata,
    XetMetadata,
};
