//! Argument grammar. Recognized folder-creation options mirror the subset
//! of spec.md §6 the executor's `xet.create_tonic`/`xet.add_folder`
//! commands accept (`--sync-mode`, `--allowlist`, `--announce`,
//! `--output`, `--generate-link`); everything else is a thin, direct
//! mapping onto a single executor command name.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// `ccbt`: a thin front end for a running `ccbt` daemon. Every subcommand
/// dispatches through the same command executor the IPC server and a
/// future TUI use; this binary never embeds the engine (spec.md §4.11,
/// §9 "single executor indirection").
#[derive(Debug, Parser)]
#[command(name = "ccbt", version, about)]
pub struct Cli {
    /// Override the daemon port instead of discovering it (spec.md §4.13).
    #[arg(long, global = true, env = "CCBT_PORT")]
    pub port: Option<u16>,

    /// API key to present via `X-CCBT-API-Key`; falls back to the unified
    /// config's stored key when absent.
    #[arg(long, global = true, env = "CCBT_API_KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a `.tonic` file from a folder without registering it for sync.
    CreateTonic(CreateTonicArgs),
    /// Manage synchronized folders.
    #[command(subcommand)]
    Folder(FolderCommand),
    /// Manage torrents (declared surface; this daemon build answers
    /// `UNAVAILABLE` since the BitTorrent engine is an external
    /// collaborator — spec.md §1 Non-goals).
    #[command(subcommand)]
    Torrent(TorrentCommand),
    /// Read or update the daemon's runtime configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print aggregate session statistics.
    SessionStats,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum SyncModeArg {
    Designated,
    BestEffort,
    Broadcast,
    Consensus,
}

impl SyncModeArg {
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Designated => "designated",
            Self::BestEffort => "best_effort",
            Self::Broadcast => "broadcast",
            Self::Consensus => "consensus",
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct CreateTonicArgs {
    /// Folder to snapshot.
    pub folder_path: PathBuf,
    /// Display name recorded as `info.name`.
    #[arg(long)]
    pub name: String,
    #[arg(long, value_enum)]
    pub sync_mode: SyncModeArg,
    /// Primary tracker announce URL.
    #[arg(long)]
    pub announce: Option<String>,
    /// Where to write the encoded `.tonic` bytes.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Also emit a `tonic?:` link in the response.
    #[arg(long)]
    pub generate_link: bool,
}

#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// Register a folder for synchronization.
    Add {
        /// Absolute path of the folder to synchronize.
        path: PathBuf,
        #[arg(long, value_enum)]
        sync_mode: SyncModeArg,
        /// Path to the encrypted allowlist file.
        #[arg(long)]
        allowlist: Option<PathBuf>,
        /// Auto-commit folder changes to its git repo, if any.
        #[arg(long)]
        auto_commit: bool,
        /// This node's own peer id.
        #[arg(long)]
        self_peer_id: String,
        /// Info-hash to key this folder by, if already known.
        #[arg(long)]
        info_hash: Option<String>,
    },
    /// List every registered folder.
    List,
    /// Show one folder's status snapshot.
    Status {
        /// The folder key returned by `folder add`.
        folder_key: String,
    },
    /// Deregister a folder and stop its background tasks.
    Remove {
        folder_key: String,
    },
    /// Run one `process_updates` pass immediately.
    Sync {
        folder_key: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TorrentCommand {
    Add {
        magnet_or_path: String,
        #[arg(long)]
        resume: bool,
    },
    List,
    Get { info_hash: String },
    Remove { info_hash: String },
    Pause { info_hash: String },
    Resume { info_hash: String },
    Cancel { info_hash: String },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Get,
    Set {
        #[arg(long)]
        ipc_port: Option<u16>,
        #[arg(long)]
        tls_enabled: Option<bool>,
    },
}
