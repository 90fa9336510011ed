#![forbid(unsafe_code)]
#![deny(warnings, dead_code, unused, unused_imports, unreachable_pub, clippy::all, rustdoc::broken_intra_doc_links)]

//! Entry point. Parses arguments, probes the daemon, and dispatches
//! exactly one command through [`ccbt_executor::Executor`] before
//! printing its JSON result and exiting with the code spec.md §6 fixes.

mod cli;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Value};

use ccbt_client::{DaemonAdapter, IpcClient};
use ccbt_executor::Executor;

use cli::{Cli, Command, ConfigCommand, FolderCommand, TorrentCommand};
use error::{CliError, CliResult};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> CliResult<Value> {
    let addr = match cli.port {
        Some(port) => std::net::SocketAddr::from(([127, 0, 0, 1], port)),
        None => ccbt_client::discover_addr().map_err(|err| anyhow::anyhow!(err))?,
    };
    let api_key = cli.api_key.or_else(|| ccbt_config::default_config_path().ok().and_then(|path| ccbt_config::load(&path).ok()).and_then(|config| config.api_key));

    let client = IpcClient::new(addr, api_key);
    if !client.is_daemon_running().await {
        return Err(CliError::DaemonUnreachable { addr: addr.to_string() });
    }

    let executor = Executor::new(Arc::new(DaemonAdapter::new(client)));
    let (command, params) = command_envelope(cli.command);
    let result = executor.execute(command, params).await;

    if result.success {
        Ok(result.data.unwrap_or(Value::Null))
    } else {
        Err(CliError::from_command_failure(result.code, result.error))
    }
}

/// Translate a parsed subcommand into `(dotted command name, JSON params)`.
fn command_envelope(command: Command) -> (&'static str, Value) {
    match command {
        Command::CreateTonic(args) => (
            "xet.create_tonic",
            json!({
                "folder_path": args.folder_path.to_string_lossy(),
                "folder_name": args.name,
                "sync_mode": args.sync_mode.wire_name(),
                "announce": args.announce,
                "output_path": args.output.map(|p| p.to_string_lossy().into_owned()),
                "generate_link": args.generate_link,
            }),
        ),
        Command::Folder(FolderCommand::Add { path, sync_mode, allowlist, auto_commit, self_peer_id, info_hash }) => (
            "xet.add_folder",
            json!({
                "path": path.to_string_lossy(),
                "sync_mode": sync_mode.wire_name(),
                "allowlist_path": allowlist.map(|p| p.to_string_lossy().into_owned()),
                "auto_commit": auto_commit,
                "self_peer_id": self_peer_id,
                "info_hash_hex": info_hash,
            }),
        ),
        Command::Folder(FolderCommand::List) => ("xet.list_folders", json!({})),
        Command::Folder(FolderCommand::Status { folder_key }) => ("xet.folder_status", json!({ "folder_key": folder_key })),
        Command::Folder(FolderCommand::Remove { folder_key }) => ("xet.remove_folder", json!({ "folder_key": folder_key })),
        Command::Folder(FolderCommand::Sync { folder_key }) => ("xet.sync", json!({ "folder_key": folder_key })),
        Command::Torrent(TorrentCommand::Add { magnet_or_path, resume }) => ("torrent.add", json!({ "source": magnet_or_path, "resume": resume })),
        Command::Torrent(TorrentCommand::List) => ("torrent.list", json!({})),
        Command::Torrent(TorrentCommand::Get { info_hash }) => ("torrent.get", json!({ "info_hash": info_hash })),
        Command::Torrent(TorrentCommand::Remove { info_hash }) => ("torrent.remove", json!({ "info_hash": info_hash })),
        Command::Torrent(TorrentCommand::Pause { info_hash }) => ("torrent.pause", json!({ "info_hash": info_hash })),
        Command::Torrent(TorrentCommand::Resume { info_hash }) => ("torrent.resume", json!({ "info_hash": info_hash })),
        Command::Torrent(TorrentCommand::Cancel { info_hash }) => ("torrent.cancel", json!({ "info_hash": info_hash })),
        Command::Config(ConfigCommand::Get) => ("config.get", json!({})),
        Command::Config(ConfigCommand::Set { ipc_port, tls_enabled }) => ("config.update", json!({ "ipc_port": ipc_port, "tls_enabled": tls_enabled })),
        Command::SessionStats => ("session.stats", json!({})),
    }
}
