//! Daemon address discovery (spec.md §4.13).
//!
//! Preference order: the port in the unified config; the legacy
//! discovery file under the daemon home directory; the hardcoded
//! default. The client always dials `127.0.0.1`, even if the daemon
//! bound `0.0.0.0`, since only local clients are supported.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::ClientResult;

const DEFAULT_PORT: u16 = 8080;

/// Resolve the port a locally running daemon is expected to be
/// listening on.
///
/// # Errors
///
/// Returns [`ClientError::Config`](crate::ClientError::Config) only if
/// the unified config file exists but cannot be parsed; a missing file
/// or a missing home directory both fall through to the next source.
pub fn discover_port() -> ClientResult<u16> {
    if let Ok(path) = ccbt_config::default_config_path() {
        if path.exists() {
            return Ok(ccbt_config::load(&path)?.ipc_port);
        }
    }

    if let Ok(home) = ccbt_config::daemon_home_dir() {
        if let Some(legacy) = ccbt_config::load_legacy(&home) {
            return Ok(legacy.port);
        }
    }

    Ok(DEFAULT_PORT)
}

/// The socket address a local client should connect to.
///
/// # Errors
///
/// See [`discover_port`].
pub fn discover_addr() -> ClientResult<SocketAddr> {
    Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), discover_port()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_port_without_a_home_directory() {
        let port = discover_port().unwrap();
        assert!(port > 0);
    }
}
