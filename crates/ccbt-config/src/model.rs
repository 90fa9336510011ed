//! The unified daemon configuration and its legacy-format fallback.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

const DEFAULT_IPC_PORT: u16 = 8080;
const DEFAULT_WEBSOCKET_HEARTBEAT_SECS: u64 = 30;
const DEFAULT_AUTH_TIMESTAMP_SKEW_SECS: u64 = 300;

/// The daemon's unified, on-disk configuration. Compatible in spirit with
/// the legacy JSON file `ccbt-client` falls back to when this file is
/// absent (see [`LegacyDaemonConfig`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedConfig {
    /// Address the IPC server binds to. `0.0.0.0` is permitted, but
    /// startup self-verification and local clients always dial
    /// `127.0.0.1`.
    pub ipc_bind: IpAddr,
    /// Port the IPC server binds to.
    pub ipc_port: u16,
    /// Shared-secret API key clients present via `X-CCBT-API-Key`.
    /// `None` disables the API-key authentication path (Ed25519 signature
    /// headers remain available).
    pub api_key: Option<String>,
    /// Whether the IPC server terminates TLS.
    pub tls_enabled: bool,
    /// Interval between WebSocket heartbeat pings.
    pub websocket_heartbeat_interval: Duration,
    /// Maximum allowed clock skew for Ed25519 signature timestamps.
    pub auth_timestamp_skew: Duration,
}

impl Default for UnifiedConfig {
    fn default() -> Self {
        Self {
            ipc_bind: IpAddr::from([127, 0, 0, 1]),
            ipc_port: DEFAULT_IPC_PORT,
            api_key: None,
            tls_enabled: false,
            websocket_heartbeat_interval: Duration::from_secs(DEFAULT_WEBSOCKET_HEARTBEAT_SECS),
            auth_timestamp_skew: Duration::from_secs(DEFAULT_AUTH_TIMESTAMP_SKEW_SECS),
        }
    }
}

impl UnifiedConfig {
    /// Validate field invariants not already enforced by the type system.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] if `ipc_port` is `0`, or
    /// `api_key` is set but empty.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ipc_port == 0 {
            return Err(ConfigError::InvalidField { field: "ipc_port", reason: "must be nonzero".to_string() });
        }
        if self.api_key.as_ref().is_some_and(String::is_empty) {
            return Err(ConfigError::InvalidField { field: "api_key", reason: "must not be empty when set".to_string() });
        }
        Ok(())
    }

    /// The address local clients and the startup self-verification probe
    /// should always connect to, regardless of `ipc_bind`.
    #[must_use]
    pub fn local_socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([127, 0, 0, 1], self.ipc_port))
    }
}

/// Minimal legacy daemon-discovery file, read by `ccbt-client` when no
/// unified config is present. Distinct (smaller) shape on purpose: older
/// daemon builds wrote only this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyDaemonConfig {
    /// The daemon's IPC port.
    pub port: u16,
}
