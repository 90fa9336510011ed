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

//! Unified on-disk daemon configuration: bind address, API key, TLS
//! toggle, home-directory resolution, and the legacy discovery-file
//! fallback `ccbt-client` needs when no unified config is present.

mod error;
mod loader;
mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::{daemon_home_dir, default_config_path, generate_api_key, load, load_legacy, save};
pub use model::{LegacyDaemonConfig, UnifiedConfig};
