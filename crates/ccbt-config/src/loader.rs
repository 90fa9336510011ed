//! Home-directory resolution and load/save helpers for the unified
//! config and its legacy fallback.

use std::path::PathBuf;

use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{instrument, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{LegacyDaemonConfig, UnifiedConfig};

const LEGACY_CONFIG_FILENAME: &str = "daemon.json";
const UNIFIED_CONFIG_FILENAME: &str = "config.json";
const API_KEY_LEN: usize = 32;

/// Resolve the daemon's home directory (`$HOME/.ccbt/daemon`), without
/// pulling in a directories crate: the layout is fixed and Unix/Windows
/// both honor `$HOME`/`%USERPROFILE%` via `std::env`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if neither `$HOME` nor
/// `%USERPROFILE%` is set.
pub fn daemon_home_dir() -> ConfigResult<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")).ok_or(ConfigError::NoHomeDirectory)?;
    Ok(PathBuf::from(home).join(".ccbt").join("daemon"))
}

/// The unified config file's default path under the daemon home
/// directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot
/// be resolved.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    Ok(daemon_home_dir()?.join(UNIFIED_CONFIG_FILENAME))
}

/// Load the unified config from `path`, validating it. Returns
/// [`UnifiedConfig::default`] if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// fails validation.
#[instrument(name = "config.load", skip_all, fields(path = %path.display()))]
pub fn load(path: &std::path::Path) -> ConfigResult<UnifiedConfig> {
    if !path.exists() {
        let config = UnifiedConfig::default();
        config.validate()?;
        return Ok(config);
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    let config: UnifiedConfig = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?;
    config.validate()?;
    Ok(config)
}

/// Persist `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// file cannot be written.
pub fn save(path: &std::path::Path, config: &UnifiedConfig) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io { path: parent.display().to_string(), source })?;
    }
    let contents = serde_json::to_string_pretty(config).expect("UnifiedConfig always serializes");
    std::fs::write(path, contents).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })
}

/// Fall back to the legacy discovery file under the daemon home
/// directory, returning `None` if it is absent or unreadable (a missing
/// legacy file is not an error: it simply means no prior daemon ran).
#[instrument(name = "config.load_legacy", skip_all)]
pub fn load_legacy(home: &std::path::Path) -> Option<LegacyDaemonConfig> {
    let path = home.join(LEGACY_CONFIG_FILENAME);
    let contents = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparseable legacy daemon config");
            None
        }
    }
}

/// Generate a fresh random API key suitable for `UnifiedConfig::api_key`.
#[must_use]
pub fn generate_api_key() -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char).take(API_KEY_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.ipc_port, UnifiedConfig::default().ipc_port);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = UnifiedConfig::default();
        config.api_key = Some(generate_api_key());
        save(&path, &config).unwrap();

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.api_key, config.api_key);
    }

    #[test]
    fn load_rejects_invalid_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"ipc_port": 0}"#).unwrap();
        assert!(matches!(load(&path), Err(ConfigError::InvalidField { field: "ipc_port", .. })));
    }

    #[test]
    fn load_legacy_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_legacy(dir.path()).is_none());
    }

    #[test]
    fn load_legacy_parses_present_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("daemon.json"), r#"{"port": 9090}"#).unwrap();
        assert_eq!(load_legacy(dir.path()).unwrap().port, 9090);
    }

    #[test]
    fn generate_api_key_has_expected_length() {
        assert_eq!(generate_api_key().len(), API_KEY_LEN);
    }
}
