//! Daemon boot sequence: load config, install telemetry, wire the session
//! manager and executor, write the PID file, and serve the IPC listener
//! until it shuts down.

use std::sync::Arc;

use ccbt_config::UnifiedConfig;
use ccbt_events::EventBus;
use ccbt_executor::{Executor, LocalAdapter};
use ccbt_session::SessionManager;
use ccbt_telemetry::{LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::pidfile::{remove_pid_file, write_pid_file};

/// Dependencies required to bootstrap the daemon, constructed from the
/// environment for the binary entrypoint.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig,
    config: Arc<UnifiedConfig>,
    events: Arc<EventBus>,
    metrics: Metrics,
}

impl BootstrapDependencies {
    pub(crate) fn from_env() -> AppResult<Self> {
        let logging = LoggingConfig::default();

        let config_path = ccbt_config::default_config_path().map_err(|err| AppError::config("default_config_path", err))?;
        let config = ccbt_config::load(&config_path).map_err(|err| AppError::config("load", err))?;

        let events = Arc::new(EventBus::new());
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;

        Ok(Self { logging, config: Arc::new(config), events, metrics })
    }
}

/// Bootstrap the daemon and block until the IPC listener shuts down.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, telemetry cannot
/// be installed, the PID file cannot be written, or the IPC server fails
/// to start or self-verify.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    ccbt_telemetry::init_logging(&dependencies.logging).map_err(|err| AppError::telemetry("init_logging", err))?;

    info!("ccbt daemon bootstrap starting");

    let BootstrapDependencies { logging: _, config, events, metrics } = dependencies;

    let pid_path = ccbt_config::daemon_home_dir().map_err(|err| AppError::config("daemon_home_dir", err))?.join("daemon.pid");
    write_pid_file(&pid_path).map_err(|source| AppError::io("write_pid_file", source))?;

    let session = Arc::new(SessionManager::new(Some(Arc::clone(&events)), None));
    let config_dir = ccbt_config::daemon_home_dir().map_err(|err| AppError::config("daemon_home_dir", err))?;
    let adapter = Arc::new(LocalAdapter::new(Arc::clone(&session), config_dir.join("config.json")));
    let executor = Arc::new(Executor::new(adapter));

    let api = ccbt_api::ApiServer::new(Arc::clone(&executor), Arc::clone(&events), metrics, Arc::clone(&config));

    let addr = config.local_socket_addr();
    info!(addr = %addr, "launching IPC listener");

    let serve_result = api.serve(addr).await;

    if let Err(err) = session.shutdown().await {
        tracing::warn!(error = %err, "failed to stop all folders cleanly during shutdown");
    }
    remove_pid_file(&pid_path);

    serve_result.map_err(|err| AppError::api_server("serve", err))?;
    info!("ccbt daemon shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_dependencies_load_from_environment() {
        // Uses whatever $HOME the test process has; exercises the same
        // fallback-to-defaults path a first daemon run takes.
        let deps = BootstrapDependencies::from_env();
        assert!(deps.is_ok());
    }
}
