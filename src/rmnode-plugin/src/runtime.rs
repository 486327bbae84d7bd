//! Process-wide state shared by every measure in the host process.

use rmnode_core::{init_logging, AppDirs, Config, LoggingGuard};
use std::sync::OnceLock;

struct Runtime {
    config: Config,
    _logging: Option<LoggingGuard>,
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The plugin configuration, loading it and installing the file subscriber on
/// first use. Failures leave the defaults in place; the host log still works.
pub fn config() -> &'static Config {
    &RUNTIME.get_or_init(load).config
}

fn load() -> Runtime {
    let dirs = AppDirs::discover();
    let (config, config_error) = match &dirs {
        Ok(dirs) => match Config::load_or_default(dirs) {
            Ok(config) => (config, None),
            Err(err) => (Config::default(), Some(err.to_string())),
        },
        Err(err) => (Config::default(), Some(err.to_string())),
    };

    let log_dir = dirs.as_ref().ok().map(|dirs| dirs.log_dir());
    let logging = init_logging(&config.logging, log_dir).ok();

    if let Some(error) = config_error {
        tracing::warn!(%error, "using default plugin configuration");
    }
    tracing::info!(
        timeout_ms = config.runner.timeout_ms,
        probe_timeout_ms = config.runner.probe_timeout_ms,
        "NodeJS plugin loaded"
    );

    Runtime {
        config,
        _logging: logging,
    }
}
