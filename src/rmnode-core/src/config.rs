use crate::paths::{AppDirs, DirsError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";

const SUPPORTED_VERSION: u32 = 1;
const DEFAULT_MAX_LOG_FILES: usize = 7;
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub config_version: u32,
    pub logging: LoggingConfig,
    pub runner: RunnerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: SUPPORTED_VERSION,
            logging: LoggingConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Rolled files kept in the log directory.
    pub max_log_files: usize,
    /// The plugin runs inside the host process, which has no console.
    pub stdout: bool,
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            max_log_files: DEFAULT_MAX_LOG_FILES,
            stdout: false,
            file_name: None,
        }
    }
}

/// Watchdog limits for interpreter child processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Per-invocation limit; a measure's `Timeout` option overrides it.
    pub timeout_ms: u64,
    /// Limit for each `--version` probe while locating the interpreter.
    pub probe_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Minimum level for the `tracing` subscriber; serialized lowercase, which is
/// also the `EnvFilter` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Directories(#[from] DirsError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("config_version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("runner.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

impl Config {
    /// Read `config.toml` from the config directory; defaults when absent.
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents, &path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// `path` only labels errors.
    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join(CONFIG_FILE_NAME)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != SUPPORTED_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: SUPPORTED_VERSION,
            });
        }
        let zero = [
            ("timeout_ms", self.runner.timeout_ms),
            ("probe_timeout_ms", self.runner.probe_timeout_ms),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);
        match zero {
            Some((field, _)) => Err(ValidationError::ZeroTimeout { field }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<Config, ConfigError> {
        Config::from_toml(contents, Path::new("config.toml"))
    }

    #[test]
    fn empty_file_is_the_default() {
        let config = parse("").unwrap();
        assert_eq!(config.config_version, SUPPORTED_VERSION);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.max_log_files, 7);
        assert!(!config.logging.stdout);
        assert_eq!(config.runner, RunnerConfig::default());
        assert_eq!(config.runner.timeout(), Duration::from_secs(5));
        assert_eq!(config.runner.probe_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = parse("[runner]\ntimeout_ms = 2500\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.runner.timeout_ms, 2500);
        assert_eq!(config.runner.probe_timeout_ms, 1000);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.max_log_files, 7);
    }

    #[test]
    fn future_version_is_rejected() {
        let err = parse("config_version = 2\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::UnsupportedVersion {
                found: 2,
                expected: 1
            })
        ));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let err = parse("[runner]\nprobe_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::ZeroTimeout {
                field: "probe_timeout_ms"
            })
        ));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let err = Config::from_toml("runner = [", Path::new("/tmp/rmnode.toml")).unwrap_err();
        assert!(err.to_string().contains("/tmp/rmnode.toml"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let root = tempfile::tempdir().unwrap();
        let dirs = AppDirs::at(root.path().join("config"), root.path().join("logs"));
        let config = Config::load_or_default(&dirs).unwrap();
        assert_eq!(config.runner, RunnerConfig::default());
        assert!(root.path().join("config").is_dir());
    }

    #[test]
    fn file_on_disk_is_read() {
        let root = tempfile::tempdir().unwrap();
        let dirs = AppDirs::at(root.path().join("config"), root.path().join("logs"));
        dirs.ensure_exists().unwrap();
        fs::write(Config::config_path(&dirs), "[runner]\ntimeout_ms = 900\n").unwrap();
        assert_eq!(Config::load_or_default(&dirs).unwrap().runner.timeout_ms, 900);
    }

    #[test]
    fn level_names_are_filter_directives() {
        for (name, level) in [("trace", LogLevel::Trace), ("warn", LogLevel::Warn)] {
            let parsed: LoggingConfig = toml::from_str(&format!("level = \"{name}\"")).unwrap();
            assert_eq!(parsed.level, level);
            assert_eq!(level.directive(), name);
        }
    }
}
