pub mod config;
pub mod host;
pub mod logging;
pub mod paths;
pub mod text;

pub use config::{Config, ConfigError, LogLevel, LoggingConfig, RunnerConfig, ValidationError};
pub use host::{BridgeError, Host, HostLog, MemoryHost, Severity};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use paths::{AppDirs, DirsError};
pub use text::{
    normalize_path, to_utf8, to_wide, to_wide_nul, try_line_to_utf8, try_to_utf8, EncodingError,
};

pub const APP_NAME: &str = "rmnode";
pub const APP_AUTHOR: &str = "RmNode";
pub const APP_QUALIFIER: &str = "io";

/// Name every host log line is namespaced with.
pub const PLUGIN_NAME: &str = "NodeJS";
