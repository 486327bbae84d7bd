use crate::config::LoggingConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILE_STEM: &str = "rmnode.log";

/// Keeps the non-blocking file writer flushing; drop it last.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `log_dir` of `None` disables the file sink. With neither a file nor stdout
/// configured the subscriber still writes to stderr rather than dropping events.
pub fn init_logging(
    config: &LoggingConfig,
    log_dir: Option<&Path>,
) -> Result<LoggingGuard, LoggingError> {
    let directive = config.level.directive();
    let env_filter = EnvFilter::try_new(directive).map_err(|source| LoggingError::ParseLevel {
        level: directive.to_string(),
        source,
    })?;

    let (file_writer, file_guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = open_rolling_file(config, dir)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let writer = match (config.stdout, file_writer) {
        (true, Some(file)) => BoxMakeWriter::new(std::io::stdout.and(file)),
        (true, None) => BoxMakeWriter::new(std::io::stdout),
        (false, Some(file)) => BoxMakeWriter::new(file),
        (false, None) => BoxMakeWriter::new(std::io::stderr),
    };

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(config.stdout)
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::SubscriberInstall)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn open_rolling_file(
    config: &LoggingConfig,
    log_dir: &Path,
) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let file_stem = config.file_name.as_deref().unwrap_or(DEFAULT_FILE_STEM);
    prune_logs(log_dir, file_stem, config.max_log_files.max(1))?;

    let appender = tracing_appender::rolling::daily(log_dir, file_stem);
    Ok(tracing_appender::non_blocking(appender))
}

/// Delete the oldest `file_stem*` files until at most `keep` remain.
fn prune_logs(dir: &Path, file_stem: &str, keep: usize) -> Result<(), LoggingError> {
    let listing = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut logs: Vec<(PathBuf, std::time::SystemTime)> = listing
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(file_stem))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((entry.path(), modified))
        })
        .collect();

    if logs.len() <= keep {
        return Ok(());
    }

    logs.sort_by_key(|(_, modified)| *modified);
    let excess = logs.len() - keep;
    for (path, _) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::Cleanup { path, source })?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse log level {level}: {source}")]
    ParseLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove old log file {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn prune_keeps_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = SystemTime::now() - Duration::from_secs(3600);
        for (i, name) in ["rmnode.log.1", "rmnode.log.2", "rmnode.log.3"].iter().enumerate() {
            let path = dir.path().join(name);
            fs::write(&path, "x").unwrap();
            let file = fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(base + Duration::from_secs(60 * i as u64))
                .unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        prune_logs(dir.path(), "rmnode.log", 2).unwrap();

        assert!(!dir.path().join("rmnode.log.1").exists());
        assert!(dir.path().join("rmnode.log.2").exists());
        assert!(dir.path().join("rmnode.log.3").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }
}
