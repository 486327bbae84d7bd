//! One interpreter process per invocation.

use crate::diagnostics::emit;
use crate::process::{hide_window, terminate, wait_with_deadline, PipeReader};
use crate::protocol::{self, ChildOutcome};
use crate::request::{CommandRequest, ScriptSource};
use crate::wrapper::WrapperScript;
use rmnode_core::{HostLog, Severity};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempPath;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the pipes to drain once the child has exited.
const DRAIN_AFTER_EXIT: Duration = Duration::from_secs(1);
/// How long to wait for the pipes after the watchdog killed the child.
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(250);

const TEMP_PREFIX: &str = "RMNodeJS";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to create temporary script file: {0}")]
    TempFile(io::Error),
    #[error("failed to start {}: {source}", .interpreter.display())]
    Spawn {
        interpreter: PathBuf,
        source: io::Error,
    },
    #[error("interpreter process has no {0} pipe")]
    MissingPipe(&'static str),
    #[error("failed to read interpreter output: {0}")]
    Reader(io::Error),
    #[error("failed to wait for interpreter: {0}")]
    Wait(io::Error),
}

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `request` and return its result string; empty when the script
    /// produced no result or the run failed. Diagnostics go to `log`.
    pub fn run(&self, source: &ScriptSource, request: &CommandRequest, log: &dyn HostLog) -> String {
        tracing::debug!(request = %request, "invoking interpreter");
        match self.invoke(source, request) {
            Ok(outcome) => {
                if !outcome.exited_within_timeout {
                    emit(
                        log,
                        Severity::Warning,
                        &format!("Script timed out after {} ms", self.timeout.as_millis()),
                    );
                }
                protocol::demultiplex(&outcome, log)
            }
            Err(err) => {
                emit(log, Severity::Error, &err.to_string());
                String::new()
            }
        }
    }

    /// Spawn the interpreter for one request and capture its output.
    ///
    /// Inline scripts go through a temporary file that is removed when this
    /// returns; file scripts are bootstrapped with `-e` and run from the
    /// script's own directory so relative `require`s resolve.
    pub fn invoke(
        &self,
        source: &ScriptSource,
        request: &CommandRequest,
    ) -> Result<ChildOutcome, RunError> {
        let wrapper = WrapperScript::build(source, request);
        let mut command = Command::new(&self.interpreter);

        let _script_file: Option<TempPath> = match source {
            ScriptSource::Inline(_) => {
                let path = write_temp_script(wrapper.as_str()).map_err(RunError::TempFile)?;
                command.arg(path.as_os_str());
                Some(path)
            }
            ScriptSource::File(path) => {
                command.arg("-e").arg(wrapper.as_str());
                if let Some(dir) = path.parent().filter(|dir| dir.is_dir()) {
                    command.current_dir(dir);
                }
                None
            }
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_window(&mut command);

        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            interpreter: self.interpreter.clone(),
            source,
        })?;

        match self.supervise(&mut child) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                terminate(&mut child);
                Err(err)
            }
        }
    }

    fn supervise(&self, child: &mut Child) -> Result<ChildOutcome, RunError> {
        let stdout = child.stdout.take().ok_or(RunError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(RunError::MissingPipe("stderr"))?;
        let stdout = PipeReader::spawn(stdout, "stdout").map_err(RunError::Reader)?;
        let stderr = PipeReader::spawn(stderr, "stderr").map_err(RunError::Reader)?;

        let status = wait_with_deadline(child, self.timeout).map_err(RunError::Wait)?;
        let exited_within_timeout = status.is_some();
        let drain = if exited_within_timeout {
            DRAIN_AFTER_EXIT
        } else {
            tracing::warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "interpreter exceeded watchdog, killing"
            );
            terminate(child);
            DRAIN_AFTER_KILL
        };

        Ok(ChildOutcome {
            stderr: stderr.finish(drain),
            stdout: stdout.finish(drain),
            exited_within_timeout,
        })
    }
}

fn write_temp_script(contents: &str) -> io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".js")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Lifecycle;
    use rmnode_core::MemoryHost;

    #[test]
    fn temp_script_is_removed_on_drop() {
        let path = write_temp_script("// nothing").unwrap();
        let kept = path.to_path_buf();
        assert!(kept.exists());
        assert!(kept
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMP_PREFIX));
        drop(path);
        assert!(!kept.exists());
    }

    #[test]
    fn spawn_failure_is_logged_and_empty() {
        let host = MemoryHost::new();
        let runner = ScriptRunner::new("/definitely/not/an/interpreter");
        let result = runner.run(
            &ScriptSource::Inline("function update(){return 1;}".into()),
            &CommandRequest::Lifecycle(Lifecycle::Update),
            &host,
        );
        assert_eq!(result, "");
        let errors = host.logs_at(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("NodeJS: failed to start"));
    }

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(ScriptRunner::new("node").timeout(), Duration::from_secs(5));
    }
}
