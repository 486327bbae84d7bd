//! Measure options as read through the host.

use rmnode_core::{Host, Severity};
use rmnode_script::diagnostics::emit;
use rmnode_script::ScriptSource;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Highest `LineN` option consulted for an inline script.
pub const MAX_LINES: usize = 100;

pub const SCRIPT_FILE_OPTION: &str = "ScriptFile";
pub const TIMEOUT_OPTION: &str = "Timeout";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Either ScriptFile parameter or Line parameters are required")]
    NoSource,
    #[error("Script file not found: {}", .0.display())]
    ScriptFileMissing(PathBuf),
}

/// Everything a reload needs to (re)configure a measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureOptions {
    pub source: ScriptSource,
    pub timeout: Duration,
}

impl MeasureOptions {
    pub fn read<H: Host>(host: &H, default_timeout: Duration) -> Result<Self, SourceError> {
        let source = read_source(host)?;
        let timeout = read_timeout(host, default_timeout);
        Ok(Self { source, timeout })
    }
}

/// `Line`, `Line2` ... `Line100`.
pub fn line_option(index: usize) -> String {
    if index <= 1 {
        "Line".to_string()
    } else {
        format!("Line{index}")
    }
}

/// The inline script, joined with `\n`; `None` when `Line` is empty.
/// Reading stops at the first empty line.
pub fn read_inline<H: Host>(host: &H) -> Option<String> {
    let lines: Vec<String> = (1..=MAX_LINES)
        .map(|index| host.read_string(&line_option(index), ""))
        .take_while(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Inline lines win over `ScriptFile`; a script file must exist on disk.
pub fn read_source<H: Host>(host: &H) -> Result<ScriptSource, SourceError> {
    if let Some(code) = read_inline(host) {
        return Ok(ScriptSource::Inline(code));
    }
    let path = host.read_path(SCRIPT_FILE_OPTION, "");
    if path.is_empty() {
        return Err(SourceError::NoSource);
    }
    let path = PathBuf::from(path);
    if !path.is_file() {
        return Err(SourceError::ScriptFileMissing(path));
    }
    Ok(ScriptSource::File(path))
}

/// Per-measure watchdog in milliseconds. Anything but a positive integer
/// falls back to `default` with a warning.
pub fn read_timeout<H: Host>(host: &H, default: Duration) -> Duration {
    let raw = host.read_string(TIMEOUT_OPTION, "");
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => {
            emit(
                host,
                Severity::Warning,
                &format!(
                    "Invalid Timeout '{raw}', using {} ms",
                    default.as_millis()
                ),
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmnode_core::MemoryHost;

    const DEFAULT: Duration = Duration::from_millis(5000);

    #[test]
    fn line_names() {
        assert_eq!(line_option(1), "Line");
        assert_eq!(line_option(2), "Line2");
        assert_eq!(line_option(100), "Line100");
    }

    #[test]
    fn inline_lines_stop_at_first_gap() {
        let host = MemoryHost::new()
            .with_option("Line", "function update() {")
            .with_option("Line2", "  return 1;")
            .with_option("Line3", "}")
            .with_option("Line5", "ignored");
        assert_eq!(
            read_inline(&host).as_deref(),
            Some("function update() {\n  return 1;\n}")
        );
    }

    #[test]
    fn exactly_one_hundred_lines_are_read() {
        let mut host = MemoryHost::new();
        for index in 1..=101 {
            host = host.with_option(&line_option(index), &format!("// {index}"));
        }
        let code = read_inline(&host).unwrap();
        assert_eq!(code.lines().count(), 100);
        assert!(code.ends_with("// 100"));
    }

    #[test]
    fn missing_line_and_file_is_an_error() {
        let host = MemoryHost::new();
        assert_eq!(read_source(&host), Err(SourceError::NoSource));
    }

    #[test]
    fn inline_takes_precedence_over_file() {
        let host = MemoryHost::new()
            .with_option("Line", "1")
            .with_option("ScriptFile", "missing.js");
        assert_eq!(read_source(&host), Ok(ScriptSource::Inline("1".into())));
    }

    #[test]
    fn script_file_resolves_against_base_and_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let host = MemoryHost::new()
            .with_base_dir(dir.path())
            .with_option("ScriptFile", "clock.js");
        assert_eq!(
            read_source(&host),
            Err(SourceError::ScriptFileMissing(dir.path().join("clock.js")))
        );

        std::fs::write(dir.path().join("clock.js"), "").unwrap();
        assert_eq!(
            read_source(&host),
            Ok(ScriptSource::File(dir.path().join("clock.js")))
        );
    }

    #[test]
    fn timeout_option() {
        let host = MemoryHost::new().with_option("Timeout", "750");
        assert_eq!(read_timeout(&host, DEFAULT), Duration::from_millis(750));

        let host = MemoryHost::new();
        assert_eq!(read_timeout(&host, DEFAULT), DEFAULT);
        assert!(host.logs().is_empty());
    }

    #[test]
    fn bad_timeout_falls_back_with_warning() {
        for raw in ["0", "-5", "soon", "1.5"] {
            let host = MemoryHost::new().with_option("Timeout", raw);
            assert_eq!(read_timeout(&host, DEFAULT), DEFAULT);
            assert_eq!(
                host.logs_at(Severity::Warning),
                vec![format!("NodeJS: Invalid Timeout '{raw}', using 5000 ms")]
            );
        }
    }
}
