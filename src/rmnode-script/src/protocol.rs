//! In-band protocol on the interpreter's stdio.
//!
//! Severity-tagged lines (`LOG:`, `DEBUG:` on stdout; `ERROR:`, `WARNING:` on
//! stderr) are diagnostics. The first stdout line starting with `RESULT:` is
//! the invocation's return value. A script that prints its own `RESULT:` line
//! therefore overrides its return value.

use crate::diagnostics::{self, forward_line};
use rmnode_core::text::line_to_utf8;
use rmnode_core::HostLog;

pub const RESULT_PREFIX: &str = "RESULT:";
pub const SCRIPT_ERROR_PREFIX: &str = "NodeJS Plugin Error: ";

/// What one interpreter run left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildOutcome {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exited_within_timeout: bool,
}

/// Route diagnostics to `log` and return the result value, empty when the
/// script produced none. Stderr is forwarded before stdout.
pub fn demultiplex(outcome: &ChildOutcome, log: &dyn HostLog) -> String {
    diagnostics::classify_and_log(log, &outcome.stderr);
    extract_result(&outcome.stdout, log)
}

/// Take the first `RESULT:` line from stdout; forward every other line.
pub fn extract_result(stdout: &[u8], log: &dyn HostLog) -> String {
    let mut result: Option<String> = None;
    for raw in stdout.split(|&byte| byte == b'\n') {
        let line = line_to_utf8(raw);
        match line.strip_prefix(RESULT_PREFIX) {
            Some(value) if result.is_none() => {
                result = Some(value.trim_end_matches(['\r', '\n']).to_string());
            }
            _ => forward_line(log, &line),
        }
    }
    result.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmnode_core::{MemoryHost, Severity};

    fn outcome(stdout: &str, stderr: &str) -> ChildOutcome {
        ChildOutcome {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            exited_within_timeout: true,
        }
    }

    #[test]
    fn result_is_extracted_amid_noise() {
        let host = MemoryHost::new();
        let value = demultiplex(&outcome("LOG: hello\nRESULT:3.14\nLOG: bye\n", ""), &host);
        assert_eq!(value, "3.14");
        assert_eq!(
            host.logs(),
            vec![
                (Severity::Notice, "NodeJS: LOG: hello".to_string()),
                (Severity::Notice, "NodeJS: LOG: bye".to_string()),
            ]
        );
    }

    #[test]
    fn first_result_wins_and_later_ones_are_logged() {
        let host = MemoryHost::new();
        let value = extract_result(b"RESULT:first\r\nRESULT:second\n", &host);
        assert_eq!(value, "first");
        assert_eq!(host.logs_at(Severity::Notice), vec!["NodeJS: RESULT:second"]);
    }

    #[test]
    fn no_result_line_means_empty() {
        let host = MemoryHost::new();
        assert_eq!(extract_result(b"LOG: nothing to see\n", &host), "");
        assert_eq!(extract_result(b"", &host), "");
    }

    #[test]
    fn empty_result_value_is_preserved_as_empty() {
        let host = MemoryHost::new();
        assert_eq!(extract_result(b"RESULT:\n", &host), "");
        assert!(host.logs().is_empty());
    }

    #[test]
    fn result_prefix_must_start_the_line() {
        let host = MemoryHost::new();
        assert_eq!(extract_result(b"LOG: RESULT:nope\n", &host), "");
        assert_eq!(host.logs().len(), 1);
    }

    #[test]
    fn stderr_is_forwarded_before_stdout() {
        let host = MemoryHost::new();
        demultiplex(&outcome("LOG: out\n", "ERROR: NodeJS Plugin Error: bad\n"), &host);
        assert_eq!(
            host.logs(),
            vec![
                (Severity::Error, "NodeJS: ERROR: NodeJS Plugin Error: bad".to_string()),
                (Severity::Notice, "NodeJS: LOG: out".to_string()),
            ]
        );
    }

    #[test]
    fn every_diagnostic_line_is_forwarded_once() {
        let host = MemoryHost::new();
        let stderr = "WARNING: a\nb\n\nERROR: c";
        let stdout = "DEBUG: d\nRESULT:1\ne";
        demultiplex(&outcome(stdout, stderr), &host);
        let lines: Vec<String> = host.logs().into_iter().map(|(_, line)| line).collect();
        assert_eq!(
            lines,
            ["WARNING: a", "b", "ERROR: c", "DEBUG: d", "e"]
                .iter()
                .map(|l| format!("NodeJS: {l}"))
                .collect::<Vec<_>>()
        );
    }
}
