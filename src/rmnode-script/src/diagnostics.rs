//! Severity classification of interpreter output and host log forwarding.
//!
//! The substring table below is the counterpart of the console overrides the
//! wrapper prelude installs (`ERROR:`, `WARNING:`, `DEBUG:`, `LOG:`). The two
//! must change together.

use rmnode_core::{HostLog, Severity, PLUGIN_NAME};

const ERROR_MARKERS: &[&str] = &["Error:", "error:", "ERROR:"];
const WARNING_MARKERS: &[&str] = &["Warning:", "warning:", "WARNING:", "warn:"];
const DEBUG_MARKERS: &[&str] = &["Debug:", "debug:", "DEBUG:"];

/// Pick a severity for one output line; first matching group wins.
pub fn classify_line(line: &str) -> Severity {
    let contains_any = |markers: &[&str]| markers.iter().any(|marker| line.contains(marker));
    if contains_any(ERROR_MARKERS) {
        Severity::Error
    } else if contains_any(WARNING_MARKERS) {
        Severity::Warning
    } else if contains_any(DEBUG_MARKERS) {
        Severity::Debug
    } else {
        Severity::Notice
    }
}

/// Log `message` to the host under the plugin's namespace and mirror it to
/// `tracing`.
pub fn emit(log: &dyn HostLog, severity: Severity, message: &str) {
    match severity {
        Severity::Error => tracing::error!(target: "rmnode::host", "{message}"),
        Severity::Warning => tracing::warn!(target: "rmnode::host", "{message}"),
        Severity::Notice => tracing::info!(target: "rmnode::host", "{message}"),
        Severity::Debug => tracing::debug!(target: "rmnode::host", "{message}"),
    }
    log.log(severity, &format!("{PLUGIN_NAME}: {message}"));
}

/// Forward a single line, skipping blank ones.
pub fn forward_line(log: &dyn HostLog, line: &str) {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return;
    }
    emit(log, classify_line(line), line);
}

/// Split raw output on newlines and forward every non-blank line.
pub fn classify_and_log(log: &dyn HostLog, output: &[u8]) {
    for raw in output.split(|&byte| byte == b'\n') {
        forward_line(log, &rmnode_core::text::line_to_utf8(raw));
    }
}
