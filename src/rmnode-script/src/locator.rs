//! Finding a working Node.js interpreter.

use crate::process::{hide_window, terminate, wait_with_deadline};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// The executable name probed through `PATH`.
pub const INTERPRETER_NAME: &str = "node";

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Locator {
    candidates: Vec<PathBuf>,
    probe_timeout: Duration,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl Locator {
    /// Probe `PATH` first, then the platform's usual install locations.
    pub fn new(probe_timeout: Duration) -> Self {
        Self::with_candidates(default_candidates(), probe_timeout)
    }

    pub fn with_candidates(candidates: Vec<PathBuf>, probe_timeout: Duration) -> Self {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        Self {
            candidates: unique,
            probe_timeout,
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate whose `--version` exits 0 within the probe timeout.
    pub fn locate(&self) -> Option<PathBuf> {
        let found = self
            .candidates
            .iter()
            .find(|candidate| probe(candidate, self.probe_timeout))
            .cloned();
        match &found {
            Some(path) => tracing::info!(interpreter = %path.display(), "located Node.js"),
            None => tracing::warn!(
                candidates = self.candidates.len(),
                "no working Node.js interpreter found"
            ),
        }
        found
    }
}

/// [`Locator::default`] shorthand.
pub fn locate() -> Option<PathBuf> {
    Locator::default().locate()
}

/// Run `candidate --version` with a hidden window; true on exit code 0.
pub fn probe(candidate: &Path, timeout: Duration) -> bool {
    let mut command = Command::new(candidate);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    hide_window(&mut command);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::debug!(candidate = %candidate.display(), error = %err, "probe did not start");
            return false;
        }
    };

    match wait_with_deadline(&mut child, timeout) {
        Ok(Some(status)) => status.success(),
        Ok(None) => {
            tracing::debug!(candidate = %candidate.display(), "probe timed out");
            terminate(&mut child);
            false
        }
        Err(err) => {
            tracing::debug!(candidate = %candidate.display(), error = %err, "probe wait failed");
            terminate(&mut child);
            false
        }
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    // Resolve through PATH up front so the stored interpreter path is absolute.
    candidates.push(which::which(INTERPRETER_NAME).unwrap_or_else(|_| PathBuf::from(INTERPRETER_NAME)));
    candidates.extend(install_locations());
    candidates
}

#[cfg(windows)]
fn install_locations() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(std::env::var_os)
        .map(PathBuf::from)
        .collect();
    roots.push(PathBuf::from(r"C:\Program Files"));
    roots.push(PathBuf::from(r"C:\Program Files (x86)"));
    roots
        .into_iter()
        .map(|root| root.join("nodejs").join("node.exe"))
        .collect()
}

#[cfg(not(windows))]
fn install_locations() -> Vec<PathBuf> {
    ["/usr/local/bin/node", "/usr/bin/node", "/opt/homebrew/bin/node"]
        .iter()
        .map(PathBuf::from)
        .collect()
}
