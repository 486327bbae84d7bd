//! The seam between the plugin and the skin host.
//!
//! The script crate only ever needs [`HostLog`]; the measure controller and the
//! host-object bridge need the full [`Host`]. The Windows plugin implements both
//! over the host API, [`MemoryHost`] implements them in memory.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Host log severities, numbered as the host log API numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Notice = 3,
    Debug = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Debug => "debug",
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no skin is bound to this measure")]
    NoSkin,
}

pub trait HostLog {
    fn log(&self, severity: Severity, message: &str);
}

pub trait Host: HostLog {
    /// Read a measure option; `default` when absent.
    fn read_string(&self, option: &str, default: &str) -> String;

    /// Read a measure option and resolve it against the skin's folder.
    fn read_path(&self, option: &str, default: &str) -> String;

    /// Substitute variables and section variables such as `[Meter:W]`.
    /// Unknown references come back unchanged.
    fn replace_variables(&self, input: &str) -> String;

    /// Run a bang string such as `[!Redraw]` against the skin.
    fn execute(&self, command: &str) -> Result<(), BridgeError>;
}

impl<T: HostLog + ?Sized> HostLog for &T {
    fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message);
    }
}

/// A host that lives entirely in memory.
///
/// Options and section variables are seeded up front; executed bangs and log
/// lines are recorded for inspection.
#[derive(Debug, Default)]
pub struct MemoryHost {
    options: HashMap<String, String>,
    variables: HashMap<String, String>,
    base_dir: Option<PathBuf>,
    reject_bangs: bool,
    executed: RefCell<Vec<String>>,
    logs: RefCell<Vec<(Severity, String)>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, option: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_option(option, value);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Relative paths read through [`Host::read_path`] resolve against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Make every [`Host::execute`] call fail, as a host without a skin would.
    pub fn rejecting_bangs(mut self) -> Self {
        self.reject_bangs = true;
        self
    }

    pub fn set_option(&mut self, option: impl Into<String>, value: impl Into<String>) {
        self.options.insert(option.into(), value.into());
    }

    pub fn remove_option(&mut self, option: &str) {
        self.options.remove(option);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    pub fn logs(&self) -> Vec<(Severity, String)> {
        self.logs.borrow().clone()
    }

    pub fn logs_at(&self, severity: Severity) -> Vec<String> {
        self.logs
            .borrow()
            .iter()
            .filter(|(level, _)| *level == severity)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn clear_logs(&self) {
        self.logs.borrow_mut().clear();
    }
}

impl HostLog for MemoryHost {
    fn log(&self, severity: Severity, message: &str) {
        self.logs.borrow_mut().push((severity, message.to_string()));
    }
}

impl Host for MemoryHost {
    fn read_string(&self, option: &str, default: &str) -> String {
        self.options
            .get(option)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn read_path(&self, option: &str, default: &str) -> String {
        let value = self.read_string(option, default);
        if value.is_empty() {
            return value;
        }
        match &self.base_dir {
            Some(base) if Path::new(&value).is_relative() => {
                base.join(&value).to_string_lossy().into_owned()
            }
            _ => value,
        }
    }

    fn replace_variables(&self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(open) = rest.find('[') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find(']') {
                Some(close) => {
                    let name = &after[..close];
                    match self.variables.get(name) {
                        Some(value) => output.push_str(value),
                        None => {
                            output.push('[');
                            output.push_str(name);
                            output.push(']');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    output.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        output.push_str(rest);
        output
    }

    fn execute(&self, command: &str) -> Result<(), BridgeError> {
        if self.reject_bangs {
            return Err(BridgeError::NoSkin);
        }
        self.executed.borrow_mut().push(command.to_string());
        Ok(())
    }
}
