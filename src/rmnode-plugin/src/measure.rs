//! One skin measure: the state machine behind the plugin exports.
//!
//! Every operation is fail-soft. Problems become host log lines and the
//! caller gets a neutral value (`0.0`, an empty string or `"false"`).

use crate::settings::MeasureOptions;
use rmnode_core::{Host, RunnerConfig, Severity};
use rmnode_script::diagnostics::emit;
use rmnode_script::{
    bridge, is_meter_call, CommandRequest, Lifecycle, Locator, ScriptRunner, ScriptSource,
};
use std::fmt;
use std::path::{Path, PathBuf};

pub const NOT_FOUND_STATUS: &str = "Node.js not found";
pub const NOT_INITIALIZED_STATUS: &str = "Script not initialized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureState {
    /// No interpreter was located.
    Uninitialized,
    /// Interpreter located, no usable script configured yet.
    Found,
    /// Configured and `initialize` has run.
    Running,
    Finalized,
}

#[derive(Debug, Clone, Copy)]
enum Surface {
    Execute,
    Bang,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Execute => f.write_str("Execute"),
            Surface::Bang => f.write_str("ExecuteBang"),
        }
    }
}

pub struct Measure<H: Host> {
    host: H,
    runner_config: RunnerConfig,
    locator: Locator,
    interpreter: Option<PathBuf>,
    options: Option<MeasureOptions>,
    last_result: String,
    initialized: bool,
    finalized: bool,
}

impl<H: Host> Measure<H> {
    /// Bind to `host` and look for the interpreter.
    pub fn initialize(host: H, runner_config: RunnerConfig) -> Self {
        let locator = Locator::new(runner_config.probe_timeout());
        Self::with_locator(host, runner_config, locator)
    }

    pub fn with_locator(host: H, runner_config: RunnerConfig, locator: Locator) -> Self {
        let mut measure = Self {
            host,
            runner_config,
            locator,
            interpreter: None,
            options: None,
            last_result: String::new(),
            initialized: false,
            finalized: false,
        };
        measure.locate();
        measure
    }

    fn locate(&mut self) -> bool {
        self.interpreter = self.locator.locate();
        match &self.interpreter {
            Some(path) => emit(
                &self.host,
                Severity::Notice,
                &format!("Found Node.js at {}", path.display()),
            ),
            None => emit(
                &self.host,
                Severity::Error,
                "Node.js not found in system PATH or common installation directories",
            ),
        }
        self.interpreter.is_some()
    }

    pub fn state(&self) -> MeasureState {
        if self.finalized {
            MeasureState::Finalized
        } else if self.interpreter.is_none() {
            MeasureState::Uninitialized
        } else if self.initialized {
            MeasureState::Running
        } else {
            MeasureState::Found
        }
    }

    fn is_running(&self) -> bool {
        self.state() == MeasureState::Running
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn interpreter(&self) -> Option<&Path> {
        self.interpreter.as_deref()
    }

    pub fn options(&self) -> Option<&MeasureOptions> {
        self.options.as_ref()
    }

    pub fn last_result(&self) -> &str {
        &self.last_result
    }

    /// Read the script options and run `initialize`.
    ///
    /// A measure whose interpreter was missing looks for it again first. A
    /// reload that yields the configuration already running is a no-op.
    pub fn reload(&mut self) {
        if self.finalized {
            return;
        }
        if self.interpreter.is_none() && !self.locate() {
            return;
        }

        let options = match MeasureOptions::read(&self.host, self.runner_config.timeout()) {
            Ok(options) => options,
            Err(err) => {
                emit(&self.host, Severity::Error, &err.to_string());
                self.options = None;
                self.initialized = false;
                return;
            }
        };
        if self.initialized && self.options.as_ref() == Some(&options) {
            return;
        }

        match &options.source {
            ScriptSource::Inline(_) => {
                emit(&self.host, Severity::Notice, "Using inline script")
            }
            ScriptSource::File(path) => emit(
                &self.host,
                Severity::Notice,
                &format!("Using script file: {}", path.display()),
            ),
        }
        self.options = Some(options);
        self.last_result.clear();

        let result = self.run(&CommandRequest::Lifecycle(Lifecycle::Initialize));
        if !result.is_empty() {
            emit(
                &self.host,
                Severity::Debug,
                &format!("Initialize returned: {result}"),
            );
        }
        self.initialized = true;
    }

    /// Run `update`; the numeric value of its result, `0.0` when there is none.
    pub fn update(&mut self) -> f64 {
        if !self.is_running() {
            return 0.0;
        }
        let result = self.run(&CommandRequest::Lifecycle(Lifecycle::Update));
        if result.is_empty() {
            return 0.0;
        }
        let value = parse_number(&result);
        self.last_result = result;
        value
    }

    /// The cached result, or a fresh `getString` when nothing is cached yet.
    pub fn get_string(&mut self) -> &str {
        match self.state() {
            MeasureState::Uninitialized => return NOT_FOUND_STATUS,
            MeasureState::Found | MeasureState::Finalized => return NOT_INITIALIZED_STATUS,
            MeasureState::Running => {}
        }
        if self.last_result.is_empty() {
            self.last_result = self.run(&CommandRequest::Lifecycle(Lifecycle::GetString));
        }
        &self.last_result
    }

    /// Section-variable execution. The host splits the argument list on
    /// commas, so the pieces are joined back before dispatch. Meter calls get
    /// their commas back verbatim since the last argument of a setter keeps
    /// any commas it contains.
    pub fn execute(&mut self, args: &[String]) -> String {
        let separator = match args.first() {
            Some(first) if is_meter_call(first) => ",",
            _ => ", ",
        };
        let command = args.join(separator);
        self.dispatch(&command, Surface::Execute).unwrap_or_default()
    }

    pub fn execute_bang(&mut self, args: &str) {
        self.dispatch(args, Surface::Bang);
    }

    fn dispatch(&mut self, command: &str, surface: Surface) -> Option<String> {
        if !self.is_running() {
            emit(
                &self.host,
                Severity::Warning,
                &format!("Cannot execute {surface}: Node.js not found or plugin not initialized"),
            );
            return None;
        }
        let command = command.trim();
        if command.is_empty() {
            emit(
                &self.host,
                Severity::Warning,
                &format!("Empty command provided to {surface}"),
            );
            return None;
        }

        if is_meter_call(command) {
            return Some(bridge::execute(&self.host, command));
        }

        let request = match CommandRequest::from_command(command) {
            Ok(request) => request,
            Err(_) => {
                emit(
                    &self.host,
                    Severity::Error,
                    &format!("Failed to parse function call: {command}"),
                );
                return None;
            }
        };
        if let Some(expression) = request.expression() {
            emit(
                &self.host,
                Severity::Debug,
                &format!("Executing function call: {expression}"),
            );
        }

        let result = self.run(&request);
        if !result.is_empty() {
            emit(
                &self.host,
                Severity::Debug,
                &format!("Bang '{command}' returned: {result}"),
            );
            self.last_result = result.clone();
        }
        Some(result)
    }

    /// Best-effort `finalize`. Runs at most once, and only after `initialize`.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        if self.is_running() {
            self.run(&CommandRequest::Lifecycle(Lifecycle::Finalize));
        }
        self.finalized = true;
    }

    fn run(&self, request: &CommandRequest) -> String {
        let (Some(interpreter), Some(options)) = (&self.interpreter, &self.options) else {
            return String::new();
        };
        ScriptRunner::new(interpreter.clone())
            .with_timeout(options.timeout)
            .run(&options.source, request, &self.host)
    }
}

/// Script results are strings; only finite numbers count.
pub fn parse_number(result: &str) -> f64 {
    result
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
