use crate::parser::{self, ParseError};
use std::fmt;
use std::path::PathBuf;

/// Where a measure's script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    File(PathBuf),
    Inline(String),
}

/// Script functions the controller calls on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Initialize,
    Finalize,
    Update,
    GetString,
}

impl Lifecycle {
    pub const ALL: [Lifecycle; 4] = [
        Lifecycle::Initialize,
        Lifecycle::Finalize,
        Lifecycle::Update,
        Lifecycle::GetString,
    ];

    /// The script-side function name.
    pub fn function_name(&self) -> &'static str {
        match self {
            Lifecycle::Initialize => "initialize",
            Lifecycle::Finalize => "finalize",
            Lifecycle::Update => "update",
            Lifecycle::GetString => "getString",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// One invocation of the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    /// Call the named lifecycle function if the script defines it.
    Lifecycle(Lifecycle),
    /// Evaluate an expression exactly as the user wrote it.
    Raw(String),
    /// Evaluate a call expression rendered from a shell-style command line.
    Parsed(String),
}

impl CommandRequest {
    /// Classify a user command: text that already carries an argument list is
    /// evaluated as written, anything else goes through the command parser.
    pub fn from_command(command: &str) -> Result<Self, ParseError> {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }
        if trimmed.contains('(') && trimmed.contains(')') {
            Ok(CommandRequest::Raw(trimmed.to_string()))
        } else {
            parser::try_parse_call(trimmed).map(CommandRequest::Parsed)
        }
    }

    /// The expression to evaluate, or `None` for lifecycle calls.
    pub fn expression(&self) -> Option<&str> {
        match self {
            CommandRequest::Lifecycle(_) => None,
            CommandRequest::Raw(expr) | CommandRequest::Parsed(expr) => Some(expr),
        }
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandRequest::Lifecycle(lifecycle) => write!(f, "{lifecycle}"),
            CommandRequest::Raw(expr) | CommandRequest::Parsed(expr) => f.write_str(expr),
        }
    }
}
