//! Script execution for the NodeJS skin plugin.
//!
//! - [`locator`] finds the interpreter.
//! - [`parser`] turns `func arg "two words" 3` into `func("arg", "two words", 3)`.
//! - [`bridge`] answers `MeterOption.*` calls against the host.
//! - [`runner`] wraps a script, runs it in a child process and demultiplexes
//!   its output through [`protocol`] and [`diagnostics`].

pub mod bridge;
pub mod diagnostics;
pub mod locator;
pub mod parser;
mod process;
pub mod protocol;
pub mod request;
pub mod runner;
pub mod wrapper;

pub use bridge::{is_meter_call, MeterCall, MeterCallError};
pub use locator::{locate, Locator};
pub use parser::{parse_call, try_parse_call, ParseError};
pub use protocol::{demultiplex, ChildOutcome, RESULT_PREFIX};
pub use request::{CommandRequest, Lifecycle, ScriptSource};
pub use runner::{RunError, ScriptRunner, DEFAULT_TIMEOUT};
pub use wrapper::WrapperScript;
