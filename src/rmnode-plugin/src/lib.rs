//! The NodeJS skin plugin.
//!
//! [`Measure`] holds the per-measure state machine and is generic over
//! [`rmnode_core::Host`], so it runs the same against the real host and
//! against [`rmnode_core::MemoryHost`]. On Windows the crate also builds as
//! `nodejs.dll` with the plugin exports.

pub mod measure;
pub mod settings;

#[cfg(windows)]
mod ffi;
#[cfg(windows)]
mod rainmeter;
#[cfg(windows)]
mod runtime;

pub use measure::{parse_number, Measure, MeasureState, NOT_FOUND_STATUS, NOT_INITIALIZED_STATUS};
pub use settings::{MeasureOptions, SourceError, MAX_LINES};
