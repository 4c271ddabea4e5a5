//! Subprocess supervision.
//!
//! - `command`: immutable invocation description
//! - `normalize`: raw PTY bytes to clean lines
//! - `supervisor`: one-at-a-time PTY runner with line and exit channels

pub mod command;
pub mod normalize;
pub mod supervisor;

pub use command::Command;
pub use normalize::{normalize_line, strip_ansi, LineNormalizer};
pub use supervisor::{ProcessHandle, ProcessSupervisor, SpawnError, Terminated};
