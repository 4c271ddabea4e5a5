//! SteamCMD supervision.
//!
//! # Architecture
//!
//! - `args`: idempotent argument assembly (`+`-prefixed directives)
//! - `decoder`: ordered rule table turning output lines into progress events
//! - `exit_code`: exit code table and translation
//! - `client`: bootstrap, app info and app update on top of the above
//!
//! Data flows client → args → process supervisor → decoder → caller, and the
//! exit code is translated once the run ends.

pub mod args;
pub mod client;
pub mod decoder;
pub mod error;
pub mod exit_code;
pub mod format;
pub mod types;

pub use args::{build_arguments, CommandBuilder};
pub use client::{RunOutput, SteamCmdClient};
pub use decoder::OutputDecoder;
pub use error::{Result, SteamCmdError};
pub use exit_code::{exit_message, translate, DomainError, ExitOutcome, KnownExitCode};
pub use format::bytes_to_size;
pub use types::{
    AppInfo, BootstrapState, ProgressEvent, ProgressState, UpdateOptions, UpdateSummary,
};
