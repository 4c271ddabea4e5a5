//! Steamward Core Library
//!
//! Supervises SteamCMD for a dedicated game server. It includes:
//!
//! - PTY-backed subprocess supervision with normalized line output
//! - SteamCMD argument assembly, output decoding and exit code mapping
//! - A client for bootstrapping SteamCMD, querying and updating apps
//! - On-demand download and extraction of SteamCMD itself
//! - Configuration from the environment or a JSON file

pub mod config;
pub mod installer;
pub mod process;
pub mod steamcmd;

// Re-exports for convenience
pub use config::{ConfigError, Settings, DEFAULT_APP_ID};

// Re-export process supervision
pub use process::{Command, ProcessHandle, ProcessSupervisor, SpawnError, Terminated};

// Re-export the SteamCMD layer
pub use steamcmd::{
    build_arguments, translate, AppInfo, BootstrapState, CommandBuilder, DomainError,
    ExitOutcome, KnownExitCode, OutputDecoder, ProgressEvent, ProgressState, RunOutput,
    SteamCmdClient, SteamCmdError, UpdateOptions, UpdateSummary,
};

// Re-export installer seams
pub use installer::{HttpFetcher, Platform, ToolFetcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn exports_are_accessible() {
        fn _check_types(
            _settings: &Settings,
            _command: &Command,
            _supervisor: &ProcessSupervisor,
            _handle: &ProcessHandle,
            _builder: &CommandBuilder,
            _decoder: &OutputDecoder,
            _client: &SteamCmdClient,
            _fetcher: &HttpFetcher,
            _event: &ProgressEvent,
            _outcome: &ExitOutcome,
        ) {
        }
    }

    #[test]
    fn client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SteamCmdClient>();
        assert_send_sync::<ProcessSupervisor>();
    }
}
