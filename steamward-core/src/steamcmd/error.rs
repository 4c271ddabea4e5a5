use thiserror::Error;

use super::exit_code::DomainError;
use crate::process::{SpawnError, Terminated};

/// Failure of a client operation.
#[derive(Debug, Error)]
pub enum SteamCmdError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// SteamCMD exited with a mapped, non-success code.
    #[error("SteamCMD failed: {0}")]
    Domain(#[from] DomainError),

    /// Another operation superseded this run, or it was terminated.
    #[error(transparent)]
    Terminated(#[from] Terminated),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetching or unpacking SteamCMD failed.
    #[error("SteamCMD installation failed: {0:#}")]
    Install(#[from] anyhow::Error),

    #[error("Platform \"{0}\" is not supported")]
    UnsupportedPlatform(String),
}

impl SteamCmdError {
    /// Exit code behind a domain failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Domain(error) => Some(error.code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SteamCmdError>;
