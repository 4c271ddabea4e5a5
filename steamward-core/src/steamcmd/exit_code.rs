//! SteamCMD exit code semantics.
//!
//! The table is not exhaustive; SteamCMD does not document its codes.

use serde::Serialize;
use thiserror::Error;

/// Exit codes with a known meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownExitCode {
    NoError,
    /// Also seen when the process was killed.
    UnknownError,
    AlreadyLoggedIn,
    NoConnection,
    InvalidPassword,
    /// Returned on the first run after a fresh download. Meaning unknown.
    Initialized,
    /// Not owned, no disk space, network error, or platform unsupported.
    FailedToInstall,
    MissingParametersOrNotLoggedIn,
    SteamGuardCodeRequired,
}

impl KnownExitCode {
    pub const ALL: [KnownExitCode; 9] = [
        Self::NoError,
        Self::UnknownError,
        Self::AlreadyLoggedIn,
        Self::NoConnection,
        Self::InvalidPassword,
        Self::Initialized,
        Self::FailedToInstall,
        Self::MissingParametersOrNotLoggedIn,
        Self::SteamGuardCodeRequired,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.code() == code)
    }

    pub const fn code(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::UnknownError => 1,
            Self::AlreadyLoggedIn => 2,
            Self::NoConnection => 3,
            Self::InvalidPassword => 5,
            Self::Initialized => 7,
            Self::FailedToInstall => 8,
            Self::MissingParametersOrNotLoggedIn => 10,
            Self::SteamGuardCodeRequired => 63,
        }
    }

    /// Fixed message, or `None` where the generic unknown text applies.
    fn message(self) -> Option<&'static str> {
        match self {
            Self::NoError => Some("No error"),
            Self::UnknownError => Some("An unknown error occurred"),
            Self::AlreadyLoggedIn => Some("A user was already logged into SteamCMD"),
            Self::NoConnection => Some("SteamCMD cannot connect to the internet"),
            Self::InvalidPassword => Some("Invalid password"),
            Self::Initialized => None,
            Self::FailedToInstall => Some(
                "The application failed to install for some reason. Reasons include: \
                 you do not own the application, you do not have enough hard drive space, \
                 a network error occurred, or the application is not available for your \
                 selected platform.",
            ),
            Self::MissingParametersOrNotLoggedIn => {
                Some("One of your commands has missing parameters or you are not logged in")
            }
            Self::SteamGuardCodeRequired => Some("A Steam Guard code was required to log in"),
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::NoError | Self::Initialized)
    }
}

/// A mapped, non-success SteamCMD exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message} (exit code {code})")]
pub struct DomainError {
    pub code: i32,
    pub message: String,
}

impl DomainError {
    pub fn known(&self) -> Option<KnownExitCode> {
        KnownExitCode::from_code(self.code)
    }
}

/// Terminal result of a SteamCMD run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    DomainError(DomainError),
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn into_result(self) -> Result<(), DomainError> {
        match self {
            Self::Success => Ok(()),
            Self::DomainError(error) => Err(error),
        }
    }
}

/// Message for any exit code, tabled or not.
pub fn exit_message(code: i32) -> String {
    KnownExitCode::from_code(code)
        .and_then(KnownExitCode::message)
        .map(str::to_string)
        .unwrap_or_else(|| format!("An unknown error occurred. Exit code: {}", code))
}

/// Maps a raw exit code onto success or a [`DomainError`].
pub fn translate(code: i32) -> ExitOutcome {
    match KnownExitCode::from_code(code) {
        Some(known) if known.is_success() => ExitOutcome::Success,
        _ => ExitOutcome::DomainError(DomainError {
            code,
            message: exit_message(code),
        }),
    }
}
