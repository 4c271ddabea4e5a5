//! Runtime settings for the SteamCMD client.
//!
//! Resolved from `STEAMCMD_*` environment variables, or read from a JSON
//! file with the same field names. Missing values fall back to the
//! container layout defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::installer::Platform;

// =============================================================================
// Defaults
// =============================================================================

/// Dedicated server app installed when no id is given.
pub const DEFAULT_APP_ID: u32 = 2394010;

pub const DEFAULT_WORK_DIR: &str = "/data";
pub const DEFAULT_HOME_DIR: &str = "/home/steam";
pub const DEFAULT_USERNAME: &str = "anonymous";

// =============================================================================
// Environment variable names
// =============================================================================

pub const ENV_WORK_DIR: &str = "STEAMCMD_WORKDIR";
pub const ENV_HOME_DIR: &str = "STEAMCMD_HOMEDIR";
pub const ENV_BINARY_DIR: &str = "STEAMCMD_BINARYDIR";
pub const ENV_INSTALL_DIR: &str = "STEAMCMD_INSTALLDIR";
pub const ENV_USERNAME: &str = "STEAMCMD_USERNAME";
pub const ENV_APP_ID: &str = "STEAMCMD_APP_ID";
pub const ENV_LANGUAGE: &str = "STEAMCMD_APP_LANGUAGE";
pub const ENV_BETA_NAME: &str = "STEAMCMD_APP_BETA_NAME";
pub const ENV_BETA_PASSWORD: &str = "STEAMCMD_APP_BETA_PASSWORD";
pub const ENV_PLATFORM: &str = "STEAMCMD_APP_PLATFORM";
pub const ENV_PLATFORM_BITNESS: &str = "STEAMCMD_APP_PLATFORM_BITNESS";
pub const ENV_ARCHIVE_SHA256: &str = "STEAMCMD_ARCHIVE_SHA256";
const DEBUG_VARS: [&str; 2] = ["PW_DEBUG", "DEBUG"];

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be an absolute path, got {}", path.display())]
    RelativePath { field: &'static str, path: PathBuf },

    #[error("Unsupported platform bitness {0}, expected 32 or 64")]
    InvalidBitness(u8),

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("archive_sha256 must be 64 hex digits, got {0:?}")]
    InvalidChecksum(String),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Settings
// =============================================================================

/// Where SteamCMD lives, what it installs, and how.
///
/// Deserializing goes through the same directory derivation as the
/// environment: an omitted `binary_dir` or `install_dir` follows the
/// `home_dir` or `work_dir` given in the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SettingsFile")]
pub struct Settings {
    /// Base data directory.
    pub work_dir: PathBuf,

    /// Home of the steam user.
    pub home_dir: PathBuf,

    /// SteamCMD installation directory.
    pub binary_dir: PathBuf,

    /// Where the application gets installed (`force_install_dir`).
    pub install_dir: PathBuf,

    pub username: String,

    pub app_id: u32,

    pub language: Option<String>,
    pub beta_name: Option<String>,
    pub beta_password: Option<String>,

    /// Platform forced on `app_update`. `None` lets SteamCMD decide.
    pub platform: Option<Platform>,

    pub platform_bitness: Option<u8>,

    /// Pinned SHA-256 of the SteamCMD archive. Unset skips verification.
    pub archive_sha256: Option<String>,

    /// Verbose logging, including raw SteamCMD output.
    pub debug: bool,
}

/// On-disk shape of [`Settings`]; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    work_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    binary_dir: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    username: Option<String>,
    app_id: Option<u32>,
    language: Option<String>,
    beta_name: Option<String>,
    beta_password: Option<String>,
    platform: Option<Platform>,
    platform_bitness: Option<u8>,
    archive_sha256: Option<String>,
    debug: Option<bool>,
}

impl From<SettingsFile> for Settings {
    fn from(file: SettingsFile) -> Self {
        let mut settings = Self::from_dirs(
            file.work_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
            file.home_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR)),
        );
        if let Some(dir) = file.binary_dir {
            settings.binary_dir = dir;
        }
        if let Some(dir) = file.install_dir {
            settings.install_dir = dir;
        }
        if let Some(username) = file.username {
            settings.username = username;
        }
        if let Some(app_id) = file.app_id {
            settings.app_id = app_id;
        }
        if file.platform.is_some() {
            settings.platform = file.platform;
        }
        settings.language = file.language;
        settings.beta_name = file.beta_name;
        settings.beta_password = file.beta_password;
        settings.platform_bitness = file.platform_bitness;
        settings.archive_sha256 = file.archive_sha256;
        settings.debug = file.debug.unwrap_or(false);
        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_dirs(PathBuf::from(DEFAULT_WORK_DIR), PathBuf::from(DEFAULT_HOME_DIR))
    }
}

impl Settings {
    fn from_dirs(work_dir: PathBuf, home_dir: PathBuf) -> Self {
        Self {
            binary_dir: home_dir.join("steamcmd"),
            install_dir: work_dir.join("server"),
            work_dir,
            home_dir,
            username: DEFAULT_USERNAME.to_string(),
            app_id: DEFAULT_APP_ID,
            language: None,
            beta_name: None,
            beta_password: None,
            platform: Platform::detect(),
            platform_bitness: None,
            archive_sha256: None,
            debug: false,
        }
    }

    /// Resolves settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let work_dir = get(ENV_WORK_DIR).map_or_else(|| PathBuf::from(DEFAULT_WORK_DIR), PathBuf::from);
        let home_dir = get(ENV_HOME_DIR).map_or_else(|| PathBuf::from(DEFAULT_HOME_DIR), PathBuf::from);
        let mut settings = Self::from_dirs(work_dir, home_dir);

        if let Some(dir) = get(ENV_BINARY_DIR) {
            settings.binary_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(ENV_INSTALL_DIR) {
            settings.install_dir = PathBuf::from(dir);
        }
        if let Some(username) = get(ENV_USERNAME) {
            settings.username = username;
        }
        if let Some(raw) = get(ENV_APP_ID) {
            match raw.parse() {
                Ok(id) => settings.app_id = id,
                Err(_) => warn!(value = %raw, "Invalid {}, using {}", ENV_APP_ID, DEFAULT_APP_ID),
            }
        }
        settings.language = get(ENV_LANGUAGE);
        settings.beta_name = get(ENV_BETA_NAME);
        settings.beta_password = get(ENV_BETA_PASSWORD);

        if let Some(raw) = get(ENV_PLATFORM) {
            match raw.parse::<Platform>() {
                Ok(platform) => settings.platform = Some(platform),
                Err(e) => warn!("{}, using detected platform", e),
            }
        }
        if let Some(raw) = get(ENV_PLATFORM_BITNESS) {
            match raw.parse() {
                Ok(bitness) => settings.platform_bitness = Some(bitness),
                Err(_) => warn!(value = %raw, "Invalid {}, ignoring", ENV_PLATFORM_BITNESS),
            }
        }

        settings.archive_sha256 = get(ENV_ARCHIVE_SHA256);
        settings.debug = debug_enabled(&lookup);

        settings
    }

    /// Reads settings from a JSON file.
    ///
    /// Absent fields resolve exactly as unset environment variables do.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects relative directories, empty usernames, unknown bitness and
    /// malformed archive digests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dirs = [
            ("work_dir", &self.work_dir),
            ("home_dir", &self.home_dir),
            ("binary_dir", &self.binary_dir),
            ("install_dir", &self.install_dir),
        ];
        for (field, path) in dirs {
            if !path.is_absolute() {
                return Err(ConfigError::RelativePath {
                    field,
                    path: path.clone(),
                });
            }
        }

        if self.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }

        if let Some(digest) = &self.archive_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidChecksum(digest.clone()));
            }
        }

        match self.platform_bitness {
            None | Some(32) | Some(64) => Ok(()),
            Some(other) => Err(ConfigError::InvalidBitness(other)),
        }
    }
}

/// True when `PW_DEBUG` or `DEBUG` is set to a truthy value.
pub fn debug_enabled<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    DEBUG_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .any(|value| is_truthy(value.trim()))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
