//! Path layout of a SteamCMD installation.
//!
//! Everything SteamCMD owns lives under one binary directory:
//!
//! - Linux/macOS: `{binary_dir}/steamcmd.sh`
//! - Windows: `{binary_dir}\steamcmd.exe`
//!
//! The downloaded archive is written next to it and removed after extraction.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::catalog::steamcmd_download;
use super::types::{Platform, ToolDownload};

/// Resolved locations for one SteamCMD installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteamCmdPaths {
    binary_dir: PathBuf,
    platform: Platform,
}

impl SteamCmdPaths {
    pub fn new(binary_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            binary_dir: binary_dir.into(),
            platform,
        }
    }

    /// Directory SteamCMD is installed into.
    pub fn binary_dir(&self) -> &Path {
        &self.binary_dir
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Download definition for this platform.
    pub fn download(&self) -> &'static ToolDownload {
        steamcmd_download(self.platform)
    }

    /// Path of the executable that gets spawned.
    pub fn executable(&self) -> PathBuf {
        self.binary_dir.join(self.download().executable)
    }

    /// Temporary location of the downloaded archive.
    pub fn archive(&self) -> PathBuf {
        let extension = self
            .download()
            .archive_format()
            .map(|f| f.extension())
            .unwrap_or("archive");
        self.binary_dir.join(format!("steamcmd.{}", extension))
    }

    /// True when the executable exists on disk.
    pub fn is_installed(&self) -> bool {
        self.executable().is_file()
    }

    /// Creates the binary directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or one of its parents cannot be
    /// created.
    pub fn ensure_binary_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.binary_dir).with_context(|| {
            format!("Failed to create directory: {}", self.binary_dir.display())
        })
    }
}
