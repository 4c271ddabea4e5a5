//! Core types for the SteamCMD installer.
//!
//! Platform detection, archive formats, and the per-platform download
//! definitions used when SteamCMD has to be fetched.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Platform Detection
// ============================================================================

/// Operating system family understood by SteamCMD.
///
/// SteamCMD ships one build per OS family, so the architecture is irrelevant
/// here. The same values are accepted by `@sSteamCmdForcePlatformType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// Detects the current platform at compile time.
    ///
    /// Returns `None` on targets SteamCMD does not support.
    pub fn detect() -> Option<Self> {
        #[cfg(target_os = "linux")]
        {
            Some(Platform::Linux)
        }
        #[cfg(target_os = "macos")]
        {
            Some(Platform::Macos)
        }
        #[cfg(target_os = "windows")]
        {
            Some(Platform::Windows)
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            None
        }
    }

    /// Returns the platform type string SteamCMD expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "macOS",
            Self::Windows => "Windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "osx" | "darwin" => Ok(Self::Macos),
            "windows" | "win32" | "win64" => Ok(Self::Windows),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

// ============================================================================
// Archive Format
// ============================================================================

/// Archive format of a downloaded SteamCMD package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// ZIP archive (.zip)
    Zip,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or filename.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// File extension used for the temporary download.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

// ============================================================================
// Download Definition
// ============================================================================

/// Where to fetch SteamCMD for one platform and what it unpacks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDownload {
    /// The download URL.
    pub url: &'static str,
    /// Executable file name inside the extracted archive.
    pub executable: &'static str,
}

impl ToolDownload {
    pub const fn new(url: &'static str, executable: &'static str) -> Self {
        Self { url, executable }
    }

    /// Archive format inferred from the URL.
    pub fn archive_format(&self) -> Option<ArchiveFormat> {
        ArchiveFormat::from_url(self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
        assert!(platform.is_some());
        #[cfg(target_os = "linux")]
        assert_eq!(platform, Some(Platform::Linux));
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("linux".parse::<Platform>(), Ok(Platform::Linux));
        assert_eq!(" MacOS ".parse::<Platform>(), Ok(Platform::Macos));
        assert_eq!("osx".parse::<Platform>(), Ok(Platform::Macos));
        assert_eq!("Windows".parse::<Platform>(), Ok(Platform::Windows));
        assert!("amiga".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_display_matches_steamcmd_values() {
        assert_eq!(Platform::Linux.to_string(), "linux");
        assert_eq!(Platform::Macos.to_string(), "macos");
        assert_eq!(Platform::Windows.to_string(), "windows");
    }

    #[test]
    fn test_archive_format_from_url() {
        assert_eq!(
            ArchiveFormat::from_url("https://example.com/steamcmd_linux.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_url("https://example.com/tool.tgz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_url("https://example.com/steamcmd.ZIP"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_url("https://example.com/tool.dmg"), None);
    }

    #[test]
    fn test_tool_download_format() {
        let download = ToolDownload::new("https://example.com/steamcmd.zip", "steamcmd.exe");
        assert_eq!(download.archive_format(), Some(ArchiveFormat::Zip));
        assert_eq!(download.executable, "steamcmd.exe");
    }
}
