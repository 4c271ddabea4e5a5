//! SteamCMD download catalog.
//!
//! Valve publishes a single rolling SteamCMD build per platform, so there are
//! no versions or checksums to pin here. SteamCMD updates itself on the
//! first run after extraction.

use super::types::{Platform, ToolDownload};

const LINUX_DOWNLOAD: ToolDownload = ToolDownload::new(
    "https://steamcdn-a.akamaihd.net/client/installer/steamcmd_linux.tar.gz",
    "steamcmd.sh",
);

const MACOS_DOWNLOAD: ToolDownload = ToolDownload::new(
    "https://steamcdn-a.akamaihd.net/client/installer/steamcmd_osx.tar.gz",
    "steamcmd.sh",
);

const WINDOWS_DOWNLOAD: ToolDownload = ToolDownload::new(
    "https://steamcdn-a.akamaihd.net/client/installer/steamcmd.zip",
    "steamcmd.exe",
);

/// Returns the SteamCMD download definition for a platform.
pub fn steamcmd_download(platform: Platform) -> &'static ToolDownload {
    match platform {
        Platform::Linux => &LINUX_DOWNLOAD,
        Platform::Macos => &MACOS_DOWNLOAD,
        Platform::Windows => &WINDOWS_DOWNLOAD,
    }
}
