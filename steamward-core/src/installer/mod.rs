//! SteamCMD installation on demand.
//!
//! SteamCMD is not bundled. When its executable is missing, the official
//! archive for the current platform is downloaded next to where the
//! executable should live, unpacked in place, and deleted again.
//!
//! # Architecture
//!
//! - `types`: Platform and archive format types
//! - `catalog`: Static per-platform download definitions
//! - `paths`: Install layout derived from the configured binary directory
//! - `downloader`: Async file download with progress reporting and an
//!   optional pinned SHA-256
//! - `extractor`: Archive extraction (zip, tar.gz)

pub mod catalog;
pub mod downloader;
pub mod extractor;
pub mod paths;
pub mod types;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub use catalog::steamcmd_download;
pub use downloader::{check_source, download_file, DownloadProgress, HttpFetcher, ToolFetcher};
pub use extractor::{extract_archive, make_executable};
pub use paths::SteamCmdPaths;
pub use types::{ArchiveFormat, Platform, ToolDownload};

/// Downloads the SteamCMD archive for `paths` and returns the byte count.
///
/// # Arguments
///
/// * `fetcher` - Transport used for the download.
/// * `paths` - Install layout; the archive lands next to the executable.
/// * `expected_sha256` - Digest the archive must match, if one is pinned.
/// * `progress_cb` - Receives download progress.
///
/// # Errors
///
/// Returns an error if the binary directory cannot be created or the
/// fetcher fails, including on a digest mismatch.
pub async fn fetch_archive(
    fetcher: &dyn ToolFetcher,
    paths: &SteamCmdPaths,
    expected_sha256: Option<&str>,
    progress_cb: &(dyn Fn(DownloadProgress) + Send + Sync),
) -> Result<u64> {
    let download = paths.download();
    paths.ensure_binary_dir()?;

    info!(
        "Fetching SteamCMD for {} from {}",
        paths.platform().display_name(),
        download.url
    );
    fetcher
        .fetch(download.url, &paths.archive(), expected_sha256, progress_cb)
        .await
}

/// Unpacks a previously fetched archive and prepares the executable.
///
/// The archive is removed afterwards; failing to remove it only warns.
///
/// # Errors
///
/// Returns an error if the archive format is unknown, extraction fails, or
/// the archive did not contain the SteamCMD executable.
pub fn unpack_archive(paths: &SteamCmdPaths) -> Result<usize> {
    let archive = paths.archive();
    let format = paths.download().archive_format().ok_or_else(|| {
        anyhow::anyhow!("Unknown archive format for {}", paths.download().url)
    })?;

    let written = extract_archive(&archive, paths.binary_dir(), format)?;

    let executable = paths.executable();
    if !executable.is_file() {
        anyhow::bail!(
            "SteamCMD archive did not contain {}",
            paths.download().executable
        );
    }
    make_executable(&executable)
        .with_context(|| format!("Failed to prepare {}", executable.display()))?;

    if let Err(e) = std::fs::remove_file(&archive) {
        warn!("Failed to clean up archive {}: {}", archive.display(), e);
    }

    info!(files = written, "SteamCMD unpacked to {}", paths.binary_dir().display());
    Ok(written)
}
