//! Streaming SteamCMD archive download.
//!
//! Only HTTPS URLs on Valve's CDN hosts are fetched. The archive is hashed
//! while it is written, so a pinned SHA-256 is checked without reading the
//! file a second time. The [`ToolFetcher`] trait is the seam the SteamCMD
//! client uses, so the network can be replaced (tests hand out local
//! archives).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

/// Hosts SteamCMD archives may come from. Subdomains match too.
const TRUSTED_HOSTS: &[&str] = &[
    "steamcdn-a.akamaihd.net",
    "steamcdn-a.akamaized.net",
    "steampowered.com",
];

// ============================================================================
// Source Checks
// ============================================================================

/// Parses `raw` and rejects anything that is not HTTPS on a trusted host.
///
/// # Errors
///
/// Returns an error for unparsable URLs, non-HTTPS schemes, URLs without a
/// host, and hosts outside the trusted list.
pub fn check_source(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))?;

    if url.scheme() != "https" {
        anyhow::bail!("SteamCMD must be downloaded over HTTPS, got {}", raw);
    }

    match url.host_str() {
        Some(host) if is_trusted_host(host) => Ok(url),
        Some(host) => anyhow::bail!("Refusing to download SteamCMD from untrusted host {}", host),
        None => anyhow::bail!("URL has no host: {}", raw),
    }
}

fn is_trusted_host(host: &str) -> bool {
    TRUSTED_HOSTS.iter().any(|trusted| {
        host.strip_suffix(trusted)
            .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with('.'))
    })
}

// ============================================================================
// Progress
// ============================================================================

/// Bytes received so far for one archive download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    /// From `Content-Length`, when the server sends one.
    pub total_bytes: Option<u64>,
    /// 0.0 to 100.0; `None` while the total is unknown.
    pub percent: Option<f64>,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| match total {
            0 => 0.0,
            total => bytes_downloaded as f64 * 100.0 / total as f64,
        });
        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Archive Writer
// ============================================================================

/// Destination file plus a running SHA-256 of everything written to it.
struct ArchiveWriter {
    path: PathBuf,
    file: File,
    hasher: Sha256,
    written: u64,
}

impl ArchiveWriter {
    async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            hasher: Sha256::new(),
            written: 0,
        })
    }

    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.hasher.update(chunk);
        self.file
            .write_all(chunk)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flushes the file and checks it against `expected_sha256`.
    ///
    /// A mismatching file is deleted so a later bootstrap starts clean.
    async fn finish(mut self, expected_sha256: Option<&str>) -> Result<u64> {
        self.file.flush().await.context("Failed to flush archive")?;
        drop(self.file);

        let Some(expected) = expected_sha256 else {
            return Ok(self.written);
        };
        let actual = hex_digest(&self.hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            if let Err(e) = tokio::fs::remove_file(&self.path).await {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
            anyhow::bail!(
                "SHA-256 mismatch for {}: expected {}, got {}",
                self.path.display(),
                expected.trim(),
                actual
            );
        }
        debug!(sha256 = %actual, "Archive checksum verified");
        Ok(self.written)
    }
}

fn hex_digest(hash: &[u8]) -> String {
    use std::fmt::Write;

    hash.iter().fold(String::with_capacity(hash.len() * 2), |mut out, byte| {
        let _ = write!(out, "{:02x}", byte);
        out
    })
}

// ============================================================================
// Fetcher Seam
// ============================================================================

/// Fetches a remote archive to a local path.
#[async_trait]
pub trait ToolFetcher: Send + Sync {
    /// Downloads `url` to `dest`, reporting progress, and returns the byte count.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        progress_cb: &(dyn Fn(DownloadProgress) + Send + Sync),
    ) -> Result<u64>;
}

/// Fetcher that streams over HTTPS with a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ToolFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        progress_cb: &(dyn Fn(DownloadProgress) + Send + Sync),
    ) -> Result<u64> {
        download_with(&self.client, url, dest, expected_sha256, progress_cb).await
    }
}

// ============================================================================
// Download
// ============================================================================

/// Streams `url` into `dest` with a one-off client.
///
/// # Arguments
///
/// * `url` - HTTPS URL on a trusted Valve host.
/// * `dest` - Archive path. Parent directories are created.
/// * `expected_sha256` - Hex digest to verify, if pinned. Case is ignored.
/// * `progress_cb` - Called once before the first chunk and after every chunk.
///
/// # Errors
///
/// Returns an error if the URL fails [`check_source`], the request fails or
/// answers with a non-success status, the file cannot be written, or the
/// digest does not match. The file is removed on a digest mismatch.
pub async fn download_file<F>(
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    progress_cb: F,
) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    download_with(&reqwest::Client::new(), url, dest, expected_sha256, progress_cb).await
}

async fn download_with<F>(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    progress_cb: F,
) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    let url = check_source(url)?;
    info!(url = %url, dest = %dest.display(), "Downloading SteamCMD archive");

    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Download of {} failed", url))?;

    let total_bytes = response.content_length();
    let mut writer = ArchiveWriter::create(dest).await?;
    progress_cb(DownloadProgress::new(0, total_bytes));

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Connection to {} dropped", url))?;
        writer.write(&chunk).await?;
        progress_cb(DownloadProgress::new(writer.written, total_bytes));
    }

    let written = writer.finish(expected_sha256).await?;
    info!(bytes = written, "Download complete");
    Ok(written)
}
