//! Values produced and consumed by the SteamCMD client.

use serde::{Deserialize, Serialize};

use crate::installer::Platform;

/// Stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressState {
    Checking,
    Downloading,
    DownloadProgress,
    Verifying,
    Extracting,
    Completed,
}

/// One structured progress record derived from tool output or bootstrap work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub state: ProgressState,
    pub message: String,
    pub indent_level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_done: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_total: Option<u64>,
}

impl ProgressEvent {
    /// Event with no numeric fields.
    pub fn new(state: ProgressState, message: impl Into<String>, indent_level: usize) -> Self {
        Self {
            state,
            message: message.into(),
            indent_level,
            percent: None,
            bytes_done: None,
            bytes_total: None,
        }
    }

    pub fn with_progress(mut self, percent: Option<f64>, bytes_done: u64, bytes_total: Option<u64>) -> Self {
        self.percent = percent.map(|p| p.clamp(0.0, 100.0));
        self.bytes_done = Some(bytes_done);
        self.bytes_total = bytes_total;
        self
    }
}

/// Result of an app info query. Parsed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub id: u32,
    pub installed: bool,
}

/// Per-call modifiers for `app_update`. Unset fields use the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateOptions {
    pub validate: Option<bool>,
    pub language: Option<String>,
    pub beta_name: Option<String>,
    pub beta_password: Option<String>,
    pub platform: Option<Platform>,
    pub platform_bitness: Option<u8>,
}

/// What an update run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    /// Every decoded event, completion included.
    pub events: usize,
    /// Download and verify progress events only.
    pub progress_events: usize,
}

impl UpdateSummary {
    /// No download or verify progress was reported, so nothing had to change.
    pub fn is_up_to_date(&self) -> bool {
        self.progress_events == 0
    }
}

/// Where the tool bootstrap currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootstrapState {
    NotChecked,
    Fetching,
    Extracting,
    WarmingUp,
    Ready,
    Failed,
}

impl BootstrapState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}
