//! The SteamCMD client.
//!
//! Built once from [`Settings`] and shared by reference. Owns the one
//! [`ProcessSupervisor`] its operations run through, so starting an
//! operation while another is still running supersedes the older one.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::args::{loggable_arguments, CommandBuilder};
use super::decoder::OutputDecoder;
use super::error::{Result, SteamCmdError};
use super::exit_code::{translate, ExitOutcome, KnownExitCode};
use super::format::bytes_to_size;
use super::types::{AppInfo, BootstrapState, ProgressEvent, ProgressState, UpdateOptions, UpdateSummary};
use crate::config::Settings;
use crate::installer::{self, DownloadProgress, HttpFetcher, Platform, SteamCmdPaths, ToolFetcher};
use crate::process::{ProcessHandle, ProcessSupervisor};

static INSTALL_STATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"install state:\s+(.*)").expect("valid install state regex"));

/// Everything a finished run printed, plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub lines: Vec<String>,
    pub exit_code: i32,
    pub outcome: ExitOutcome,
}

impl RunOutput {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct SteamCmdClient {
    settings: Settings,
    paths: SteamCmdPaths,
    builder: CommandBuilder,
    supervisor: ProcessSupervisor,
    decoder: OutputDecoder,
    fetcher: Arc<dyn ToolFetcher>,
    state: StdMutex<BootstrapState>,
}

impl SteamCmdClient {
    /// Client that downloads SteamCMD over HTTPS when needed.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_fetcher(settings, Arc::new(HttpFetcher::new()))
    }

    /// Client with a custom download collaborator.
    pub fn with_fetcher(settings: Settings, fetcher: Arc<dyn ToolFetcher>) -> Result<Self> {
        let host = Platform::detect()
            .ok_or_else(|| SteamCmdError::UnsupportedPlatform(std::env::consts::OS.to_string()))?;
        let paths = SteamCmdPaths::new(settings.binary_dir.clone(), host);
        let builder = CommandBuilder::new(paths.executable(), paths.binary_dir());

        Ok(Self {
            settings,
            paths,
            builder,
            supervisor: ProcessSupervisor::new(),
            decoder: OutputDecoder::new(),
            fetcher,
            state: StdMutex::new(BootstrapState::NotChecked),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> &SteamCmdPaths {
        &self.paths
    }

    pub fn bootstrap_state(&self) -> BootstrapState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: BootstrapState) {
        debug!(?state, "Bootstrap state");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// Makes sure SteamCMD is installed and has completed its first run.
    pub async fn bootstrap<F>(&self, on_event: F) -> Result<()>
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        self.set_state(BootstrapState::NotChecked);
        match self.bootstrap_steps(&on_event).await {
            Ok(()) => {
                self.set_state(BootstrapState::Ready);
                info!("SteamCMD is ready");
                Ok(())
            }
            Err(e) => {
                self.set_state(BootstrapState::Failed);
                warn!("SteamCMD bootstrap failed: {}", e);
                Err(e)
            }
        }
    }

    async fn bootstrap_steps<F>(&self, on_event: &F) -> Result<()>
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        on_event(ProgressEvent::new(ProgressState::Checking, "Checking SteamCMD...", 0));
        self.paths.ensure_binary_dir()?;

        if !self.paths.is_installed() {
            self.set_state(BootstrapState::Fetching);
            on_event(ProgressEvent::new(ProgressState::Downloading, "Downloading SteamCMD...", 1));
            let report = |progress: DownloadProgress| on_event(download_event(&progress));
            installer::fetch_archive(
                self.fetcher.as_ref(),
                &self.paths,
                self.settings.archive_sha256.as_deref(),
                &report,
            )
            .await?;

            self.set_state(BootstrapState::Extracting);
            on_event(ProgressEvent::new(ProgressState::Extracting, "Extracting SteamCMD...", 1));
            let paths = self.paths.clone();
            tokio::task::spawn_blocking(move || installer::unpack_archive(&paths))
                .await
                .map_err(|e| anyhow::anyhow!("Extraction task failed: {}", e))??;
            on_event(ProgressEvent::new(
                ProgressState::Completed,
                "Installation of SteamCMD has been completed.",
                1,
            ));
        } else {
            debug!(executable = %self.paths.executable().display(), "SteamCMD already installed");
        }

        self.set_state(BootstrapState::WarmingUp);
        on_event(ProgressEvent::new(ProgressState::Checking, "Updating SteamCMD...", 0));
        let output = self.run_collect(&["help"], false).await?;
        if output.exit_code == KnownExitCode::Initialized.code() {
            debug!("SteamCMD reported its first-run exit code");
        }
        output.outcome.into_result()?;
        Ok(())
    }

    // =========================================================================
    // App info
    // =========================================================================

    /// Queries whether `app_id` (default: the configured app) is fully installed.
    pub async fn app_info(&self, app_id: Option<u32>) -> Result<AppInfo> {
        let id = app_id.unwrap_or(self.settings.app_id);
        let output = self
            .run_collect(
                &[
                    "app_info_update 1".to_string(),
                    format!("app_info_print {}", id),
                    format!("app_status {}", id),
                ],
                true,
            )
            .await?;
        self.note_exit(output.exit_code, "app_info");
        let installed = parse_installed(&output.text());
        output.outcome.into_result()?;

        info!(app_id = id, installed, "App info");
        Ok(AppInfo { id, installed })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Installs or updates `app_id`, passing each decoded event to `on_event`.
    pub async fn update_app<F>(
        &self,
        app_id: Option<u32>,
        options: &UpdateOptions,
        on_event: F,
    ) -> Result<UpdateSummary>
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        let id = app_id.unwrap_or(self.settings.app_id);
        let script = update_script(id, options, &self.settings);
        info!(app_id = id, "Updating app");

        let mut handle = self.run(&script, true)?;
        let mut summary = UpdateSummary::default();
        while let Some(line) = handle.next_line().await {
            debug!(target: "steamward::steamcmd::output", "{}", line);
            if let Some(event) = self.decoder.decode(&line) {
                summary.events += 1;
                if matches!(event.state, ProgressState::DownloadProgress | ProgressState::Verifying) {
                    summary.progress_events += 1;
                }
                on_event(event);
            }
        }

        let code = handle.wait().await?;
        self.note_exit(code, "app_update");
        translate(code).into_result()?;

        if summary.is_up_to_date() {
            info!(app_id = id, "App is already up to date");
        }
        Ok(summary)
    }

    // =========================================================================
    // Raw invocation
    // =========================================================================

    /// Starts SteamCMD with `args` and the standard directives.
    pub fn run<S: AsRef<str>>(&self, args: &[S], auto_login: bool) -> Result<ProcessHandle> {
        let command = self.builder.build(
            args,
            &self.settings.username,
            &self.settings.install_dir,
            auto_login,
        );
        debug!(
            executable = %command.executable().display(),
            args = %loggable_arguments(command.arguments()),
            "Running SteamCMD"
        );
        Ok(self.supervisor.run(&command)?)
    }

    /// Runs SteamCMD to completion and returns every line it printed.
    pub async fn run_collect<S: AsRef<str>>(&self, args: &[S], auto_login: bool) -> Result<RunOutput> {
        let mut handle = self.run(args, auto_login)?;
        let mut lines = Vec::new();
        while let Some(line) = handle.next_line().await {
            debug!(target: "steamward::steamcmd::output", "{}", line);
            lines.push(line);
        }
        let exit_code = handle.wait().await?;
        debug!(code = exit_code, "SteamCMD exited");

        Ok(RunOutput {
            lines,
            exit_code,
            outcome: translate(exit_code),
        })
    }

    /// Kills the running SteamCMD, if any.
    pub fn terminate(&self) {
        self.supervisor.terminate();
    }

    fn note_exit(&self, code: i32, operation: &str) {
        if code == KnownExitCode::Initialized.code() {
            warn!(code, operation, "SteamCMD returned exit code 7 outside of bootstrap; treating it as success");
        }
    }
}

fn download_event(progress: &DownloadProgress) -> ProgressEvent {
    let message = match (progress.percent, progress.total_bytes) {
        (Some(percent), Some(total)) => format!(
            "{:.0}% - Downloading SteamCMD ({} of {})...",
            percent,
            bytes_to_size(progress.bytes_downloaded),
            bytes_to_size(total)
        ),
        _ => format!(
            "Downloading SteamCMD ({})...",
            bytes_to_size(progress.bytes_downloaded)
        ),
    };
    ProgressEvent::new(ProgressState::DownloadProgress, message, 2).with_progress(
        progress.percent.map(f64::round),
        progress.bytes_downloaded,
        progress.total_bytes,
    )
}

/// True when the `install state` field reports a full install.
fn parse_installed(text: &str) -> bool {
    INSTALL_STATE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .is_some_and(|state| state.as_str().trim().to_lowercase().contains("fully installed"))
}

/// SteamCMD script for `app_update`, with options falling back to `defaults`.
fn update_script(app_id: u32, options: &UpdateOptions, defaults: &Settings) -> Vec<String> {
    let mut script = Vec::new();

    if let Some(platform) = options.platform.or(defaults.platform) {
        script.push(format!("@sSteamCmdForcePlatformType \"{}\"", platform.as_str()));
    }
    if let Some(bitness) = options.platform_bitness.or(defaults.platform_bitness) {
        script.push(format!("@sSteamCmdForcePlatformBitness {}", bitness));
    }

    let mut update = format!("app_update {}", app_id);
    if options.validate.unwrap_or(false) {
        update.push_str(" -validate");
    }
    let language = options.language.as_ref().or(defaults.language.as_ref());
    if let Some(language) = language {
        update.push_str(&format!(" -language \"{}\"", language));
    }
    let beta_name = options.beta_name.as_ref().or(defaults.beta_name.as_ref());
    if let Some(beta) = beta_name {
        update.push_str(&format!(" -beta \"{}\"", beta));
    }
    let beta_password = options.beta_password.as_ref().or(defaults.beta_password.as_ref());
    if let Some(password) = beta_password {
        update.push_str(&format!(" -betapassword \"{}\"", password));
    }
    script.push(update);

    script
}
