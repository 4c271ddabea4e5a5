//! PTY-backed subprocess supervision.
//!
//! A [`ProcessSupervisor`] owns at most one live child. Starting a new run
//! tears the previous one down first: the child is killed, every line
//! receiver is closed and the exit sender is dropped, so anything awaiting
//! the old handle resolves instead of hanging.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::command::Command;
use super::normalize::LineNormalizer;

/// Terminal size handed to the child.
const PTY_ROWS: u16 = 30;
const PTY_COLS: u16 = 80;

/// `TERM` value used unless the command sets its own.
const DEFAULT_TERM: &str = "xterm-color";

const READ_BUFFER_SIZE: usize = 4096;

// =============================================================================
// Errors
// =============================================================================

/// The subprocess could not be started. No handle exists in this case.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("Executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to open pseudo-terminal: {0}")]
    Pty(String),

    #[error("Failed to spawn {executable}: {reason}")]
    Spawn { executable: String, reason: String },
}

/// The run was torn down before it reported an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Process was terminated before it exited")]
pub struct Terminated;

// =============================================================================
// Shared run state
// =============================================================================

/// State shared between the supervisor, the pump task and the handle.
struct LiveRun {
    subscribers: Vec<mpsc::UnboundedSender<String>>,
    exit_tx: Option<oneshot::Sender<i32>>,
    killer: Option<Box<dyn ChildKiller + Send + Sync>>,
    closed: bool,
}

impl LiveRun {
    fn publish(&mut self, line: &str) {
        self.subscribers.retain(|tx| tx.send(line.to_string()).is_ok());
    }

    fn add_subscriber(&mut self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.closed {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Kills the child and closes every channel without an exit code.
    fn tear_down(&mut self) {
        if self.closed {
            return;
        }
        if let Some(mut killer) = self.killer.take() {
            if let Err(e) = killer.kill() {
                debug!("Kill failed (process may have exited): {}", e);
            }
        }
        self.close_channels();
        self.exit_tx = None;
    }

    /// Closes line channels, then delivers the exit code.
    fn finish(&mut self, code: i32) {
        self.killer = None;
        self.close_channels();
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(code);
        }
    }

    fn close_channels(&mut self) {
        self.subscribers.clear();
        self.closed = true;
    }
}

fn lock(run: &StdMutex<LiveRun>) -> MutexGuard<'_, LiveRun> {
    run.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Handle
// =============================================================================

/// One spawned subprocess.
///
/// The primary line receiver is registered at spawn time and sees every
/// line. [`subscribe`](Self::subscribe) adds hot receivers that only see
/// lines published after they joined. Line receivers always close before
/// the exit code is delivered.
pub struct ProcessHandle {
    pid: Option<u32>,
    lines: mpsc::UnboundedReceiver<String>,
    exit_rx: oneshot::Receiver<i32>,
    run: Arc<StdMutex<LiveRun>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next normalized output line, or `None` once the run is over.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Additional receiver for lines published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<String> {
        lock(&self.run).add_subscriber()
    }

    /// Waits for the exit code.
    ///
    /// Resolves with [`Terminated`] if the run was superseded or terminated.
    pub async fn wait(self) -> Result<i32, Terminated> {
        self.exit_rx.await.map_err(|_| Terminated)
    }

    /// Drains every remaining line, then waits for the exit code.
    pub async fn collect(mut self) -> (Vec<String>, Result<i32, Terminated>) {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await {
            lines.push(line);
        }
        let exit = self.wait().await;
        (lines, exit)
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle").field("pid", &self.pid).finish()
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// Runs one subprocess at a time inside a pseudo-terminal.
#[derive(Default)]
pub struct ProcessSupervisor {
    current: StdMutex<Option<Arc<StdMutex<LiveRun>>>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `command`, superseding any run that is still live.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, command: &Command) -> Result<ProcessHandle, SpawnError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            info!("Superseding live process");
            lock(&previous).tear_down();
        }

        let executable = command.executable();
        if looks_like_path(executable) && !executable.exists() {
            return Err(SpawnError::NotFound(executable.to_path_buf()));
        }
        let executable_name = executable.display().to_string();

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: PTY_ROWS,
                cols: PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SpawnError::Pty(e.to_string()))?;

        let child = pair
            .slave
            .spawn_command(pty_command(command))
            .map_err(|e| SpawnError::Spawn {
                executable: executable_name.clone(),
                reason: e.to_string(),
            })?;
        // the child holds its own copy; ours would keep the PTY open past exit
        drop(pair.slave);

        let reader = match pair.master.try_clone_reader() {
            Ok(reader) => reader,
            Err(e) => {
                let mut killer = child.clone_killer();
                let _ = killer.kill();
                return Err(SpawnError::Pty(e.to_string()));
            }
        };

        let pid = child.process_id();
        info!(executable = %executable_name, pid = ?pid, "Spawned process");

        let (primary_tx, primary_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let run = Arc::new(StdMutex::new(LiveRun {
            subscribers: vec![primary_tx],
            exit_tx: Some(exit_tx),
            killer: Some(child.clone_killer()),
            closed: false,
        }));

        spawn_pump(run.clone(), reader, child, pair.master, executable_name);
        *current = Some(run.clone());

        Ok(ProcessHandle {
            pid,
            lines: primary_rx,
            exit_rx,
            run,
        })
    }

    /// Kills the live child, if any. Its handle resolves with [`Terminated`].
    pub fn terminate(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = current.take() {
            lock(&run).tear_down();
        }
    }

    /// True while a run has neither exited nor been torn down.
    pub fn is_running(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().is_some_and(|run| !lock(run).closed)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn looks_like_path(executable: &Path) -> bool {
    executable.components().count() > 1 || executable.is_absolute()
}

fn pty_command(command: &Command) -> CommandBuilder {
    let mut builder = CommandBuilder::new(command.executable());
    builder.args(command.arguments());
    if !command.working_dir().as_os_str().is_empty() {
        builder.cwd(command.working_dir());
    }
    for (key, value) in command.environment() {
        builder.env(key, value);
    }
    if !command.environment().contains_key("TERM") {
        builder.env("TERM", DEFAULT_TERM);
    }
    builder
}

/// Publishes PTY output while waiting for the child, then reports its code.
///
/// The master is dropped as soon as the child exits. ConPTY does not end
/// the output pipe before that; on Unix the cloned reader drains to EOF on
/// its own. Every line is published before the exit code goes out.
fn spawn_pump(
    run: Arc<StdMutex<LiveRun>>,
    reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    master: Box<dyn MasterPty + Send>,
    executable: String,
) {
    let output = tokio::spawn(publish_output(run.clone(), read_chunks(reader)));

    tokio::spawn(async move {
        let code = match tokio::task::spawn_blocking(move || child.wait()).await {
            Ok(Ok(status)) => i32::try_from(status.exit_code()).unwrap_or(i32::MAX),
            Ok(Err(e)) => {
                warn!(executable = %executable, "Failed to wait for process: {}", e);
                1
            }
            Err(e) => {
                warn!(executable = %executable, "Wait task failed: {}", e);
                1
            }
        };
        drop(master);

        if let Err(e) = output.await {
            warn!(executable = %executable, "Output task failed: {}", e);
        }
        debug!(executable = %executable, code, "Process exited");
        lock(&run).finish(code);
    });
}

/// Moves blocking PTY reads onto their own thread.
fn read_chunks(mut reader: Box<dyn Read + Send>) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(size) => {
                    if chunk_tx.send(buffer[..size].to_vec()).is_err() {
                        break;
                    }
                }
                // EIO is how Linux reports a closed slave side
                Err(e) => {
                    debug!("PTY read ended: {}", e);
                    break;
                }
            }
        }
    });

    chunk_rx
}

async fn publish_output(run: Arc<StdMutex<LiveRun>>, mut chunks: mpsc::UnboundedReceiver<Vec<u8>>) {
    let mut normalizer = LineNormalizer::new();

    while let Some(chunk) = chunks.recv().await {
        let lines = normalizer.push(&chunk);
        if lines.is_empty() {
            continue;
        }
        let mut state = lock(&run);
        for line in &lines {
            state.publish(line);
        }
    }
    if let Some(line) = normalizer.finish() {
        lock(&run).publish(&line);
    }
}
