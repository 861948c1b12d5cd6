//! Per-session subprocess supervisor.
//!
//! Owns at most one live assistant subprocess. Starting a turn wires the
//! stdout/stderr reader pumps to the caller's event channel; cancelling
//! sends the interrupt signal and escalates to a forced kill after the
//! grace window. Cancellation is reported successful to the caller as
//! soon as the kill path has been engaged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::protocol::event::StreamEvent;
use crate::protocol::reader::{run_reader, run_stderr_reader};
use crate::runner::args::{build_args, TurnMode};
use crate::runner::launcher::{LaunchSpec, ProcessLauncher};
use crate::{AppError, Result};

use std::path::PathBuf;

/// Supervises exactly one assistant subprocess per active turn.
pub struct ProcessSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    cli: CliConfig,
    workspace_root: PathBuf,
    /// Stable label for log correlation (the owning user id).
    label: String,
    running: Arc<AtomicBool>,
    /// Termination request for the currently running process, if any.
    kill_request: Mutex<Option<CancellationToken>>,
}

impl ProcessSupervisor {
    /// Create a supervisor with no live process.
    #[must_use]
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        cli: CliConfig,
        workspace_root: PathBuf,
        label: String,
    ) -> Self {
        Self {
            launcher,
            cli,
            workspace_root,
            label,
            running: Arc::new(AtomicBool::new(false)),
            kill_request: Mutex::new(None),
        }
    }

    /// Whether this supervisor currently owns a live process.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Launch one subprocess for `mode` and pump its output into
    /// `event_tx`.
    ///
    /// Exactly one subprocess results from a successful call; the reader
    /// and exit monitor run as background tasks. The supervisor is marked
    /// not-running again once the process exits.
    ///
    /// # Errors
    ///
    /// - [`AppError::AlreadyRunning`] when a live process is already owned.
    /// - [`AppError::Spawn`] when the launch itself fails; the supervisor
    ///   stays usable and a later call may retry.
    pub async fn start(
        &self,
        mode: &TurnMode,
        prompt: &str,
        event_tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::AlreadyRunning);
        }

        let spec = LaunchSpec {
            binary: self.cli.binary.clone(),
            args: build_args(mode, &self.cli.model, prompt),
            cwd: self.workspace_root.clone(),
        };

        let launched = match self.launcher.launch(spec).await {
            Ok(launched) => launched,
            Err(err) => {
                // Launch failure is fatal for this invocation only.
                self.running.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        let readers_cancel = CancellationToken::new();
        let kill = CancellationToken::new();
        *self.kill_request.lock().await = Some(kill.clone());

        info!(label = self.label, ?mode, "assistant turn started");

        tokio::spawn(run_reader(
            self.label.clone(),
            launched.stdout,
            event_tx.clone(),
            readers_cancel.clone(),
        ));
        tokio::spawn(run_stderr_reader(
            self.label.clone(),
            launched.stderr,
            event_tx,
            readers_cancel.clone(),
        ));

        tokio::spawn(monitor_process(
            self.label.clone(),
            launched.handle,
            Duration::from_secs(self.cli.grace_seconds),
            kill,
            readers_cancel,
            Arc::clone(&self.running),
        ));

        Ok(())
    }

    /// Request termination of the live process, if any.
    ///
    /// Idempotent: calling on a stopped supervisor is a no-op. Returns as
    /// soon as the termination path has been engaged — the grace window
    /// and any forced kill run in the background monitor task.
    pub async fn cancel(&self) {
        if !self.is_running() {
            debug!(label = self.label, "cancel: no live process, no-op");
            return;
        }
        if let Some(kill) = self.kill_request.lock().await.as_ref() {
            kill.cancel();
            info!(label = self.label, "cancel: termination requested");
        }
    }
}

/// Background exit monitor owning the process handle.
///
/// Waits for natural exit, or on a kill request sends the interrupt
/// signal, waits out the grace window, and force-kills. Either way the
/// running flag is cleared and the reader pumps are released once their
/// pipes reach EOF.
async fn monitor_process(
    label: String,
    mut handle: Box<dyn crate::runner::launcher::ProcessHandle>,
    grace: Duration,
    kill: CancellationToken,
    readers_cancel: CancellationToken,
    running: Arc<AtomicBool>,
) {
    tokio::select! {
        result = handle.wait() => {
            match result {
                Ok(code) => info!(label, ?code, "assistant process exited"),
                Err(err) => warn!(label, %err, "error waiting for assistant process"),
            }
        }
        () = kill.cancelled() => {
            if let Err(err) = handle.interrupt() {
                warn!(label, %err, "interrupt failed; escalating to kill");
            }
            match tokio::time::timeout(grace, handle.wait()).await {
                Ok(Ok(code)) => {
                    info!(label, ?code, "assistant process exited after interrupt");
                }
                Ok(Err(err)) => {
                    warn!(label, %err, "error waiting for interrupted process");
                }
                Err(_elapsed) => {
                    warn!(label, "grace window expired; force-killing assistant process");
                    if let Err(err) = handle.kill().await {
                        warn!(label, %err, "force kill failed");
                    }
                }
            }
        }
    }

    running.store(false, Ordering::SeqCst);

    // Pipe EOF normally ends both reader pumps on its own; the token is a
    // backstop for pipes held open by grandchildren. Delay it so buffered
    // output already in flight still gets framed and delivered.
    tokio::time::sleep(Duration::from_secs(2)).await;
    readers_cancel.cancel();
}
