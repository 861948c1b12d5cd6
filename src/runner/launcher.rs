//! Injectable process-launch seam.
//!
//! Every subprocess the daemon ever starts goes through a
//! [`ProcessLauncher`]. Production wiring supplies [`CliLauncher`]; test
//! wiring supplies a fake. This makes the real assistant CLI provably
//! unreachable outside production configuration — there is no ambient
//! spawn path to guard with runtime flags.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::{AppError, Result};

/// Everything needed to start one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Binary name or path.
    pub binary: String,
    /// Full ordered argument list.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub cwd: PathBuf,
}

/// Control surface over a launched process, independent of how it was
/// launched.
pub trait ProcessHandle: Send {
    /// OS process id, when the process is real and still known.
    fn id(&self) -> Option<u32>;

    /// Request graceful termination (interrupt signal).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Spawn`] if the signal cannot be delivered.
    fn interrupt(&self) -> Result<()>;

    /// Force-kill the process.
    fn kill(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Await process exit, yielding the exit code when available.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<i32>>> + Send + '_>>;
}

/// A started subprocess: its control handle plus output pipes.
///
/// Standard input is never part of this contract — the assistant CLI is
/// driven entirely by arguments, and stdin is closed at launch.
pub struct LaunchedProcess {
    /// Control handle used by the supervisor for termination.
    pub handle: Box<dyn ProcessHandle>,
    /// Protocol stream (JSONL).
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    /// Diagnostic stream, never parsed as protocol.
    pub stderr: Box<dyn AsyncRead + Send + Unpin>,
}

/// Capability to start assistant subprocesses.
pub trait ProcessLauncher: Send + Sync {
    /// Launch the process described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Spawn`] when the process cannot be started.
    fn launch(
        &self,
        spec: LaunchSpec,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchedProcess>> + Send + '_>>;
}

// ── Production launcher ──────────────────────────────────────────────────────

/// Launches the real assistant CLI via `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliLauncher;

impl ProcessLauncher for CliLauncher {
    fn launch(
        &self,
        spec: LaunchSpec,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchedProcess>> + Send + '_>> {
        Box::pin(async move {
            let mut cmd = Command::new(&spec.binary);
            cmd.args(&spec.args)
                .current_dir(&spec.cwd)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let mut child = cmd
                .spawn()
                .map_err(|err| AppError::Spawn(format!("failed to spawn assistant cli: {err}")))?;

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| AppError::Spawn("failed to capture stdout".into()))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| AppError::Spawn("failed to capture stderr".into()))?;

            info!(
                binary = spec.binary,
                pid = child.id().unwrap_or(0),
                "assistant process spawned"
            );

            Ok(LaunchedProcess {
                handle: Box::new(TokioProcessHandle { child }),
                stdout: Box::new(stdout),
                stderr: Box::new(stderr),
            })
        })
    }
}

/// [`ProcessHandle`] over a real `tokio::process::Child`.
struct TokioProcessHandle {
    child: Child,
}

impl ProcessHandle for TokioProcessHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    fn interrupt(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id() else {
            // Already reaped — nothing to signal.
            return Ok(());
        };
        let raw = i32::try_from(pid)
            .map_err(|_| AppError::Spawn(format!("pid {pid} out of range for signal")))?;
        kill(Pid::from_raw(raw), Signal::SIGINT)
            .map_err(|err| AppError::Spawn(format!("failed to send SIGINT: {err}")))
    }

    #[cfg(not(unix))]
    fn interrupt(&self) -> Result<()> {
        // No interrupt signal on this platform; the supervisor's grace
        // window expires and escalates to kill.
        Ok(())
    }

    fn kill(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Err(err) = self.child.kill().await {
                warn!(%err, "failed to force-kill assistant process");
                return Err(AppError::Spawn(format!("kill failed: {err}")));
            }
            Ok(())
        })
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<i32>>> + Send + '_>> {
        Box::pin(async move {
            let status = self
                .child
                .wait()
                .await
                .map_err(|err| AppError::Spawn(format!("wait failed: {err}")))?;
            Ok(status.code())
        })
    }
}
