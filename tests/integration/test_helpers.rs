//! Shared fakes for orchestrator integration tests.
//!
//! The fake launcher is the test-side implementation of the process
//! seam: it records every `LaunchSpec` it receives and plays back a
//! scripted stdout, so the real assistant CLI is never reachable from
//! tests.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::Notify;

use agent_courier::config::{CliConfig, GlobalConfig};
use agent_courier::delivery::{Cleanup, Delivery, MessageRef};
use agent_courier::runner::launcher::{
    LaunchSpec, LaunchedProcess, ProcessHandle, ProcessLauncher,
};
use agent_courier::{AppError, Result};

/// A test config rooted in a temp-friendly workspace.
pub fn test_config() -> GlobalConfig {
    GlobalConfig {
        cli: CliConfig::default(),
        workspace_root: std::env::temp_dir(),
        db_path: ":memory:".into(),
        chunk_limit: 4096,
    }
}

// ── Fake launcher ────────────────────────────────────────────────────────────

/// Scripted behaviour for one fake process.
#[derive(Clone)]
pub enum FakeScript {
    /// Emit this stdout verbatim, then exit cleanly.
    Output(String),
    /// Produce no output and stay alive until interrupted or killed.
    Hang,
}

/// Records launch specs and plays back scripted processes.
pub struct FakeLauncher {
    script: FakeScript,
    specs: Mutex<Vec<LaunchSpec>>,
    /// Write ends kept open so hanging processes' pipes do not EOF.
    open_pipes: Mutex<Vec<DuplexStream>>,
    pub interrupted: Arc<AtomicBool>,
    pub killed: Arc<AtomicBool>,
}

impl FakeLauncher {
    pub fn new(script: FakeScript) -> Self {
        Self {
            script,
            specs: Mutex::new(Vec::new()),
            open_pipes: Mutex::new(Vec::new()),
            interrupted: Arc::new(AtomicBool::new(false)),
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// All launch specs seen so far, in order.
    pub fn specs(&self) -> Vec<LaunchSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &self,
        spec: LaunchSpec,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchedProcess>> + Send + '_>> {
        self.specs.lock().unwrap().push(spec);
        let script = self.script.clone();
        let interrupted = Arc::clone(&self.interrupted);
        let killed = Arc::clone(&self.killed);

        Box::pin(async move {
            let (stderr_keep, stderr) = tokio::io::duplex(64);

            match script {
                FakeScript::Output(stdout_script) => {
                    let (mut tx, stdout) = tokio::io::duplex(64 * 1024);
                    tx.write_all(stdout_script.as_bytes())
                        .await
                        .map_err(|err| AppError::Spawn(err.to_string()))?;
                    drop(tx); // EOF after the scripted output
                    self.open_pipes.lock().unwrap().push(stderr_keep);
                    Ok(LaunchedProcess {
                        handle: Box::new(FakeHandle {
                            exits_on_wait: true,
                            interrupted,
                            killed,
                            stopped: Arc::new(Notify::new()),
                        }),
                        stdout: Box::new(stdout),
                        stderr: Box::new(stderr),
                    })
                }
                FakeScript::Hang => {
                    // A hanging process still announces itself: `send`
                    // is only accepted once the first event arrives.
                    let (mut stdout_keep, stdout) = tokio::io::duplex(1024);
                    stdout_keep
                        .write_all(
                            b"{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"hang\"}\n",
                        )
                        .await
                        .map_err(|err| AppError::Spawn(err.to_string()))?;
                    let mut pipes = self.open_pipes.lock().unwrap();
                    pipes.push(stdout_keep);
                    pipes.push(stderr_keep);
                    drop(pipes);
                    Ok(LaunchedProcess {
                        handle: Box::new(FakeHandle {
                            exits_on_wait: false,
                            interrupted,
                            killed,
                            stopped: Arc::new(Notify::new()),
                        }),
                        stdout: Box::new(stdout),
                        stderr: Box::new(stderr),
                    })
                }
            }
        })
    }
}

struct FakeHandle {
    exits_on_wait: bool,
    interrupted: Arc<AtomicBool>,
    killed: Arc<AtomicBool>,
    stopped: Arc<Notify>,
}

impl ProcessHandle for FakeHandle {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn interrupt(&self) -> Result<()> {
        self.interrupted.store(true, Ordering::SeqCst);
        self.stopped.notify_one();
        Ok(())
    }

    fn kill(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.killed.store(true, Ordering::SeqCst);
        self.stopped.notify_one();
        Box::pin(async { Ok(()) })
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<i32>>> + Send + '_>> {
        let exits = self.exits_on_wait;
        let interrupted = Arc::clone(&self.interrupted);
        let killed = Arc::clone(&self.killed);
        let stopped = Arc::clone(&self.stopped);
        Box::pin(async move {
            let already_stopped =
                interrupted.load(Ordering::SeqCst) || killed.load(Ordering::SeqCst);
            if !exits && !already_stopped {
                stopped.notified().await;
            }
            Ok(Some(0))
        })
    }
}

// ── Recording delivery ───────────────────────────────────────────────────────

/// One recorded outbound message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub edit_of: Option<String>,
    pub message_ref: String,
}

/// Delivery fake that records every message and can fail edits.
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<SentMessage>>,
    next_ref: AtomicU64,
    fail_edits: bool,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_ref: AtomicU64::new(1),
            fail_edits: false,
        }
    }

    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::new()
        }
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Delivery for RecordingDelivery {
    fn deliver(
        &self,
        chat_id: &str,
        text: &str,
        edit_of: Option<&MessageRef>,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + '_>> {
        let chat_id = chat_id.to_owned();
        let text = text.to_owned();
        let edit_of = edit_of.map(|r| r.0.clone());
        Box::pin(async move {
            if self.fail_edits && edit_of.is_some() {
                return Err(AppError::Delivery("edit rejected by transport".into()));
            }
            let message_ref = format!("msg-{}", self.next_ref.fetch_add(1, Ordering::SeqCst));
            self.sent.lock().unwrap().push(SentMessage {
                chat_id,
                text,
                edit_of,
                message_ref: message_ref.clone(),
            });
            Ok(MessageRef(message_ref))
        })
    }
}

/// Cleanup fake recording which users completed a turn.
#[derive(Default)]
pub struct RecordingCleanup {
    pub completed: Mutex<Vec<String>>,
}

impl Cleanup for RecordingCleanup {
    fn turn_complete(
        &self,
        user_id: &str,
        _attachment: Option<&Path>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let user = user_id.to_owned();
        Box::pin(async move {
            self.completed.lock().unwrap().push(user);
        })
    }
}

/// Poll until `predicate` holds or two seconds elapse.
pub async fn wait_until<F>(mut predicate: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

/// Poll an async predicate until it holds or two seconds elapse.
pub async fn wait_until_async<F, Fut>(mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if predicate().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}
