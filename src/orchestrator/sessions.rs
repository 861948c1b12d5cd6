//! The session orchestrator.
//!
//! Owns the per-user session table and is the single place where a
//! user's free-form message becomes a supervised, correctly-resumed
//! subprocess invocation. Event wiring lives here too: each stream event
//! updates session bookkeeping and is rendered, chunked, and handed to
//! the delivery collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, info_span, warn, Instrument};

use crate::config::GlobalConfig;
use crate::delivery::{Cleanup, Delivery};
use crate::models::session::{RenderedTodo, Session, SessionSnapshot};
use crate::orchestrator::registry::ProcessRegistry;
use crate::protocol::event::{StreamEvent, ToolKind};
use crate::render::chunker::split_chunks;
use crate::render::format::{render_event, render_todo_list};
use crate::runner::args::TurnMode;
use crate::runner::launcher::ProcessLauncher;
use crate::runner::supervisor::ProcessSupervisor;
use crate::store::session_store::SessionStore;
use crate::{AppError, Result};

/// Event channel depth per turn; backpressures a flooding subprocess.
const EVENT_QUEUE_CAPACITY: usize = 256;

/// One user's session: mutable state plus its owned supervisor.
pub struct SessionHandle {
    state: Mutex<Session>,
    supervisor: Arc<ProcessSupervisor>,
}

impl SessionHandle {
    /// Whether a turn is currently running for this session.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.supervisor.is_running()
    }
}

/// Maintains the table of active conversation sessions, one per user.
pub struct Orchestrator {
    config: Arc<GlobalConfig>,
    store: SessionStore,
    delivery: Arc<dyn Delivery>,
    cleanup: Arc<dyn Cleanup>,
    launcher: Arc<dyn ProcessLauncher>,
    sessions: Mutex<HashMap<String, Arc<SessionHandle>>>,
    registry: Arc<ProcessRegistry>,
}

impl Orchestrator {
    /// Wire up an orchestrator with its collaborators.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        store: SessionStore,
        delivery: Arc<dyn Delivery>,
        cleanup: Arc<dyn Cleanup>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            config,
            store,
            delivery,
            cleanup,
            launcher,
            sessions: Mutex::new(HashMap::new()),
            registry: Arc::new(ProcessRegistry::new()),
        }
    }

    /// Return the existing session for a user or create a fresh one,
    /// registering its supervisor in the process registry.
    pub async fn get_or_create(&self, user_id: &str, chat_id: &str) -> Arc<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(user_id) {
            return Arc::clone(handle);
        }

        let supervisor = Arc::new(ProcessSupervisor::new(
            Arc::clone(&self.launcher),
            self.config.cli.clone(),
            self.config.workspace_root.clone(),
            user_id.to_owned(),
        ));
        let handle = Arc::new(SessionHandle {
            state: Mutex::new(Session::new(user_id.to_owned(), chat_id.to_owned())),
            supervisor: Arc::clone(&supervisor),
        });
        sessions.insert(user_id.to_owned(), Arc::clone(&handle));
        drop(sessions);

        self.registry.insert(user_id, supervisor).await;
        info!(user_id, chat_id, "session created");
        handle
    }

    /// Run one conversation turn for a user.
    ///
    /// Resolves the resumption mode (resume-by-id over continue-last over
    /// start-new), launches the subprocess, and returns once the first
    /// stream event has arrived — the turn is then "accepted" and runs to
    /// completion in the background.
    ///
    /// # Errors
    ///
    /// - [`AppError::TurnInFlight`] when a turn is already running for
    ///   this user.
    /// - [`AppError::Spawn`] when the launch fails; the session stays
    ///   addressable and a later `send` may retry.
    pub async fn send(&self, user_id: &str, chat_id: &str, prompt: &str) -> Result<()> {
        let span = info_span!("send", user_id);
        async {
            let handle = self.get_or_create(user_id, chat_id).await;

            if handle.supervisor.is_running() {
                return Err(AppError::TurnInFlight(user_id.to_owned()));
            }

            let mode = self.resolve_mode(&handle, user_id).await?;
            info!(user_id, ?mode, "turn mode resolved");

            let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
            handle
                .supervisor
                .start(&mode, prompt, event_tx)
                .await
                .map_err(|err| match err {
                    // Lost a race with another send for this user between
                    // the in-flight check and the launch.
                    AppError::AlreadyRunning => AppError::TurnInFlight(user_id.to_owned()),
                    other => other,
                })?;

            {
                let mut state = handle.state.lock().await;
                state.message_count += 1;
            }

            // Accepted once the first event is framed from the stream.
            let Some(first) = event_rx.recv().await else {
                warn!(user_id, "stream closed before any event");
                return Ok(());
            };

            let ctx = TurnContext {
                user_id: user_id.to_owned(),
                chat_id: chat_id.to_owned(),
                handle: Arc::clone(&handle),
                store: self.store.clone(),
                delivery: Arc::clone(&self.delivery),
                cleanup: Arc::clone(&self.cleanup),
                chunk_limit: self.config.chunk_limit,
            };
            tokio::spawn(drive_turn(ctx, first, event_rx));
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Cancel the user's running turn.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoActiveSession`] when the user has no session
    /// or no process is running; callers surface this as a notice, not a
    /// failure.
    pub async fn cancel(&self, user_id: &str) -> Result<()> {
        let handle = {
            let sessions = self.sessions.lock().await;
            sessions.get(user_id).map(Arc::clone)
        };
        let Some(handle) = handle else {
            return Err(AppError::NoActiveSession(user_id.to_owned()));
        };
        if !handle.supervisor.is_running() {
            return Err(AppError::NoActiveSession(user_id.to_owned()));
        }

        handle.supervisor.cancel().await;
        info!(user_id, "turn cancelled");
        Ok(())
    }

    /// End the user's session: cancel any running turn, drop the session
    /// from the table, and migrate its identifier into history.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoActiveSession`] when no session exists, or
    /// `AppError::Db` if the history migration fails.
    pub async fn end(&self, user_id: &str) -> Result<()> {
        let handle = self.sessions.lock().await.remove(user_id);
        let Some(handle) = handle else {
            return Err(AppError::NoActiveSession(user_id.to_owned()));
        };

        handle.supervisor.cancel().await;
        self.registry.remove(user_id).await;
        self.store.retire_current(user_id).await?;
        info!(user_id, "session ended");
        Ok(())
    }

    /// Tear down any existing session for the user and create a fresh
    /// one. The old process is cancelled and its identifier flushed to
    /// history first — at most one session per user ever exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if history migration fails.
    pub async fn reset(&self, user_id: &str, chat_id: &str) -> Result<Arc<SessionHandle>> {
        match self.end(user_id).await {
            Ok(()) | Err(AppError::NoActiveSession(_)) => {}
            Err(err) => return Err(err),
        }
        Ok(self.get_or_create(user_id, chat_id).await)
    }

    /// Read-only status snapshot for a user's session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoActiveSession`] when no session exists.
    pub async fn status(&self, user_id: &str) -> Result<SessionSnapshot> {
        let handle = {
            let sessions = self.sessions.lock().await;
            sessions.get(user_id).map(Arc::clone)
        };
        let Some(handle) = handle else {
            return Err(AppError::NoActiveSession(user_id.to_owned()));
        };

        let state = handle.state.lock().await;
        Ok(SessionSnapshot {
            message_count: state.message_count,
            elapsed_seconds: state.elapsed_seconds(),
            active: handle.supervisor.is_running(),
            assistant_session_id: state.assistant_session_id.clone(),
            usage: state.usage,
        })
    }

    /// Prior assistant session identifiers for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store query fails.
    pub async fn history(&self, user_id: &str) -> Result<Vec<String>> {
        self.store.history(user_id).await
    }

    /// Cancel every live subprocess (daemon shutdown path).
    pub async fn shutdown_all(&self) {
        self.registry.shutdown_all().await;
    }

    /// Resolve the resumption mode for a user's next turn.
    ///
    /// Precedence: resume by a known assistant-side identifier (from the
    /// live session first, then the durable store), else continue the
    /// directory's last conversation when this session already ran a
    /// turn, else start new. Resuming by identifier is strictly safer
    /// than directory-scoped continuation, so it always wins.
    async fn resolve_mode(&self, handle: &SessionHandle, user_id: &str) -> Result<TurnMode> {
        let (known_id, prior_turns) = {
            let state = handle.state.lock().await;
            (state.assistant_session_id.clone(), state.message_count)
        };

        if let Some(id) = known_id {
            return Ok(TurnMode::Resume(id));
        }
        if let Some(id) = self.store.current(user_id).await? {
            return Ok(TurnMode::Resume(id));
        }
        if prior_turns > 0 {
            return Ok(TurnMode::ContinueLast);
        }
        Ok(TurnMode::New)
    }
}

// ── Turn event loop ──────────────────────────────────────────────────────────

/// Everything one turn's event loop needs, cloned out of the
/// orchestrator so the loop runs detached.
struct TurnContext {
    user_id: String,
    chat_id: String,
    handle: Arc<SessionHandle>,
    store: SessionStore,
    delivery: Arc<dyn Delivery>,
    cleanup: Arc<dyn Cleanup>,
    chunk_limit: usize,
}

/// Consume the turn's event stream to completion.
///
/// Events are handled strictly in arrival order; the loop ends on
/// process exit or channel close. Delivery failures are logged and never
/// corrupt session state.
async fn drive_turn(
    ctx: TurnContext,
    first: StreamEvent,
    mut event_rx: mpsc::Receiver<StreamEvent>,
) {
    let mut next = Some(first);
    while let Some(event) = next.take() {
        let done = handle_event(&ctx, event).await;
        if done {
            break;
        }
        next = event_rx.recv().await;
    }

    info!(user_id = ctx.user_id, "turn event loop finished");
}

/// Handle one event; returns `true` when the turn is over.
async fn handle_event(ctx: &TurnContext, event: StreamEvent) -> bool {
    match &event {
        StreamEvent::SessionInit { session_id, .. } => {
            {
                let mut state = ctx.handle.state.lock().await;
                state.assistant_session_id = Some(session_id.clone());
            }
            // Persist immediately so a daemon restart can still resume.
            if let Err(err) = ctx.store.set_current(&ctx.user_id, session_id).await {
                warn!(user_id = ctx.user_id, %err, "failed to persist session id");
            }
        }
        StreamEvent::ToolInvoked {
            kind: ToolKind::TodoWrite,
            input,
            ..
        } => {
            render_and_deliver_todo(ctx, input).await;
            return false;
        }
        StreamEvent::TurnCompleted { usage, .. } => {
            let attachment = {
                let mut state = ctx.handle.state.lock().await;
                state.usage.accumulate(usage);
                state.pending_attachment.take()
            };
            deliver_rendered(ctx, &event).await;
            ctx.cleanup
                .turn_complete(&ctx.user_id, attachment.as_deref())
                .await;
            return false;
        }
        StreamEvent::ParseFailure { line, error } => {
            warn!(
                user_id = ctx.user_id,
                error,
                raw_line = line,
                "unparseable stream line"
            );
        }
        StreamEvent::StderrLine { text } => {
            warn!(user_id = ctx.user_id, text, "assistant stderr");
        }
        StreamEvent::ProcessExited { .. } => {
            deliver_rendered(ctx, &event).await;
            return true;
        }
        _ => {}
    }

    deliver_rendered(ctx, &event).await;
    false
}

/// Render an event and deliver its chunks in order.
async fn deliver_rendered(ctx: &TurnContext, event: &StreamEvent) {
    let Some(text) = render_event(event) else {
        return;
    };
    for chunk in split_chunks(&text, ctx.chunk_limit) {
        if let Err(err) = ctx.delivery.deliver(&ctx.chat_id, &chunk, None).await {
            warn!(user_id = ctx.user_id, %err, "chunk delivery failed");
        }
    }
}

/// Deliver a todo-list update, editing the prior rendering in place when
/// the list materially changed, with fallback to a fresh send when the
/// edit fails.
async fn render_and_deliver_todo(ctx: &TurnContext, input: &serde_json::Value) {
    let Some(rendered) = render_todo_list(input) else {
        return;
    };

    let mut state = ctx.handle.state.lock().await;

    if let Some(last) = &state.last_todo {
        if last.rendered == rendered {
            // Materially unchanged — nothing to redeliver.
            return;
        }
        match ctx
            .delivery
            .deliver(&ctx.chat_id, &rendered, Some(&last.message))
            .await
        {
            Ok(message) => {
                state.last_todo = Some(RenderedTodo { message, rendered });
                return;
            }
            Err(err) => {
                warn!(user_id = ctx.user_id, %err, "todo edit failed; sending fresh");
            }
        }
    }

    match ctx.delivery.deliver(&ctx.chat_id, &rendered, None).await {
        Ok(message) => {
            state.last_todo = Some(RenderedTodo { message, rendered });
        }
        Err(err) => {
            warn!(user_id = ctx.user_id, %err, "todo delivery failed");
        }
    }
}
