//! In-memory conversation session entity.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::delivery::MessageRef;
use crate::protocol::event::TokenUsage;

/// The last todo list rendered for a session.
///
/// Kept so a later todo update can edit the prior message in place, and
/// so a materially identical list is not re-delivered at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTodo {
    /// Delivery reference of the rendered message.
    pub message: MessageRef,
    /// The rendered text, compared to detect material changes.
    pub rendered: String,
}

/// One conversation session; at most one exists per user.
#[derive(Debug, Clone)]
pub struct Session {
    /// Owning user identifier.
    pub user_id: String,
    /// Destination chat identifier for outbound delivery.
    pub chat_id: String,
    /// Assistant-side session identifier; learned from the first
    /// session-init event and used for precise resumption.
    pub assistant_session_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Number of user turns sent through this session.
    pub message_count: u64,
    /// Cumulative token usage across turns.
    pub usage: TokenUsage,
    /// Last rendered todo list, for in-place edits.
    pub last_todo: Option<RenderedTodo>,
    /// Temporary per-turn resource awaiting cleanup (e.g., a downloaded
    /// attachment).
    pub pending_attachment: Option<PathBuf>,
}

impl Session {
    /// Construct a fresh session for a user and destination chat.
    #[must_use]
    pub fn new(user_id: String, chat_id: String) -> Self {
        Self {
            user_id,
            chat_id,
            assistant_session_id: None,
            created_at: Utc::now(),
            message_count: 0,
            usage: TokenUsage::default(),
            last_todo: None,
            pending_attachment: None,
        }
    }

    /// Seconds elapsed since the session was created.
    #[must_use]
    pub fn elapsed_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }
}

/// Read-only status snapshot returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Number of user turns sent.
    pub message_count: u64,
    /// Seconds since session creation.
    pub elapsed_seconds: i64,
    /// Whether a subprocess is currently running a turn.
    pub active: bool,
    /// Current assistant-side session identifier, if learned.
    pub assistant_session_id: Option<String>,
    /// Cumulative token usage.
    pub usage: TokenUsage,
}
