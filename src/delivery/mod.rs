//! Outbound collaborator interfaces.
//!
//! The chat transport itself is out of scope; the core talks to it only
//! through [`Delivery`], and releases per-turn temporary resources through
//! [`Cleanup`]. Both are trait seams so the daemon runs against a logging
//! stand-in and tests run against recording fakes.

pub mod log;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::Result;

/// Opaque reference to a delivered message, usable for in-place edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// Outbound chat delivery.
///
/// The core never assumes a delivery succeeded without the returned
/// [`MessageRef`]; a failed in-place edit is retried as a fresh send by
/// the caller rather than losing the content.
pub trait Delivery: Send + Sync {
    /// Deliver `text` to `chat_id`, optionally replacing a prior message.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Delivery`](crate::AppError::Delivery) when the
    /// transport rejects the message.
    fn deliver(
        &self,
        chat_id: &str,
        text: &str,
        edit_of: Option<&MessageRef>,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + '_>>;
}

/// Per-turn resource cleanup.
pub trait Cleanup: Send + Sync {
    /// Called when a turn completes, with any temporary attachment path
    /// still tied to the session.
    fn turn_complete(
        &self,
        user_id: &str,
        attachment: Option<&Path>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
