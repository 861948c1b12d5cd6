//! Logging stand-ins for the delivery and cleanup collaborators.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::{info, warn};
use uuid::Uuid;

use crate::delivery::{Cleanup, Delivery, MessageRef};
use crate::Result;

/// Writes every outbound chunk to the log instead of a chat transport.
///
/// Default wiring for the binary so the daemon runs end to end without a
/// configured front-end.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl Delivery for LogDelivery {
    fn deliver(
        &self,
        chat_id: &str,
        text: &str,
        edit_of: Option<&MessageRef>,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + '_>> {
        let edited = edit_of.map(|r| r.0.clone());
        let chat = chat_id.to_owned();
        let body = text.to_owned();
        Box::pin(async move {
            info!(chat, edit_of = ?edited, len = body.len(), "outbound message\n{body}");
            Ok(MessageRef(Uuid::new_v4().to_string()))
        })
    }
}

/// Deletes temporary attachment files when a turn completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCleanup;

impl Cleanup for FsCleanup {
    fn turn_complete(
        &self,
        user_id: &str,
        attachment: Option<&Path>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let user = user_id.to_owned();
        let path = attachment.map(Path::to_path_buf);
        Box::pin(async move {
            let Some(path) = path else { return };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(user, path = %path.display(), "removed turn attachment"),
                Err(err) => warn!(user, path = %path.display(), %err, "attachment cleanup failed"),
            }
        })
    }
}
