//! Registry of active subprocess supervisors.
//!
//! Owned by the orchestrator, keyed by user id, and used only for bulk
//! shutdown — never for cross-session sharing. Insertion and removal are
//! tied to session creation and destruction.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::runner::supervisor::ProcessSupervisor;

/// Process-wide table of live supervisors.
#[derive(Default)]
pub struct ProcessRegistry {
    inner: Mutex<HashMap<String, Arc<ProcessSupervisor>>>,
}

impl ProcessRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the supervisor owned by a user's session.
    pub async fn insert(&self, user_id: &str, supervisor: Arc<ProcessSupervisor>) {
        self.inner
            .lock()
            .await
            .insert(user_id.to_owned(), supervisor);
    }

    /// Remove a user's supervisor; no-op when absent.
    pub async fn remove(&self, user_id: &str) {
        self.inner.lock().await.remove(user_id);
    }

    /// Number of registered supervisors.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Cancel every registered supervisor (bulk shutdown path).
    pub async fn shutdown_all(&self) {
        let supervisors: Vec<_> = self.inner.lock().await.values().cloned().collect();
        info!(count = supervisors.len(), "shutting down all assistant processes");
        for supervisor in supervisors {
            supervisor.cancel().await;
        }
    }
}
