//! Repository for per-user assistant session identifiers.
//!
//! Decoupled from the in-memory `Session`: rows are created lazily on
//! first use, survive restarts, and keep a bounded, duplicate-free
//! history of prior identifiers ordered by recency.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::Result;

/// Maximum history entries retained per user; oldest evicted first.
pub const HISTORY_LIMIT: u32 = 50;

/// Repository over the `session_store` and `session_history` tables.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The current assistant session identifier for a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn current(&self, user_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT current_session_id FROM session_store WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| r.try_get::<Option<String>, _>(0).ok().flatten()))
    }

    /// Record the current assistant session identifier for a user.
    ///
    /// Creates the row lazily on first use. Also refreshes the
    /// identifier's entry in the history list so recency ordering holds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn set_current(&self, user_id: &str, session_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO session_store (user_id, current_session_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE
             SET current_session_id = excluded.current_session_id,
                 updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.touch_history(user_id, session_id).await
    }

    /// Clear the current identifier, moving it into history.
    ///
    /// No-op when no current identifier is recorded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn retire_current(&self, user_id: &str) -> Result<()> {
        let Some(session_id) = self.current(user_id).await? else {
            return Ok(());
        };

        self.touch_history(user_id, &session_id).await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE session_store SET current_session_id = NULL, updated_at = ?2
             WHERE user_id = ?1",
        )
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Prior session identifiers for a user, most recently used first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn history(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT session_id FROM session_history
             WHERE user_id = ?1 ORDER BY last_access DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>(0).map_err(Into::into))
            .collect()
    }

    /// Insert or refresh a history entry, then evict beyond the bound.
    ///
    /// The primary key on `(user_id, session_id)` makes the list
    /// duplicate-free; eviction removes the least recently accessed
    /// entries beyond [`HISTORY_LIMIT`].
    async fn touch_history(&self, user_id: &str, session_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO session_history (user_id, session_id, last_access)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, session_id) DO UPDATE
             SET last_access = excluded.last_access",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "DELETE FROM session_history
             WHERE user_id = ?1 AND session_id NOT IN (
                 SELECT session_id FROM session_history
                 WHERE user_id = ?1 ORDER BY last_access DESC LIMIT ?2
             )",
        )
        .bind(user_id)
        .bind(HISTORY_LIMIT)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
