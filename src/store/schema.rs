//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every daemon startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS session_store (
    user_id             TEXT PRIMARY KEY NOT NULL,
    current_session_id  TEXT,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_history (
    user_id       TEXT NOT NULL,
    session_id    TEXT NOT NULL,
    last_access   TEXT NOT NULL,
    PRIMARY KEY (user_id, session_id)
);

CREATE INDEX IF NOT EXISTS idx_history_recency
    ON session_history (user_id, last_access DESC);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
