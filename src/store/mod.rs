//! Durable persistence layer.
//!
//! Holds the per-user assistant session identifier and the bounded
//! history of prior identifiers, surviving daemon restarts.

pub mod db;
pub mod schema;
pub mod session_store;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
