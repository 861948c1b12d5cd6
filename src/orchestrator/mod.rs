//! Session orchestration modules.
//!
//! Covers the per-user session table, turn dispatch with the resumption
//! policy, stream-event wiring, and the active-process registry used for
//! bulk shutdown.

pub mod registry;
pub mod sessions;

pub use sessions::Orchestrator;
