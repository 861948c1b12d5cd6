#![forbid(unsafe_code)]

//! `agent-courier` — chat bridge daemon for a headless AI coding CLI.
//!
//! One user turn becomes one supervised subprocess invocation of the
//! assistant CLI; its newline-delimited JSON output is parsed into typed
//! stream events, rendered, chunked, and handed to the outbound delivery
//! collaborator.

pub mod config;
pub mod delivery;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod protocol;
pub mod render;
pub mod runner;
pub mod store;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
