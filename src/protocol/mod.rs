//! Subprocess stream protocol layer.
//!
//! Converts the assistant CLI's newline-delimited JSON stdout into the
//! typed [`event::StreamEvent`] sequence consumed by the orchestrator:
//! line framing in [`codec`], classification in [`parser`], and the async
//! pump task in [`reader`].

pub mod codec;
pub mod event;
pub mod parser;
pub mod reader;
