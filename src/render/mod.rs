//! Outbound message rendering.
//!
//! [`format`] turns stream events into HTML-formatted chat text;
//! [`chunker`] splits long text into transport-safe, tag-balanced chunks.

pub mod chunker;
pub mod format;
