//! Assistant CLI process supervision.
//!
//! Argument construction ([`args`]), the injectable process-launch seam
//! ([`launcher`]), and the per-session supervisor owning at most one live
//! subprocess ([`supervisor`]).

pub mod args;
pub mod launcher;
pub mod supervisor;
