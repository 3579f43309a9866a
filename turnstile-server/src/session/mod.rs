//! Per-user conversational state.
//!
//! Each user has at most one active workflow at a time. The design separates:
//! - **Workflow**: typed state of a multi-turn conversation (`state`)
//! - **SessionStore**: the per-user slot plus the per-user event lock
//!   (`store`)
//!
//! The dispatcher owns all transitions; this module only knows how to hold
//! and hand out state safely.

pub mod state;
pub mod store;

pub use state::*;
pub use store::*;
