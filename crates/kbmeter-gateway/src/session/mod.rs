//! KB sessions: correlate an `ask` with later `upload` calls.
//!
//! `ask` issues (or reuses) a session token and stores the declared store list
//! under it. `upload` presents the token in the `x-kb-session` header.

pub mod store;

pub use store::{spawn_sweeper, SessionStore};
