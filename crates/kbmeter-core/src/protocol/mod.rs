//! Wire contracts for the KB services.
//!
//! - `rag`: `/rag/api/ask` and `/rag/api/upload`
//! - `store_log`: `/log-kb-stores`

pub mod rag;
pub mod store_log;

/// Header carrying the KB session token between `ask` and `upload`.
pub const SESSION_HEADER: &str = "x-kb-session";
