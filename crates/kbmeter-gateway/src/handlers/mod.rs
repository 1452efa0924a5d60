//! HTTP endpoint handlers.
//!
//! Bodies are taken as raw bytes and parsed here so that every malformed body
//! maps to a 400 with the shared error shape.

pub mod rag;
pub mod store_log;
