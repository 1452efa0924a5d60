//! kbmeter gateway library entry.
//!
//! This crate wires config, KB sessions, HTTP instrumentation and the KB
//! endpoint handlers into one axum app. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod obs;
pub mod router;
pub mod session;
