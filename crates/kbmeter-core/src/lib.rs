//! kbmeter core: error types, wire contracts and label helpers.
//!
//! This crate defines the request/response shapes of the KB services and the
//! rules for turning KB store identifiers into metric label values. It carries
//! no transport or runtime dependencies so the gateway and its tests can share
//! it freely.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `KbMeterError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod label;
pub mod protocol;

/// Shared result type.
pub use error::{KbMeterError, Result};
