//! Top-level facade crate for kbmeter.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use kbmeter_core::*;
}

pub mod gateway {
    pub use kbmeter_gateway::*;
}
