//! HTTP instrumentation and Prometheus exposition.
//!
//! - `registry`: prometheus registry plus schema bookkeeping
//! - `instrumentator`: request middleware, hook trait, scrape route
//! - `default_metrics`: request count and latency when no custom hook is set
//! - `kb_stores`: the `kbStores`-labeled request counter (rag service)
//! - `store_codes`: per-code counter (store-log service)

pub mod default_metrics;
pub mod instrumentator;
pub mod kb_stores;
pub mod registry;
pub mod store_codes;

pub use instrumentator::{expose, CapturedRequest, Info, Instrumentation, Instrumentator};
pub use kb_stores::{KbStoresCounter, KbStoresState};
pub use registry::{MetricsRegistry, RegistryError};
pub use store_codes::StoreCodeCounter;
