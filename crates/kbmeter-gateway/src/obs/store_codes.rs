//! Per-code counter for the store-log service.

use prometheus::IntCounterVec;

use kbmeter_core::label::normalize_store_code;

use crate::obs::registry::{MetricsRegistry, RegistryError};

pub const STORE_CODES_TOTAL: &str = "http_requested_kb_store_codes_total";

#[derive(Clone)]
pub struct StoreCodeCounter {
    counter: IntCounterVec,
}

impl StoreCodeCounter {
    /// Returns `Ok(None)` when the counter is already registered on `registry`.
    pub fn register(registry: &MetricsRegistry) -> Result<Option<Self>, RegistryError> {
        match registry.register_int_counter_vec(
            STORE_CODES_TOTAL,
            "Number of requests for each unique KB store code.",
            &["kb_store_code"],
        ) {
            Ok(counter) => Ok(Some(Self { counter })),
            Err(RegistryError::Duplicate { name }) => {
                tracing::warn!(metric = %name, "store code counter already registered");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Count every non-empty code once, after normalization.
    /// Returns how many codes were counted.
    pub fn record<S: AsRef<str>>(&self, codes: &[S]) -> usize {
        let mut counted = 0;
        for code in codes.iter().filter_map(|c| normalize_store_code(c.as_ref())) {
            self.counter.with_label_values(&[code.as_str()]).inc();
            counted += 1;
        }
        counted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_normalized_and_blank_codes_skipped() {
        let registry = MetricsRegistry::new();
        let c = StoreCodeCounter::register(&registry).unwrap().unwrap();

        assert_eq!(c.record(&[" HR ", "", "Fin", "hr", "  "]), 3);
        let (_, text) = registry.render().unwrap();
        assert!(text.contains("http_requested_kb_store_codes_total{kb_store_code=\"hr\"} 2"));
        assert!(text.contains("http_requested_kb_store_codes_total{kb_store_code=\"fin\"} 1"));
        assert!(!text.contains("kb_store_code=\"\""));
    }

    #[test]
    fn registering_twice_is_swallowed() {
        let registry = MetricsRegistry::new();
        assert!(StoreCodeCounter::register(&registry).unwrap().is_some());
        assert!(StoreCodeCounter::register(&registry).unwrap().is_none());
    }
}
