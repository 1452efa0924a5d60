//! Default HTTP metric set, installed when no custom hook is added.

use async_trait::async_trait;
use prometheus::{HistogramVec, IntCounterVec};

use crate::obs::instrumentator::{Info, Instrumentation};
use crate::obs::registry::{MetricsRegistry, RegistryError};

const LATENCY_LOWR_BUCKETS: [f64; 3] = [0.1, 0.5, 1.0];

const LATENCY_HIGHR_BUCKETS: [f64; 21] = [
    0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0,
    7.5, 10.0, 30.0, 60.0,
];

const SIZE_BUCKETS: [f64; 7] = [
    100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0, 100_000_000.0,
];

pub struct DefaultMetrics {
    requests_total: IntCounterVec,
    duration: HistogramVec,
    duration_highr: HistogramVec,
    request_size: HistogramVec,
    response_size: HistogramVec,
}

impl DefaultMetrics {
    /// Register the default set on `registry`.
    ///
    /// Returns `Ok(None)` when the set is already registered there.
    pub fn register(registry: &MetricsRegistry) -> Result<Option<Self>, RegistryError> {
        match Self::try_register(registry) {
            Ok(m) => Ok(Some(m)),
            Err(RegistryError::Duplicate { name }) => {
                tracing::warn!(metric = %name, "default http metrics already registered");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn try_register(registry: &MetricsRegistry) -> Result<Self, RegistryError> {
        let requests_total = registry.register_int_counter_vec(
            "http_requests_total",
            "Total number of requests by method, status and handler.",
            &["method", "status", "handler"],
        )?;
        let duration = registry.register_histogram_vec(
            "http_request_duration_seconds",
            "Latency with only few buckets by handler.",
            &["method", "handler"],
            LATENCY_LOWR_BUCKETS.to_vec(),
        )?;
        let duration_highr = registry.register_histogram_vec(
            "http_request_duration_highr_seconds",
            "Latency with many buckets but no labels.",
            &[],
            LATENCY_HIGHR_BUCKETS.to_vec(),
        )?;
        let request_size = registry.register_histogram_vec(
            "http_request_size_bytes",
            "Size of the request body by handler.",
            &["handler"],
            SIZE_BUCKETS.to_vec(),
        )?;
        let response_size = registry.register_histogram_vec(
            "http_response_size_bytes",
            "Size of the response body by handler.",
            &["handler"],
            SIZE_BUCKETS.to_vec(),
        )?;

        Ok(Self {
            requests_total,
            duration,
            duration_highr,
            request_size,
            response_size,
        })
    }
}

#[async_trait]
impl Instrumentation for DefaultMetrics {
    fn name(&self) -> &'static str {
        "default"
    }

    async fn instrument(&self, info: &Info<'_>) {
        let method = info.method().as_str();
        let secs = info.duration.as_secs_f64();

        self.requests_total
            .with_label_values(&[method, info.status_label, info.handler])
            .inc();
        self.duration
            .with_label_values(&[method, info.handler])
            .observe(secs);
        self.duration_highr.with_label_values(&[]).observe(secs);
        self.request_size
            .with_label_values(&[info.handler])
            .observe(info.request.body.len() as f64);
        self.response_size
            .with_label_values(&[info.handler])
            .observe(info.response_size as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_is_swallowed() {
        let registry = MetricsRegistry::new();
        assert!(DefaultMetrics::register(&registry).unwrap().is_some());
        assert!(DefaultMetrics::register(&registry).unwrap().is_none());
    }

    #[test]
    fn conflicting_registration_propagates() {
        let registry = MetricsRegistry::new();
        registry
            .register_int_counter_vec("http_requests_total", "other", &["kbStores"])
            .unwrap();
        let err = DefaultMetrics::register(&registry)
            .err()
            .expect("schema conflict must surface");
        assert!(matches!(err, RegistryError::SchemaConflict { .. }));
    }
}
