//! Metric registry with schema bookkeeping.
//!
//! Wraps a `prometheus::Registry` and remembers the kind, help text and label
//! names of every metric registered through it. That lets callers tell a
//! harmless re-registration (same name, same schema) apart from a real
//! conflict, which the prometheus crate reports with the same error.

use std::collections::HashSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

use kbmeter_core::error::KbMeterError;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Same name and identical schema already registered.
    #[error("duplicated time series in registry: {name}")]
    Duplicate { name: String },
    /// Same name registered with a different kind, help text or label set.
    #[error("metric {name} already registered with a different schema")]
    SchemaConflict { name: String },
    #[error("metric {name} has an invalid label schema: {reason}")]
    InvalidLabels { name: String, reason: String },
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
}

impl RegistryError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistryError::Duplicate { .. })
    }
}

impl From<RegistryError> for KbMeterError {
    fn from(e: RegistryError) -> Self {
        KbMeterError::Internal(format!("metric registration failed: {e}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MetricSchema {
    kind: MetricKind,
    help: String,
    labels: Vec<String>,
}

#[derive(Default)]
pub struct MetricsRegistry {
    inner: Registry,
    schemas: DashMap<String, MetricSchema>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_int_counter_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<IntCounterVec, RegistryError> {
        self.register_with(name, MetricKind::Counter, help, labels, || {
            IntCounterVec::new(Opts::new(name, help), labels)
        })
    }

    pub fn register_int_gauge_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<IntGaugeVec, RegistryError> {
        self.register_with(name, MetricKind::Gauge, help, labels, || {
            IntGaugeVec::new(Opts::new(name, help), labels)
        })
    }

    pub fn register_histogram_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: Vec<f64>,
    ) -> Result<HistogramVec, RegistryError> {
        self.register_with(name, MetricKind::Histogram, help, labels, || {
            HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), labels)
        })
    }

    /// Names of every metric registered so far.
    pub fn names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        v.sort();
        v
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> Result<(String, String), RegistryError> {
        let families = self.inner.gather();
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        let text = String::from_utf8(buf)
            .map_err(|e| prometheus::Error::Msg(format!("exposition is not utf-8: {e}")))?;
        Ok((encoder.format_type().to_string(), text))
    }

    fn register_with<C, F>(
        &self,
        name: &str,
        kind: MetricKind,
        help: &str,
        labels: &[&str],
        build: F,
    ) -> Result<C, RegistryError>
    where
        C: Collector + Clone + 'static,
        F: FnOnce() -> prometheus::Result<C>,
    {
        validate_labels(name, labels)?;
        let schema = MetricSchema {
            kind,
            help: help.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        };

        // The entry guard serializes concurrent registrations of one name.
        match self.schemas.entry(name.to_string()) {
            Entry::Occupied(o) => {
                if *o.get() == schema {
                    Err(RegistryError::Duplicate { name: name.to_string() })
                } else {
                    Err(RegistryError::SchemaConflict { name: name.to_string() })
                }
            }
            Entry::Vacant(v) => {
                let collector = build()?;
                self.inner
                    .register(Box::new(collector.clone()))
                    .map_err(|e| match e {
                        prometheus::Error::AlreadyReg => {
                            RegistryError::Duplicate { name: name.to_string() }
                        }
                        other => RegistryError::Prometheus(other),
                    })?;
                v.insert(schema);
                Ok(collector)
            }
        }
    }
}

fn validate_labels(name: &str, labels: &[&str]) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidLabels {
        name: name.to_string(),
        reason,
    };

    let mut seen = HashSet::new();
    for l in labels {
        if !is_valid_label_name(l) {
            return Err(invalid(format!("{l:?} is not a valid label name")));
        }
        if l.starts_with("__") {
            return Err(invalid(format!("{l:?} uses the reserved '__' prefix")));
        }
        if !seen.insert(*l) {
            return Err(invalid(format!("label {l:?} appears more than once")));
        }
    }
    Ok(())
}

fn is_valid_label_name(l: &str) -> bool {
    let mut chars = l.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
