//! `kbStores` request counter.
//!
//! Counts `POST /rag/api/ask` and `POST /rag/api/upload` by the KB stores the
//! request was about:
//! - ask: label comes from the `kbStores` list in the JSON body
//! - upload: label comes from the store list the handler attached to the
//!   response (`KbStoresState`); uploads into the reserved KB are skipped
//!
//! Failures never reach the client. They are logged and the increment is
//! dropped.

use async_trait::async_trait;
use axum::http::Method;
use prometheus::IntCounterVec;

use kbmeter_core::error::{KbMeterError, Result};
use kbmeter_core::label::{counts_upload, join_kb_stores};
use kbmeter_core::protocol::rag::{AskLabelView, ASK_PATH, KBNAME_FIELD, UPLOAD_PATH};

use crate::obs::instrumentator::{Info, Instrumentation};
use crate::obs::registry::{MetricsRegistry, RegistryError};

pub const KB_REQUESTS_TOTAL: &str = "http_requests_total";

/// Per-request transient state: the store list a handler resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbStoresState(pub Vec<String>);

impl KbStoresState {
    pub fn label(&self) -> String {
        join_kb_stores(&self.0)
    }
}

pub struct KbStoresCounter {
    total: IntCounterVec,
    reserved_kbname: String,
}

impl KbStoresCounter {
    /// Register the counter on `registry`.
    ///
    /// Returns `Ok(None)` when an identical counter is already registered
    /// there; every other registration failure is returned.
    pub fn register(registry: &MetricsRegistry, reserved_kbname: &str) -> Result<Option<Self>> {
        let total = match registry.register_int_counter_vec(
            KB_REQUESTS_TOTAL,
            "Total number of requests by method, status, and handler.",
            &["method", "status", "handler", "kbStores"],
        ) {
            Ok(c) => c,
            Err(RegistryError::Duplicate { name }) => {
                tracing::warn!(metric = %name, "kbStores counter already registered, hook not added");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(Self {
            total,
            reserved_kbname: reserved_kbname.to_string(),
        }))
    }

    fn inc(&self, info: &Info<'_>, label: &str) {
        self.total
            .with_label_values(&[info.method().as_str(), info.status_label, info.path(), label])
            .inc();
    }

    fn record_ask(&self, info: &Info<'_>) -> Result<()> {
        let body: AskLabelView = info.request.json()?;
        let label = join_kb_stores(&body.kb_stores);
        self.inc(info, &label);
        Ok(())
    }

    async fn record_upload(&self, info: &Info<'_>) -> Result<()> {
        let kbname = info.request.form_text(KBNAME_FIELD).await?;
        let state = info.state.get::<KbStoresState>().ok_or_else(|| {
            KbMeterError::PreconditionUnmet("kbStores missing from request state".into())
        })?;

        if counts_upload(kbname.as_deref(), &self.reserved_kbname) {
            self.inc(info, &state.label());
        } else {
            tracing::debug!(kbname = ?kbname, "upload into reserved kb not counted");
        }
        Ok(())
    }
}

#[async_trait]
impl Instrumentation for KbStoresCounter {
    fn name(&self) -> &'static str {
        "kb_stores"
    }

    async fn instrument(&self, info: &Info<'_>) {
        if *info.method() != Method::POST {
            return;
        }
        match info.path() {
            ASK_PATH => {
                if let Err(e) = self.record_ask(info) {
                    tracing::warn!(path = ASK_PATH, error = %e, "kbStores label not recorded");
                }
            }
            UPLOAD_PATH => {
                if let Err(e) = self.record_upload(info).await {
                    tracing::warn!(path = UPLOAD_PATH, error = %e, "kbStores label not recorded");
                }
            }
            _ => {}
        }
    }
}
