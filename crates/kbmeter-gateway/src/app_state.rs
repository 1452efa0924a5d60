//! Shared application state for the kbmeter gateway.

use std::sync::Arc;

use kbmeter_core::error::Result;

use crate::config::{GatewayConfig, Variant};
use crate::obs::{MetricsRegistry, StoreCodeCounter};
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    registry: Arc<MetricsRegistry>,
    sessions: Arc<SessionStore>,
    store_codes: Option<StoreCodeCounter>,
}

impl AppState {
    /// Build application state with a fresh metrics registry.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        Self::with_registry(cfg, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_registry(cfg: GatewayConfig, registry: Arc<MetricsRegistry>) -> Result<Self> {
        let sessions = Arc::new(SessionStore::new(cfg.sessions.ttl(), cfg.sessions.max_entries));
        Self::from_parts(cfg, registry, sessions)
    }

    /// Build state around an existing registry and session table.
    pub fn from_parts(
        cfg: GatewayConfig,
        registry: Arc<MetricsRegistry>,
        sessions: Arc<SessionStore>,
    ) -> Result<Self> {
        let store_codes = match cfg.gateway.variant {
            Variant::StoreLog => StoreCodeCounter::register(&registry)?,
            Variant::Rag => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                sessions,
                store_codes,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.inner.sessions)
    }

    pub fn store_codes(&self) -> Option<&StoreCodeCounter> {
        self.inner.store_codes.as_ref()
    }
}
