//! Axum router wiring.
//!
//! Routes depend on the configured variant. Both variants are wrapped by the
//! instrumentation middleware and expose the scrape route, which is added last
//! so it is never instrumented.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::post, Router};

use kbmeter_core::error::Result;
use kbmeter_core::protocol::rag::{ASK_PATH, UPLOAD_PATH};
use kbmeter_core::protocol::store_log::LOG_KB_STORES_PATH;

use crate::app_state::AppState;
use crate::config::Variant;
use crate::handlers;
use crate::obs::{expose, Instrumentation, Instrumentator, KbStoresCounter};

pub fn build_router(state: AppState) -> Result<Router> {
    let cfg = state.cfg().clone();
    let registry = state.registry();

    let routes = match cfg.gateway.variant {
        Variant::Rag => Router::new()
            .route(ASK_PATH, post(handlers::rag::ask))
            .route(UPLOAD_PATH, post(handlers::rag::upload)),
        Variant::StoreLog => {
            Router::new().route(LOG_KB_STORES_PATH, post(handlers::store_log::log_kb_stores))
        }
    }
    .with_state(state);

    let mut instrumentator = Instrumentator::new(
        Arc::clone(&registry),
        &cfg.instrumentation,
        cfg.gateway.body_limit_bytes,
    )?;
    if cfg.gateway.variant == Variant::Rag {
        let hook = KbStoresCounter::register(&registry, &cfg.upload.reserved_kbname)?
            .map(|h| Arc::new(h) as Arc<dyn Instrumentation>);
        instrumentator = instrumentator.add_registered(hook);
    }

    let app = instrumentator
        .instrument(routes)?
        .layer(DefaultBodyLimit::max(cfg.gateway.body_limit_bytes));

    Ok(expose(app, registry, &cfg.instrumentation.metrics_path))
}
