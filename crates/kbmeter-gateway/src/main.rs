//! kbmeter gateway
//!
//! Serves one of the two KB services, picked by `gateway.variant`:
//! - rag: POST /rag/api/ask, POST /rag/api/upload
//! - store_log: POST /log-kb-stores
//!
//! Both expose Prometheus metrics on `instrumentation.metrics_path`.

use tracing_subscriber::{fmt, EnvFilter};

use kbmeter_core::error::{KbMeterError, Result};
use kbmeter_gateway::{app_state, config, router, session};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "kbmeter.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.gateway.listen_addr()?;
    let variant = cfg.gateway.variant;
    let sweep_every = cfg.sessions.sweep_interval();

    let state = app_state::AppState::new(cfg)?;
    let sweeper = session::spawn_sweeper(state.sessions(), sweep_every);
    let app = router::build_router(state)?;

    tracing::info!(%listen, variant = variant.as_str(), config = %path, "kbmeter-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| KbMeterError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KbMeterError::Internal(format!("server failed: {e}")))?;

    sweeper.abort();
    tracing::info!("kbmeter-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
