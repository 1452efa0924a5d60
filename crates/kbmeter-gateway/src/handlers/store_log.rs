//! `/log-kb-stores`.

use axum::{extract::State, Json};
use bytes::Bytes;

use kbmeter_core::protocol::store_log::{KbStoreCodesRequest, KbStoreCodesResponse};

use crate::app_state::AppState;
use crate::error::ApiError;

/// Count each KB store code and echo the list back unchanged.
pub async fn log_kb_stores(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<KbStoreCodesResponse>, ApiError> {
    let req = KbStoreCodesRequest::from_slice(&body)?;
    // None when another app on the same registry owns the counter.
    let counted = state
        .store_codes()
        .map(|c| c.record(&req.kb_store_codes))
        .unwrap_or(0);
    tracing::info!(received = req.kb_store_codes.len(), counted, "kb store codes logged");

    Ok(Json(KbStoreCodesResponse {
        received_kb_store_codes: req.kb_store_codes,
    }))
}
