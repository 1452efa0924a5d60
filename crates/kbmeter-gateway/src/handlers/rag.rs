//! `/rag/api/ask` and `/rag/api/upload`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;

use kbmeter_core::error::KbMeterError;
use kbmeter_core::protocol::rag::{
    AskRequest, AskResponse, UploadResponse, FILE_FIELD, KBNAME_FIELD, NO_FILE, STORES_NOT_SET,
};
use kbmeter_core::protocol::SESSION_HEADER;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::obs::KbStoresState;
use crate::session::SessionStore;

fn session_token(headers: &HeaderMap) -> Result<Option<String>, KbMeterError> {
    let Some(v) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let token = v
        .to_str()
        .map_err(|_| KbMeterError::BadRequest(format!("{SESSION_HEADER} must be ascii")))?;
    SessionStore::validate_token(token)?;
    Ok(Some(token.to_string()))
}

/// Receive the KB stores a client is about to work with.
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req = AskRequest::from_slice(&body)?;

    let sessions = state.sessions();
    let token = match session_token(&headers)? {
        Some(t) => t,
        None => sessions.issue_token(),
    };
    tracing::info!(session = %token, kb_stores = ?req.kb_stores, "received kbStores");
    sessions.put(&token, req.kb_stores.clone());

    let header = HeaderValue::from_str(&token)
        .map_err(|e| KbMeterError::Internal(format!("session token not a header value: {e}")))?;
    let mut resp = Json(AskResponse::received(token)).into_response();
    resp.headers_mut().insert(SESSION_HEADER, header);
    resp.extensions_mut().insert(KbStoresState(req.kb_stores));
    Ok(resp)
}

/// Accept a file into a KB. Requires an earlier `ask` in the same session.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart
        .map_err(|e| KbMeterError::BadRequest(format!("invalid form: {}", e.body_text())))?;

    let mut kbname: Option<String> = None;
    let mut file: Option<(String, usize)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| KbMeterError::BadRequest(format!("invalid form: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(KBNAME_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| KbMeterError::BadRequest(format!("invalid kbname: {e}")))?;
                kbname = Some(text);
            }
            Some(FILE_FIELD) => {
                // A part without a filename is a plain form value, not an upload.
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| KbMeterError::BadRequest(format!("invalid file: {e}")))?;
                file = Some((filename, data.len()));
            }
            _ => {}
        }
    }

    let (filename, size) = file.ok_or_else(|| KbMeterError::BadRequest(NO_FILE.into()))?;
    let kbname = kbname.ok_or_else(|| KbMeterError::BadRequest("kbname is required.".into()))?;

    let stores = session_token(&headers)?
        .and_then(|t| state.sessions().get(&t))
        .ok_or_else(|| KbMeterError::PreconditionUnmet(STORES_NOT_SET.into()))?;

    tracing::info!(%kbname, %filename, size, kb_stores = ?stores, "file uploaded");

    let mut resp = Json(UploadResponse::uploaded(&filename)).into_response();
    resp.extensions_mut().insert(KbStoresState(stores));
    Ok(resp)
}
