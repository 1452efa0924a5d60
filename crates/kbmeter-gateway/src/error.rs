//! HTTP mapping for `KbMeterError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use kbmeter_core::error::KbMeterError;

/// Handler error: a `KbMeterError` rendered as a JSON body.
#[derive(Debug)]
pub struct ApiError(pub KbMeterError);

impl From<KbMeterError> for ApiError {
    fn from(e: KbMeterError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            KbMeterError::BadRequest(_)
            | KbMeterError::PreconditionUnmet(_)
            | KbMeterError::UnsupportedVersion => StatusCode::BAD_REQUEST,
            KbMeterError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            KbMeterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.client_message(),
        }));
        (status, body).into_response()
    }
}
