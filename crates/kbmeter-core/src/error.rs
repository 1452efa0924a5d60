//! Shared error type across kbmeter crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed body.
    BadRequest,
    /// A required earlier call (e.g. `ask` before `upload`) did not happen.
    PreconditionUnmet,
    /// Payload too large.
    PayloadTooLarge,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PreconditionUnmet => "PRECONDITION_UNMET",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, KbMeterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum KbMeterError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("precondition not met: {0}")]
    PreconditionUnmet(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl KbMeterError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            KbMeterError::BadRequest(_) => ClientCode::BadRequest,
            KbMeterError::PreconditionUnmet(_) => ClientCode::PreconditionUnmet,
            KbMeterError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            KbMeterError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            KbMeterError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Message safe to show to clients.
    ///
    /// Handler errors carry the text the client should see; internal errors
    /// are reduced to a generic message.
    pub fn client_message(&self) -> String {
        match self {
            KbMeterError::BadRequest(m) | KbMeterError::PreconditionUnmet(m) => m.clone(),
            KbMeterError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_has_its_own_code() {
        let e = KbMeterError::PreconditionUnmet("call ask first".into());
        assert_eq!(e.client_code().as_str(), "PRECONDITION_UNMET");
        assert_eq!(e.client_message(), "call ask first");
    }

    #[test]
    fn internal_message_is_not_leaked() {
        let e = KbMeterError::Internal("registry poisoned at 0xdead".into());
        assert_eq!(e.client_message(), "internal error");
    }
}
