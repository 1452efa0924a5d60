use serde::{Deserialize, Serialize};

use crate::error::{KbMeterError, Result};

pub const ASK_PATH: &str = "/rag/api/ask";
pub const UPLOAD_PATH: &str = "/rag/api/upload";

/// Multipart field names accepted by `upload`.
pub const KBNAME_FIELD: &str = "kbname";
pub const FILE_FIELD: &str = "file";

/// Body of `POST /rag/api/ask`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AskRequest {
    #[serde(rename = "kbStores")]
    pub kb_stores: Vec<String>,
}

impl AskRequest {
    /// Strict parse used by the handler: `kbStores` must be present.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| KbMeterError::BadRequest(format!("invalid ask body: {e}")))
    }
}

/// Lenient view of an `ask` body: a missing `kbStores` is an empty list.
#[derive(Debug, Default, Deserialize)]
pub struct AskLabelView {
    #[serde(rename = "kbStores", default)]
    pub kb_stores: Vec<String>,
}

/// Acknowledgment returned by `ask`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AskResponse {
    pub message: String,
    pub session: String,
}

impl AskResponse {
    pub fn received(session: String) -> Self {
        Self {
            message: "Successfully received kbStores!".to_string(),
            session,
        }
    }
}

/// Acknowledgment returned by `upload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadResponse {
    pub message: String,
}

impl UploadResponse {
    pub fn uploaded(filename: &str) -> Self {
        Self {
            message: format!("File '{filename}' uploaded successfully!"),
        }
    }
}

/// Client message when `upload` arrives without a store list.
pub const STORES_NOT_SET: &str = "kbStores not set. Please call /rag/api/ask first.";

/// Client message when `upload` carries no file part.
pub const NO_FILE: &str = "No file uploaded.";
