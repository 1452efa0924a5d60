use serde::{Deserialize, Serialize};

use crate::error::{KbMeterError, Result};

pub const LOG_KB_STORES_PATH: &str = "/log-kb-stores";

/// Body of `POST /log-kb-stores`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KbStoreCodesRequest {
    pub kb_store_codes: Vec<String>,
}

impl KbStoreCodesRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| KbMeterError::BadRequest(format!("invalid kb_store_codes body: {e}")))
    }
}

/// Echo of the codes exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KbStoreCodesResponse {
    pub received_kb_store_codes: Vec<String>,
}
