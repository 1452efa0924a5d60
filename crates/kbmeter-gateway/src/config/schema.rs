use std::net::SocketAddr;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use kbmeter_core::error::{KbMeterError, Result};
use kbmeter_core::label::PERSONAL_KB;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub instrumentation: InstrumentationConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub upload: UploadConfig,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(KbMeterError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.instrumentation.validate()?;
        self.sessions.validate()?;
        self.upload.validate()?;

        Ok(())
    }
}

/// Which of the two services this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// `/rag/api/ask` + `/rag/api/upload`, counted by the kbStores hook.
    #[default]
    Rag,
    /// `/log-kb-stores`, counted per store code plus default HTTP metrics.
    StoreLog,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Rag => "rag",
            Variant::StoreLog => "store_log",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub variant: Variant,

    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            variant: Variant::default(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(1024..=64 * 1024 * 1024).contains(&self.body_limit_bytes) {
            return Err(KbMeterError::BadRequest(
                "gateway.body_limit_bytes must be between 1024 and 67108864".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            KbMeterError::BadRequest(format!(
                "gateway.listen must be a valid socket address ({}): {e}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "127.0.0.1:8000".into()
}
fn default_body_limit_bytes() -> usize {
    16 * 1024 * 1024
}

/// Knobs of the HTTP instrumentation middleware.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentationConfig {
    #[serde(default)]
    pub should_group_status_codes: bool,

    #[serde(default = "default_true")]
    pub should_ignore_untemplated: bool,

    #[serde(default = "default_true")]
    pub should_group_untemplated: bool,

    #[serde(default)]
    pub should_instrument_requests_inprogress: bool,

    /// Regular expressions matched against the handler label.
    #[serde(default = "default_excluded_handlers")]
    pub excluded_handlers: Vec<String>,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            should_group_status_codes: false,
            should_ignore_untemplated: true,
            should_group_untemplated: true,
            should_instrument_requests_inprogress: false,
            excluded_handlers: default_excluded_handlers(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl InstrumentationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.metrics_path.starts_with('/') {
            return Err(KbMeterError::BadRequest(
                "instrumentation.metrics_path must start with '/'".into(),
            ));
        }
        self.compile_excluded()?;
        Ok(())
    }

    pub fn compile_excluded(&self) -> Result<Vec<Regex>> {
        self.excluded_handlers
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    KbMeterError::BadRequest(format!(
                        "instrumentation.excluded_handlers has an invalid pattern ({p}): {e}"
                    ))
                })
            })
            .collect()
    }
}

fn default_true() -> bool {
    true
}
fn default_excluded_handlers() -> Vec<String> {
    vec!["/metrics".into()]
}
fn default_metrics_path() -> String {
    "/metrics".into()
}

/// KB session store (ask -> upload correlation).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_ms")]
    pub ttl_ms: u64,

    #[serde(default = "default_max_sessions")]
    pub max_entries: usize,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_session_ttl_ms(),
            max_entries: default_max_sessions(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1_000..=86_400_000).contains(&self.ttl_ms) {
            return Err(KbMeterError::BadRequest(
                "sessions.ttl_ms must be between 1000 and 86400000".into(),
            ));
        }
        if self.max_entries == 0 {
            return Err(KbMeterError::BadRequest(
                "sessions.max_entries must be at least 1".into(),
            ));
        }
        if !(1_000..=3_600_000).contains(&self.sweep_interval_ms) {
            return Err(KbMeterError::BadRequest(
                "sessions.sweep_interval_ms must be between 1000 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn default_session_ttl_ms() -> u64 {
    15 * 60 * 1000
}
fn default_max_sessions() -> usize {
    10_000
}
fn default_sweep_interval_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Uploads into this KB are never counted.
    #[serde(default = "default_reserved_kbname")]
    pub reserved_kbname: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            reserved_kbname: default_reserved_kbname(),
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reserved_kbname.trim().is_empty() {
            return Err(KbMeterError::BadRequest(
                "upload.reserved_kbname must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_reserved_kbname() -> String {
    PERSONAL_KB.into()
}
