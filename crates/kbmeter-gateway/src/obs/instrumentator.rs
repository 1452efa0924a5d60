//! HTTP instrumentation middleware.
//!
//! The middleware buffers each request body once, runs the handler, then hands
//! the buffered request, the response status and the response extensions to
//! every registered `Instrumentation` hook. Hooks run after the handler
//! returned and before the response leaves the process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::{Body, HttpBody},
    extract::{FromRequest, MatchedPath, Multipart, Request, State},
    http::{header::CONTENT_TYPE, Extensions, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use prometheus::IntGaugeVec;
use regex::Regex;
use serde::de::DeserializeOwned;

use kbmeter_core::error::{KbMeterError, Result};

use crate::config::InstrumentationConfig;
use crate::error::ApiError;
use crate::obs::default_metrics::DefaultMetrics;
use crate::obs::registry::{MetricsRegistry, RegistryError};

/// Handler label for requests that matched no declared route.
pub const UNTEMPLATED_HANDLER: &str = "none";

/// Request as seen by the instrumentation hooks, with its body buffered.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Request extensions as the handler saw them (body limit, matched path).
    pub extensions: Extensions,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Re-read the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| KbMeterError::BadRequest(format!("body is not valid json: {e}")))
    }

    /// Re-read the body as multipart form data and return the text of `field`.
    pub async fn form_text(&self, field: &str) -> Result<Option<String>> {
        let mut multipart = Multipart::from_request(self.to_request(), &())
            .await
            .map_err(|e| KbMeterError::BadRequest(format!("body is not a form: {}", e.body_text())))?;

        while let Some(f) = multipart
            .next_field()
            .await
            .map_err(|e| KbMeterError::BadRequest(format!("form read failed: {e}")))?
        {
            if f.name() == Some(field) {
                let text = f
                    .text()
                    .await
                    .map_err(|e| KbMeterError::BadRequest(format!("form field {field}: {e}")))?;
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    fn to_request(&self) -> Request {
        let mut req = Request::new(Body::from(self.body.clone()));
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.headers_mut() = self.headers.clone();
        *req.extensions_mut() = self.extensions.clone();
        req
    }
}

/// Everything a hook knows about one completed request.
pub struct Info<'a> {
    pub request: &'a CapturedRequest,
    /// Route template, or `none` for untemplated requests.
    pub handler: &'a str,
    pub status: StatusCode,
    /// `200` or `2xx`, depending on `should_group_status_codes`.
    pub status_label: &'a str,
    pub duration: Duration,
    /// Response body length when known up front, else 0.
    pub response_size: u64,
    /// Per-request transient state the handler attached to its response.
    pub state: &'a Extensions,
}

impl Info<'_> {
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }
}

/// A post-response instrumentation hook.
#[async_trait]
pub trait Instrumentation: Send + Sync {
    fn name(&self) -> &'static str;
    async fn instrument(&self, info: &Info<'_>);
}

pub struct Instrumentator {
    opts: InstrumentationConfig,
    excluded: Vec<Regex>,
    registry: Arc<MetricsRegistry>,
    hooks: Vec<Arc<dyn Instrumentation>>,
    custom: bool,
    inprogress: Option<IntGaugeVec>,
    body_limit: usize,
}

impl Instrumentator {
    pub fn new(
        registry: Arc<MetricsRegistry>,
        opts: &InstrumentationConfig,
        body_limit: usize,
    ) -> Result<Self> {
        let excluded = opts.compile_excluded()?;
        let inprogress = if opts.should_instrument_requests_inprogress {
            match registry.register_int_gauge_vec(
                "http_requests_inprogress",
                "Number of HTTP requests in progress.",
                &["method", "handler"],
            ) {
                Ok(g) => Some(g),
                Err(RegistryError::Duplicate { name }) => {
                    tracing::warn!(metric = %name, "in-progress gauge already registered, not tracked");
                    None
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };

        Ok(Self {
            opts: opts.clone(),
            excluded,
            registry,
            hooks: Vec::new(),
            custom: false,
            inprogress,
            body_limit,
        })
    }

    /// Add a custom hook. Once one is added the default metric set is not
    /// installed. `None` stands for a hook skipped because the registry
    /// already held its metrics; it still keeps the default set out.
    pub fn add_registered(mut self, hook: Option<Arc<dyn Instrumentation>>) -> Self {
        self.custom = true;
        self.hooks.extend(hook);
        self
    }

    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Wrap every route currently in `router` with the middleware.
    ///
    /// Routes added afterwards (such as the scrape route) are not instrumented.
    pub fn instrument(mut self, router: Router) -> Result<Router> {
        if !self.custom {
            if let Some(defaults) = DefaultMetrics::register(&self.registry)? {
                self.hooks.push(Arc::new(defaults));
            }
        }
        tracing::info!(hooks = ?self.hook_names(), "http instrumentation installed");
        Ok(router.layer(middleware::from_fn_with_state(Arc::new(self), track)))
    }

    pub fn is_excluded(&self, handler: &str) -> bool {
        self.excluded.iter().any(|r| r.is_match(handler))
    }

    fn handler_label(&self, req: &Request) -> Option<String> {
        if let Some(m) = req.extensions().get::<MatchedPath>() {
            return Some(m.as_str().to_string());
        }
        if self.opts.should_ignore_untemplated {
            return None;
        }
        if self.opts.should_group_untemplated {
            Some(UNTEMPLATED_HANDLER.to_string())
        } else {
            Some(req.uri().path().to_string())
        }
    }
}

/// Expose the registry on `path`.
pub fn expose(router: Router, registry: Arc<MetricsRegistry>, path: &str) -> Router {
    router.route(path, get(metrics_handler).with_state(registry))
}

async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.render() {
        Ok((content_type, text)) => ([(CONTENT_TYPE, content_type)], text).into_response(),
        Err(e) => ApiError(KbMeterError::Internal(format!("metrics render failed: {e}")))
            .into_response(),
    }
}

pub fn status_label(status: StatusCode, group: bool) -> String {
    if group {
        format!("{}xx", status.as_u16() / 100)
    } else {
        status.as_u16().to_string()
    }
}

async fn track(State(inst): State<Arc<Instrumentator>>, req: Request, next: Next) -> Response {
    let Some(handler) = inst.handler_label(&req) else {
        return next.run(req).await;
    };
    if inst.is_excluded(&handler) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, inst.body_limit).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(%handler, error = %e, "request body rejected before handler");
            return ApiError(KbMeterError::PayloadTooLarge).into_response();
        }
    };
    let captured = CapturedRequest {
        method: parts.method.clone(),
        uri: parts.uri.clone(),
        headers: parts.headers.clone(),
        extensions: parts.extensions.clone(),
        body: body.clone(),
    };
    let req = Request::from_parts(parts, Body::from(body));

    let method = captured.method.as_str().to_string();
    if let Some(g) = &inst.inprogress {
        g.with_label_values(&[method.as_str(), handler.as_str()]).inc();
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    if let Some(g) = &inst.inprogress {
        g.with_label_values(&[method.as_str(), handler.as_str()]).dec();
    }

    let status = response.status();
    let response_size = response.body().size_hint().exact().unwrap_or(0);
    let status_label = status_label(status, inst.opts.should_group_status_codes);
    let info = Info {
        request: &captured,
        handler: &handler,
        status,
        status_label: &status_label,
        duration,
        response_size,
        state: response.extensions(),
    };
    for hook in &inst.hooks {
        hook.instrument(&info).await;
    }

    response
}
