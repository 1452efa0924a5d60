//! Helpers shared by the HTTP integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use kbmeter_gateway::{app_state::AppState, config, router::build_router};

pub const BOUNDARY: &str = "kbmeter-test-boundary";

pub fn app(yaml: &str) -> Router {
    let state = AppState::new(cfg(yaml)).expect("state must build");
    build_router(state).expect("router must build")
}

pub fn cfg(yaml: &str) -> config::GatewayConfig {
    config::load_from_str(yaml).expect("test config must parse")
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("body must be json")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("body must be utf-8")
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> Reply {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    Reply { status, headers, body }
}

pub fn post_json(path: &str, body: &str, session: Option<&str>) -> Request<Body> {
    let mut b = Request::post(path).header(CONTENT_TYPE, "application/json");
    if let Some(s) = session {
        b = b.header("x-kb-session", s);
    }
    b.body(Body::from(body.to_string())).unwrap()
}

pub fn post_form(
    path: &str,
    kbname: Option<&str>,
    file: Option<(&str, &str)>,
    session: Option<&str>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some(k) = kbname {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"kbname\"\r\n\r\n{k}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut b = Request::post(path).header(
        CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(s) = session {
        b = b.header("x-kb-session", s);
    }
    b.body(Body::from(body)).unwrap()
}

pub async fn scrape(app: &Router) -> String {
    let reply = send(app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.text()
}

/// Value of the first series of `name` carrying every `labels` pair.
pub fn series(text: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let prefix = format!("{name}{{");
    text.lines()
        .filter(|l| l.starts_with(&prefix))
        .find(|l| labels.iter().all(|(k, v)| l.contains(&format!("{k}=\"{v}\""))))
        .and_then(|l| l.rsplit(' ').next())
        .map(|v| v.parse().expect("sample value must be numeric"))
}
