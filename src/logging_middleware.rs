// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode
//!
//! Credentials and tokens are redacted before anything reaches the log.

use axum::body::to_bytes;
use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, Level};

use crate::common::helpers::redact_sensitive;

/// Bodies above this size are passed through unlogged
const MAX_LOGGED_BODY: usize = 64 * 1024;

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Redacted, pretty-printed JSON body; `None` when it is not JSON
fn redacted_body(bytes: &Bytes) -> Option<String> {
    let mut json = serde_json::from_slice::<serde_json::Value>(bytes).ok()?;
    redact_sensitive(&mut json);
    serde_json::to_string_pretty(&json).ok()
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !tracing::enabled!(Level::DEBUG) || !is_json(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_LOGGED_BODY)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    if let Some(body) = redacted_body(&bytes) {
        debug!(method = %parts.method, uri = %parts.uri, request_body = %body, "📥 Request");
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    if !is_json(response.headers()) {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(body) = redacted_body(&bytes) {
        debug!(status = %parts.status, response_body = %body, "📤 Response");
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
