//! Per-request tracing.
//!
//! Every request runs inside an `http.request` span carrying a request id,
//! so repository `debug!` lines can be tied back to the call that caused
//! them. The id is taken from `x-request-id` when the client sends one.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request id we accept.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Returns the caller's request id, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn request_tracing_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let request_id = request_id(request.headers());

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
        store = %state.config.store_name,
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    let status = response.status();

    span.in_scope(|| {
        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "Request failed");
        } else {
            info!(status = status.as_u16(), latency_ms, "Request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_passthrough() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("till-2-0042"));
        assert_eq!(request_id(&headers), "till-2-0042");
    }

    #[test]
    fn test_request_id_generated_when_missing_or_oversized() {
        let generated = request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&generated).is_ok());

        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_ne!(request_id(&headers), long);
    }
}
