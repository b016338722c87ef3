//! Response construction.
//!
//! The success shape is fixed by the public contract: a JSON body with
//! `Message` and `CurrentVisitorCount` members, `application/json` content
//! type, and the configured CORS allow-origin header. Every failure
//! collapses to a generic plaintext 500; causes go to the log, not to the
//! caller.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Payload returned by the counter endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitResponse {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "CurrentVisitorCount")]
    pub current_visitor_count: u64,
}

/// 200 with the JSON payload and the fixed CORS header.
pub fn success(payload: &VisitResponse, allow_origin: &str) -> Response {
    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize visit response");
            return internal_error();
        }
    };
    let origin = match HeaderValue::from_str(allow_origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::error!(error = %e, allow_origin, "configured allow_origin is not a valid header value");
            return internal_error();
        }
    };

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin)
        .body(Body::from(body))
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "failed to build visit response");
            internal_error()
        }
    }
}

/// Generic 500: plaintext, no structured error payload.
pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

/// 401 for requests that fail the configured API key check.
pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}
