//! Request handlers for the counter service.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::counter::VisitorCounter;
use crate::http::response::{self, VisitResponse};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::storage::StorageResult;

/// Query parameters accepted by the counter endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct VisitParams {
    /// API key, platform-style: `?code=...` as an alternative to the header.
    pub code: Option<String>,
}

/// Counter endpoint: GET or POST, no required body or parameters.
pub async fn record_visit(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<VisitParams>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let request_id = headers
        .get(crate::http::request::X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    if let Some(required) = &state.config.http.api_key {
        if !api_key_matches(required, &headers, params.code.as_deref()) {
            tracing::warn!(request_id = %request_id, "rejected request without a valid API key");
            metrics::record_request(method.as_str(), 401, start);
            return response::unauthorized();
        }
    }

    match visit(&state).await {
        Ok(count) => {
            tracing::info!(request_id = %request_id, count, "visit recorded");
            metrics::record_request(method.as_str(), 200, start);
            metrics::record_visitor_count(count);
            response::success(
                &VisitResponse {
                    message: state.config.http.message.clone(),
                    current_visitor_count: count,
                },
                &state.config.http.allow_origin,
            )
        }
        Err(e) => {
            // NotFound never reaches here; it is the initialization path.
            // Everything else collapses into a generic internal error.
            tracing::error!(request_id = %request_id, error = %e, "failed to record visit");
            metrics::record_request(method.as_str(), 500, start);
            response::internal_error()
        }
    }
}

async fn visit(state: &AppState) -> StorageResult<u64> {
    let store = state.stores.store()?;
    VisitorCounter::new(store, &state.config.storage)
        .record_visit()
        .await
}

fn api_key_matches(required: &str, headers: &HeaderMap, code: Option<&str>) -> bool {
    let header_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    header_key == Some(required) || code == Some(required)
}

/// Liveness probe. Independent of storage health.
pub async fn health() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_accepted_from_header_or_query() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("sekrit"));
        assert!(api_key_matches("sekrit", &headers, None));
        assert!(api_key_matches("sekrit", &HeaderMap::new(), Some("sekrit")));
    }

    #[test]
    fn api_key_mismatch_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("wrong"));
        assert!(!api_key_matches("sekrit", &headers, None));
        assert!(!api_key_matches("sekrit", &HeaderMap::new(), Some("wrong")));
        assert!(!api_key_matches("sekrit", &HeaderMap::new(), None));
    }
}
