//! # Request/Response Logging Middleware
//!
//! Logs method, path, status, duration, and the request ID for every HTTP
//! request, with sensitive headers redacted. Body logging is deliberately
//! omitted: message text and credentials pass through this surface.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Headers that must never appear in logs.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key"];

/// Request/response logging middleware.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    let request_id = req
        .extensions()
        .get::<super::mw_req_stamp::RequestStamp>()
        .map(|s| s.id.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let header_summary: Vec<String> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            if SENSITIVE_HEADERS.iter().any(|h| name_lower == *h) {
                format!("{}=<redacted>", name)
            } else {
                format!("{}={}", name, value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect();

    tracing::debug!(
        request_id = %request_id,
        headers = ?header_summary,
        "[HTTP] --> {} {}{}",
        method,
        path,
        query.as_deref().map(|q| format!("?{q}")).unwrap_or_default(),
    );

    let res = next.run(req).await;

    let status = res.status();
    let elapsed = start.elapsed();
    if status.is_server_error() {
        warn!(
            request_id = %request_id,
            status = %status,
            "[HTTP] <-- {} {} {} ({}ms)",
            method,
            path,
            status,
            elapsed.as_millis(),
        );
    } else {
        info!(
            request_id = %request_id,
            status = %status,
            "[HTTP] <-- {} {} {} ({}ms)",
            method,
            path,
            status,
            elapsed.as_millis(),
        );
    }

    res
}
