//! Axum Middleware for HTTP Request Tracing and Metrics

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Metric label for a request: its route template, never the raw path.
pub fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Wrap every request in a span, record HTTP metrics and log completion.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(&request);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %route,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &route,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    if status.is_server_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request completed"
        );
    }

    response
}
