//! Prometheus Metrics Definitions
//!
//! HTTP metrics are recorded by the observability middleware. Rule cache
//! metrics are copied from the cache's own counters when `/metrics` is
//! scraped.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use csos_storage::RuleCache;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, register_int_gauge_vec,
    CounterVec, Encoder, HistogramVec, IntGauge, IntGaugeVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<CsosMetrics>> = Lazy::new(CsosMetrics::new);

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all CSOS metrics.
#[derive(Clone)]
pub struct CsosMetrics {
    /// labels: method, path, status
    pub http_requests_total: CounterVec,

    /// labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cache events since startup - labels: event
    /// (hit, miss, remote_load, fallback_load, failure)
    pub rule_cache_events: IntGaugeVec,

    /// Documents currently cached
    pub rule_cache_entries: IntGauge,

    /// Age of each cached document - labels: key
    pub rule_cache_entry_age_ms: IntGaugeVec,
}

impl CsosMetrics {
    /// Create and register all metrics with the default registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "csos_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "csos_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            rule_cache_events: register_int_gauge_vec!(
                "csos_rule_cache_events",
                "Rule cache events since startup",
                &["event"]
            )
            .map_err(|e| registration_error("rule_cache_events", e))?,

            rule_cache_entries: register_int_gauge!(
                "csos_rule_cache_entries",
                "Rule documents currently cached"
            )
            .map_err(|e| registration_error("rule_cache_entries", e))?,

            rule_cache_entry_age_ms: register_int_gauge_vec!(
                "csos_rule_cache_entry_age_ms",
                "Age of each cached rule document in milliseconds",
                &["key"]
            )
            .map_err(|e| registration_error("rule_cache_entry_age_ms", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Copy the cache's counters and entry ages into the gauges.
    pub fn observe_rule_cache(&self, cache: &RuleCache) {
        let counters = cache.counters();
        for (event, value) in [
            ("hit", counters.hits),
            ("miss", counters.misses),
            ("remote_load", counters.remote_loads),
            ("fallback_load", counters.fallback_loads),
            ("failure", counters.failures),
        ] {
            self.rule_cache_events
                .with_label_values(&[event])
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        }

        let stats = cache.stats();
        self.rule_cache_entries
            .set(i64::try_from(stats.len()).unwrap_or(i64::MAX));
        // Cleared keys must not keep reporting their last age.
        self.rule_cache_entry_age_ms.reset();
        for entry in stats {
            self.rule_cache_entry_age_ms
                .with_label_values(&[entry.key.as_str()])
                .set(i64::try_from(entry.age_ms).unwrap_or(i64::MAX));
        }
    }
}

/// Handler for GET /metrics endpoint.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler(State(cache): State<Arc<RuleCache>>) -> impl IntoResponse {
    match METRICS.as_ref() {
        Ok(metrics) => metrics.observe_rule_cache(&cache),
        Err(e) => tracing::error!(error = %e, "Metrics registry unavailable"),
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
