//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check with version and uptime
//! - /health/ready - Every rule set can be served
//!
//! No authentication required for health endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use csos_core::RuleSetKind;
use csos_storage::RuleCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ComponentHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub cache: Arc<RuleCache>,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(cache: Arc<RuleCache>, start_time: Instant) -> Self {
        Self { cache, start_time }
    }

    fn details(&self, rules: Vec<ComponentHealth>) -> HealthDetails {
        HealthDetails {
            rules,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
)]
pub async fn liveness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: Some(state.details(Vec::new())),
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (every rule set loads)
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Service is not ready", body = HealthResponse),
    ),
)]
pub async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let mut rules = Vec::with_capacity(RuleSetKind::ALL.len());
    for kind in RuleSetKind::ALL {
        rules.push(check_rule_set(&state.cache, kind).await);
    }

    let overall_status = if rules.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(state.details(rules)),
    };

    let status_code = if overall_status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

async fn check_rule_set(cache: &RuleCache, kind: RuleSetKind) -> ComponentHealth {
    let start = Instant::now();

    match cache.get(kind).await {
        Ok(_) => ComponentHealth {
            name: kind.to_string(),
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => ComponentHealth {
            name: kind.to_string(),
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(e.to_string()),
        },
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no auth required)
pub fn create_router(cache: Arc<RuleCache>, start_time: Instant) -> Router {
    let state = Arc::new(HealthState::new(cache, start_time));

    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}
