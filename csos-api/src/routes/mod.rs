//! REST API Routes Module
//!
//! - `/role_list` and `/rules/*`: authenticated
//! - `/health/*`, `/metrics`, `/openapi.json`: public

pub mod health;
pub mod role_list;
pub mod rules;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::{is_production_environment, ApiConfig};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use role_list::create_router as role_list_router;
pub use rules::create_router as rules_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::new(
            crate::error::ErrorCode::ConfigurationError,
            "CORS origins not configured for production. Set CSOS_CORS_ORIGINS.",
        ));
    }
    Ok(())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builds the application router with authentication on every non-public
/// route.
///
/// # Middleware Order (outer to inner)
/// 1. CORS
/// 2. HTTP trace layer
/// 3. Observability (span, metrics, completion log)
/// 4. Auth (only on `/role_list` and `/rules/*`)
pub struct SecureRouterBuilder {
    state: AppState,
    auth_state: AuthMiddlewareState,
}

impl SecureRouterBuilder {
    /// In production, refuses insecure auth or CORS settings.
    pub fn new(state: AppState) -> ApiResult<Self> {
        if is_production_environment() {
            state.auth_config.validate_for_production()?;
            validate_api_config_for_production(&state.api_config)?;
        }

        let auth_state = AuthMiddlewareState::new(state.auth_config.clone(), state.roles.clone());
        Ok(Self { state, auth_state })
    }

    fn build_protected_routes(&self) -> Router {
        Router::new()
            .merge(role_list::create_router(self.state.roles.clone()))
            .nest("/rules", rules::create_router(self.state.cache.clone()))
            .layer(from_fn_with_state(self.auth_state.clone(), auth_middleware))
    }

    fn build_public_routes(&self) -> Router {
        let metrics = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.cache.clone());

        Router::new()
            .nest(
                "/health",
                health::create_router(self.state.cache.clone(), self.state.start_time),
            )
            .merge(metrics)
            .route("/openapi.json", get(openapi_json))
    }

    pub fn build(self) -> Router {
        let cors = build_cors_layer(&self.state.api_config);

        Router::new()
            .merge(self.build_protected_routes())
            .merge(self.build_public_routes())
            .layer(from_fn(observability_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Empty origin list allows any origin (development); otherwise only the
/// listed origins.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricted origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Build the complete router from application state.
pub fn create_api_router(state: AppState) -> ApiResult<Router> {
    SecureRouterBuilder::new(state).map(SecureRouterBuilder::build)
}
