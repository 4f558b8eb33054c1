//! OpenAPI Specification for the CSOS API

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{health, role_list, rules};
use crate::telemetry::metrics;
use crate::types::*;
use csos_core::UserRoles;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CSOS Rules API",
        description = "Role listing and declarative rule evaluation for the KSU CSOS development platform"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Roles", description = "Role assignments and the authorization gate"),
        (name = "Rules", description = "Routing, collision and approval rule sets"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        role_list::list_roles,
        rules::get_rules,
        rules::evaluate_rules,
        rules::cache_stats,
        rules::clear_cache,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            SuccessResponse,
            UserRoles, AllUserRoles, RoleListData,
            RuleDocumentData, EvaluateRequest, EvaluateData,
            CacheEntryView, CacheCountersView, CacheStatsData,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer JWT security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued by the identity backend"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
