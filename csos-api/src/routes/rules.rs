//! Rule REST API Routes
//!
//! Read cached rule documents, evaluate a rule set against a fact object,
//! and inspect or clear the rule cache.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use csos_storage::RuleCache;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    extractors::{PathKind, ValidJson},
    middleware::AuthExtractor,
    types::{
        ApiResponse, CacheStatsData, EvaluateData, EvaluateRequest, RuleDocumentData,
        SuccessResponse,
    },
};

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Clone)]
pub struct RulesState {
    pub cache: Arc<RuleCache>,
}

impl RulesState {
    pub fn new(cache: Arc<RuleCache>) -> Self {
        Self { cache }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /rules/{kind} - Fetch a rule document through the cache
#[utoipa::path(
    get,
    path = "/rules/{kind}",
    tag = "Rules",
    params(("kind" = String, Path, description = "routing_rules, collision_rules or approval_thresholds")),
    responses(
        (status = 200, description = "Rule document", body = ApiResponse<RuleDocumentData>),
        (status = 400, description = "Unknown rule set or bad credentials", body = ApiError),
        (status = 500, description = "Rules could not be loaded", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_rules(
    State(state): State<Arc<RulesState>>,
    AuthExtractor(_auth): AuthExtractor,
    PathKind(kind): PathKind,
) -> ApiResult<impl IntoResponse> {
    let document = state.cache.get(kind).await?;

    Ok(Json(ApiResponse::ok(RuleDocumentData {
        key: kind,
        document: (*document).clone(),
    })))
}

/// POST /rules/{kind}/evaluate - Evaluate a rule set against facts
#[utoipa::path(
    post,
    path = "/rules/{kind}/evaluate",
    tag = "Rules",
    params(("kind" = String, Path, description = "routing_rules, collision_rules or approval_thresholds")),
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Matching rules, highest priority first", body = ApiResponse<EvaluateData>),
        (status = 400, description = "Unknown rule set, bad body or bad credentials", body = ApiError),
        (status = 500, description = "Rules could not be loaded or are malformed", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn evaluate_rules(
    State(state): State<Arc<RulesState>>,
    AuthExtractor(auth): AuthExtractor,
    PathKind(kind): PathKind,
    ValidJson(req): ValidJson<EvaluateRequest>,
) -> ApiResult<impl IntoResponse> {
    if !req.facts.is_object() {
        return Err(ApiError::invalid_format("facts", "a JSON object"));
    }

    let rule_set = state.cache.rule_set(kind).await?;
    let matches: Vec<_> = rule_set.evaluate_all(&req.facts).into_iter().cloned().collect();
    let matched = matches.first().cloned();

    tracing::debug!(
        user_id = %auth.user_id,
        %kind,
        matched = ?matched.as_ref().map(|r| &r.name),
        match_count = matches.len(),
        "rules evaluated"
    );

    Ok(Json(ApiResponse::ok(EvaluateData {
        key: kind,
        matched,
        matches,
    })))
}

/// GET /rules/cache - Cache entries and counters
#[utoipa::path(
    get,
    path = "/rules/cache",
    tag = "Rules",
    responses(
        (status = 200, description = "Cache snapshot", body = ApiResponse<CacheStatsData>),
        (status = 400, description = "Missing privilege or bad credentials", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn cache_stats(
    State(state): State<Arc<RulesState>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    auth.require_privileged()?;

    Ok(Json(ApiResponse::ok(CacheStatsData {
        entries: state.cache.stats().into_iter().map(Into::into).collect(),
        counters: state.cache.counters().into(),
    })))
}

/// DELETE /rules/cache - Drop every cached rule document
#[utoipa::path(
    delete,
    path = "/rules/cache",
    tag = "Rules",
    responses(
        (status = 200, description = "Cache cleared", body = SuccessResponse),
        (status = 400, description = "Missing privilege or bad credentials", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn clear_cache(
    State(state): State<Arc<RulesState>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    auth.require_privileged()?;

    state.cache.clear();
    tracing::info!(user_id = %auth.user_id, "rule cache cleared");

    Ok(Json(SuccessResponse::ok()))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Rule routes, to be nested under `/rules`.
pub fn create_router(cache: Arc<RuleCache>) -> Router {
    let state = Arc::new(RulesState::new(cache));

    Router::new()
        .route("/cache", get(cache_stats).delete(clear_cache))
        .route("/:kind", get(get_rules))
        .route("/:kind/evaluate", post(evaluate_rules))
        .with_state(state)
}
