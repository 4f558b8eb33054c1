//! Role Listing Route
//!
//! `GET /role_list` answers who holds which roles. Any caller may read their
//! own roles; reading another user's roles, or the whole table, needs
//! `admin` or `super_admin`.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use csos_core::{group_assignments, UserId};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    extractors::ValidQuery,
    middleware::AuthExtractor,
    role_store::RoleStore,
    types::{ApiResponse, RoleListData, RoleListQuery},
};

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Clone)]
pub struct RoleListState {
    pub roles: Arc<dyn RoleStore>,
}

impl RoleListState {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }
}

fn parse_user_id(raw: &str) -> ApiResult<UserId> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid_format("userId", "a UUID"))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /role_list - List roles for one user or for everyone
#[utoipa::path(
    get,
    path = "/role_list",
    tag = "Roles",
    params(RoleListQuery),
    responses(
        (status = 200, description = "Roles of the requested user, or of every user", body = ApiResponse<RoleListData>),
        (status = 400, description = "Malformed userId, bad credentials, or missing privilege", body = ApiError),
        (status = 500, description = "Role backend failure", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_roles(
    State(state): State<Arc<RoleListState>>,
    AuthExtractor(auth): AuthExtractor,
    ValidQuery(query): ValidQuery<RoleListQuery>,
) -> ApiResult<impl IntoResponse> {
    let target = query
        .user_id
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_user_id)
        .transpose()?;

    let data = match target {
        Some(user_id) if user_id == auth.user_id => {
            RoleListData::single(user_id, auth.roles.clone())
        }
        Some(user_id) => {
            if !auth.is_privileged() {
                tracing::info!(
                    caller = %auth.user_id,
                    target = %user_id,
                    "role lookup for another user denied"
                );
                return Err(ApiError::forbidden(
                    "Admin role required to view other users' roles",
                ));
            }
            let roles = state.roles.roles_for(user_id).await?;
            RoleListData::single(user_id, roles)
        }
        None => {
            if !auth.is_privileged() {
                return Err(ApiError::forbidden(
                    "Admin role required to list all user roles",
                ));
            }
            let assignments = state.roles.all_assignments().await?;
            RoleListData::all(group_assignments(assignments))
        }
    };

    Ok(Json(ApiResponse::ok(data)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Role routes; expects `auth_middleware` to be layered on by the caller.
pub fn create_router(roles: Arc<dyn RoleStore>) -> Router {
    let state = Arc::new(RoleListState::new(roles));

    Router::new()
        .route("/role_list", get(list_roles))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::from_u128(5);
        assert_eq!(parse_user_id(&id.to_string()).expect("valid"), id);
        assert_eq!(parse_user_id(&format!(" {} ", id)).expect("trimmed"), id);

        let err = parse_user_id("42").expect_err("not a uuid");
        assert!(err.message.contains("userId"));
    }
}
