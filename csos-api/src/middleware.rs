//! Axum Middleware for Authentication
//!
//! [`auth_middleware`] verifies the bearer token, resolves the caller's roles
//! from the [`RoleStore`] and injects an [`AuthContext`] into request
//! extensions. Handlers read it back with [`AuthExtractor`].

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::error::ApiError;
use crate::role_store::RoleStore;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for the authentication middleware.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
    pub roles: Arc<dyn RoleStore>,
}

impl std::fmt::Debug for AuthMiddlewareState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddlewareState")
            .field("auth_config", &self.auth_config)
            .field("roles", &"<RoleStore>")
            .finish()
    }
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig, roles: Arc<dyn RoleStore>) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
            roles,
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Authenticate the request and attach the caller's [`AuthContext`].
///
/// Every failure is answered here as an [`ApiError`] response; the handler
/// never runs for an unauthenticated request.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let identity = authenticate(&state.auth_config, auth_header).map_err(AuthMiddlewareError)?;

    let roles = state
        .roles
        .roles_for(identity.user_id)
        .await
        .map_err(|e| AuthMiddlewareError(e.into()))?;

    let auth_context = identity.with_roles(roles);
    tracing::debug!(
        user_id = %auth_context.user_id,
        roles = ?auth_context.roles,
        "request authenticated"
    );

    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Middleware rejection, rendered with the status of its [`ApiError`] code.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed extractor for the authenticated caller.
///
/// Requires [`auth_middleware`] on the route; without it extraction fails
/// with a 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
