//! CSOS API - REST layer for the KSU CSOS rules service
//!
//! Exposes the role listing endpoint and the rule set endpoints over Axum.
//! Rule documents come from the `csos-storage` cache; role assignments come
//! from a [`RoleStore`], normally the backend's REST interface.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod role_store;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use auth::{
    authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, Claims,
    FixedClock, JwtClock,
};
pub use config::{ApiConfig, BackendConfig, RulesConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use openapi::ApiDoc;
pub use role_store::{InMemoryRoleStore, RestRoleStore, RoleStore, RoleStoreError};
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
