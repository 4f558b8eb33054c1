//! Error Types for the CSOS API
//!
//! Every failure leaving a handler is an [`ApiError`], serialized as
//! `{"error": "<message>", "code": "<CODE>"}`. Client-side failures
//! (authentication, validation, authorization) answer 400; server-side
//! failures (rule loading, role backend, configuration) answer 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use csos_core::{ConfigError, RuleError};
use csos_storage::{LoadError, RuleCacheError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::role_store::RoleStoreError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error categories for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication / Authorization
    // ========================================================================
    /// No credentials supplied
    Unauthorized,

    /// Token is malformed or its signature does not verify
    InvalidToken,

    /// Token is past its expiry
    TokenExpired,

    /// Caller is authenticated but lacks a required role
    Forbidden,

    // ========================================================================
    // Validation
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Field format is incorrect
    InvalidFormat,

    /// Rule set name is not one of the known kinds
    UnknownRuleSet,

    // ========================================================================
    // Server
    // ========================================================================
    /// Rule documents could not be loaded or interpreted
    RuleLoadFailed,

    /// The role backend failed
    RoleBackendError,

    /// Server configuration is missing or invalid
    ConfigurationError,

    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized
            | ErrorCode::InvalidToken
            | ErrorCode::TokenExpired
            | ErrorCode::Forbidden
            | ErrorCode::InvalidInput
            | ErrorCode::InvalidFormat
            | ErrorCode::UnknownRuleSet => StatusCode::BAD_REQUEST,

            ErrorCode::RuleLoadFailed
            | ErrorCode::RoleBackendError
            | ErrorCode::ConfigurationError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::Forbidden => "Insufficient permissions",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::UnknownRuleSet => "Unknown rule set",
            ErrorCode::RuleLoadFailed => "Failed to load rules",
            ErrorCode::RoleBackendError => "Failed to query roles",
            ErrorCode::ConfigurationError => "Server is misconfigured",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Error category
    pub code: ErrorCode,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        tracing::error!(error = %err, "Rule load failed");
        ApiError::new(ErrorCode::RuleLoadFailed, err.to_string())
    }
}

impl From<RuleError> for ApiError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::UnknownRuleSet { .. } => {
                ApiError::new(ErrorCode::UnknownRuleSet, err.to_string())
            }
            RuleError::InvalidRuleSet { .. } => {
                tracing::error!(error = %err, "Rule document is invalid");
                ApiError::new(ErrorCode::RuleLoadFailed, err.to_string())
            }
        }
    }
}

impl From<RuleCacheError> for ApiError {
    fn from(err: RuleCacheError) -> Self {
        match err {
            RuleCacheError::Load(e) => e.into(),
            RuleCacheError::Rule(e) => e.into(),
        }
    }
}

impl From<RoleStoreError> for ApiError {
    fn from(err: RoleStoreError) -> Self {
        // The backend's message may carry table details; keep it in the log.
        tracing::error!(error = %err, "Role backend error");
        ApiError::from_code(ErrorCode::RoleBackendError)
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigurationError, err.to_string())
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
