//! Request and response bodies.
//!
//! Successful responses are wrapped as `{"success": true, "data": ...}`.

use csos_core::{Rule, RuleDocument, RuleSetKind, UserId, UserRoles};
use csos_storage::{CacheCounters, CacheEntryStats};
use serde::{Deserialize, Serialize};

/// Success envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Body of responses that carry no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// ============================================================================
// ROLE LIST
// ============================================================================

/// Query string of `GET /role_list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct RoleListQuery {
    /// User whose roles to list; omitted lists every user
    pub user_id: Option<String>,
}

/// Every user and their roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AllUserRoles {
    pub total_users: usize,
    pub users: Vec<UserRoles>,
}

/// Data of a `GET /role_list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum RoleListData {
    Single(UserRoles),
    All(AllUserRoles),
}

impl RoleListData {
    pub fn single(user_id: UserId, roles: Vec<String>) -> Self {
        RoleListData::Single(UserRoles { user_id, roles })
    }

    pub fn all(users: Vec<UserRoles>) -> Self {
        RoleListData::All(AllUserRoles {
            total_users: users.len(),
            users,
        })
    }
}

// ============================================================================
// RULES
// ============================================================================

/// A cached rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RuleDocumentData {
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "routing_rules"))]
    pub key: RuleSetKind,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub document: RuleDocument,
}

/// Body of `POST /rules/{kind}/evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EvaluateRequest {
    /// Fact object the rule conditions are checked against
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub facts: serde_json::Value,
}

/// Outcome of evaluating one rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EvaluateData {
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "approval_thresholds"))]
    pub key: RuleSetKind,
    /// Highest-priority matching rule
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub matched: Option<Rule>,
    /// Every matching rule, highest priority first
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub matches: Vec<Rule>,
}

/// One cache entry as reported by `GET /rules/cache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryView {
    pub key: String,
    pub age_ms: u64,
}

impl From<CacheEntryStats> for CacheEntryView {
    fn from(stats: CacheEntryStats) -> Self {
        Self {
            key: stats.key,
            age_ms: stats.age_ms,
        }
    }
}

/// Cache counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CacheCountersView {
    pub hits: u64,
    pub misses: u64,
    pub remote_loads: u64,
    pub fallback_loads: u64,
    pub failures: u64,
}

impl From<CacheCounters> for CacheCountersView {
    fn from(c: CacheCounters) -> Self {
        Self {
            hits: c.hits,
            misses: c.misses,
            remote_loads: c.remote_loads,
            fallback_loads: c.fallback_loads,
            failures: c.failures,
        }
    }
}

/// Data of a `GET /rules/cache` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStatsData {
    pub entries: Vec<CacheEntryView>,
    pub counters: CacheCountersView,
}
