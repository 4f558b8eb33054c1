//! Role lookups for the authorization gate.
//!
//! [`RestRoleStore`] reads the backend's `user_roles` table over its REST
//! interface using the service credential. [`InMemoryRoleStore`] serves a
//! fixed table for development and tests.

use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use csos_core::{RoleAssignment, UserId};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

const USER_AGENT_VALUE: &str = concat!("csos-api/", env!("CARGO_PKG_VERSION"));

/// Failure talking to the role backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleStoreError {
    #[error("role backend request failed: {0}")]
    Request(String),

    #[error("role backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("role backend returned an unreadable payload: {0}")]
    Decode(String),

    #[error("role backend client error: {0}")]
    Client(String),
}

/// Source of truth for role assignments.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Roles held by one user, without duplicates.
    async fn roles_for(&self, user_id: UserId) -> Result<Vec<String>, RoleStoreError>;

    /// Every `(user, role)` row.
    async fn all_assignments(&self) -> Result<Vec<RoleAssignment>, RoleStoreError>;
}

fn dedup_roles(rows: impl IntoIterator<Item = RoleAssignment>) -> Vec<String> {
    let mut roles: Vec<String> = Vec::new();
    for row in rows {
        if !roles.contains(&row.role) {
            roles.push(row.role);
        }
    }
    roles
}

// ============================================================================
// REST BACKEND
// ============================================================================

/// Role store backed by the `user_roles` table of the REST backend.
#[derive(Clone)]
pub struct RestRoleStore {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

impl fmt::Debug for RestRoleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRoleStore")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

impl RestRoleStore {
    pub fn new(
        base_url: &str,
        service_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, RoleStoreError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| RoleStoreError::Client(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    async fn query(&self, filter: &[(&str, String)]) -> Result<Vec<RoleAssignment>, RoleStoreError> {
        let url = format!("{}/rest/v1/user_roles", self.base_url);
        debug!(url = %url, ?filter, "querying role backend");

        let key = self.service_key.expose_secret();
        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .query(&[("select", "user_id,role")])
            .query(filter)
            .send()
            .await
            .map_err(|e| RoleStoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoleStoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<RoleAssignment>>()
            .await
            .map_err(|e| RoleStoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RoleStore for RestRoleStore {
    async fn roles_for(&self, user_id: UserId) -> Result<Vec<String>, RoleStoreError> {
        let rows = self
            .query(&[("user_id", format!("eq.{}", user_id))])
            .await?;
        Ok(dedup_roles(rows))
    }

    async fn all_assignments(&self) -> Result<Vec<RoleAssignment>, RoleStoreError> {
        self.query(&[("order", "user_id.asc".to_string())]).await
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Fixed role table held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    rows: RwLock<Vec<RoleAssignment>>,
}

impl InMemoryRoleStore {
    pub fn new(rows: Vec<RoleAssignment>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn assign(&self, user_id: UserId, role: impl Into<String>) {
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(RoleAssignment {
                user_id,
                role: role.into(),
            });
    }

    fn snapshot(&self) -> Vec<RoleAssignment> {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn roles_for(&self, user_id: UserId) -> Result<Vec<String>, RoleStoreError> {
        Ok(dedup_roles(
            self.snapshot().into_iter().filter(|row| row.user_id == user_id),
        ))
    }

    async fn all_assignments(&self) -> Result<Vec<RoleAssignment>, RoleStoreError> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rest_store(server: &MockServer) -> RestRoleStore {
        RestRoleStore::new(
            &server.uri(),
            SecretString::new("service-key".into()),
            Duration::from_secs(5),
        )
        .expect("client builds")
    }

    #[tokio::test]
    async fn test_rest_roles_for_filters_by_user() {
        let server = MockServer::start().await;
        let user = Uuid::from_u128(7);
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .and(query_param("select", "user_id,role"))
            .and(query_param("user_id", format!("eq.{}", user).as_str()))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user_id": user, "role": "development_officer" },
                { "user_id": user, "role": "viewer" },
                { "user_id": user, "role": "viewer" },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let roles = rest_store(&server)
            .roles_for(user)
            .await
            .expect("roles load");
        assert_eq!(roles, vec!["development_officer", "viewer"]);
    }

    #[tokio::test]
    async fn test_rest_all_assignments() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/v1/user_roles"))
            .and(query_param("order", "user_id.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user_id": Uuid::from_u128(1), "role": "admin" },
                { "user_id": Uuid::from_u128(2), "role": "viewer" },
            ])))
            .mount(&server)
            .await;

        let rows = rest_store(&server)
            .all_assignments()
            .await
            .expect("rows load");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, "admin");
    }

    #[tokio::test]
    async fn test_rest_error_status() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = rest_store(&server)
            .all_assignments()
            .await
            .expect_err("backend rejects");
        assert_eq!(
            err,
            RoleStoreError::Status {
                status: 401,
                body: "invalid api key".into()
            }
        );
    }

    #[tokio::test]
    async fn test_rest_decode_error() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [] })))
            .mount(&server)
            .await;

        let err = rest_store(&server)
            .all_assignments()
            .await
            .expect_err("not an array");
        assert!(matches!(err, RoleStoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryRoleStore::default();
        let a = Uuid::from_u128(1);
        store.assign(a, "admin");
        store.assign(a, "admin");
        store.assign(Uuid::from_u128(2), "viewer");

        assert_eq!(store.roles_for(a).await.expect("roles"), vec!["admin"]);
        assert!(store
            .roles_for(Uuid::from_u128(3))
            .await
            .expect("roles")
            .is_empty());
        assert_eq!(store.all_assignments().await.expect("rows").len(), 3);
    }
}
