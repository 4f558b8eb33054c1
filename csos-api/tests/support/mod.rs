//! Shared wiring for end-to-end router tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use csos_api::{
    create_api_router, generate_jwt_token, ApiConfig, AppState, AuthConfig, FixedClock,
    InMemoryRoleStore,
};
use csos_core::UserId;
use csos_test_utils::{role_fixture, user, CacheHarness};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "csos-integration-test-secret-0123456789abcdef";

/// 2024-01-01 00:00:00 UTC
pub const NOW: i64 = 1_704_067_200;

pub fn admin() -> UserId {
    user(1)
}

pub fn officer() -> UserId {
    user(2)
}

pub fn viewer_officer() -> UserId {
    user(3)
}

pub fn super_admin() -> UserId {
    user(4)
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::with_secret(TEST_SECRET, Arc::new(FixedClock(NOW))).expect("test secret")
}

/// Full application router over fixture rules and the fixture role table.
pub struct TestApp {
    pub router: Router,
    pub harness: CacheHarness,
    pub auth: AuthConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_harness(CacheHarness::with_fixtures())
    }

    pub fn with_harness(harness: CacheHarness) -> Self {
        let auth = auth_config();
        let state = AppState::new(
            harness.cache.clone(),
            Arc::new(InMemoryRoleStore::new(role_fixture())),
            auth.clone(),
            ApiConfig::default(),
        );
        let router = create_api_router(state).expect("router builds outside production");
        Self {
            router,
            harness,
            auth,
        }
    }

    pub fn token_for(&self, user_id: UserId) -> String {
        generate_jwt_token(&self.auth, user_id, None).expect("token")
    }

    /// Send a request, returning status and parsed JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get_as(&self, user_id: UserId, uri: &str) -> (StatusCode, Value) {
        let token = self.token_for(user_id);
        self.send(Method::GET, uri, Some(&token), None).await
    }
}
