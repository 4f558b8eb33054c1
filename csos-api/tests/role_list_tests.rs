//! End-to-end tests for `GET /role_list`.

mod support;

use axum::http::{Method, StatusCode};
use csos_test_utils::user;
use support::*;

#[tokio::test]
async fn test_officer_reads_own_roles() {
    let app = TestApp::new();

    let (status, body) = app.get_as(viewer_officer(), "/role_list").await;
    // No userId lists everyone, which an officer may not do.
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FORBIDDEN");

    let uri = format!("/role_list?userId={}", viewer_officer());
    let (status, body) = app.get_as(viewer_officer(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["userId"], viewer_officer().to_string());
    assert_eq!(
        body["data"]["roles"],
        serde_json::json!(["development_officer", "viewer"])
    );
}

#[tokio::test]
async fn test_officer_cannot_read_other_users() {
    let app = TestApp::new();

    let uri = format!("/role_list?userId={}", admin());
    let (status, body) = app.get_as(officer(), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(body["error"], "Admin role required to view other users' roles");
}

#[tokio::test]
async fn test_admin_reads_another_user() {
    let app = TestApp::new();

    let uri = format!("/role_list?userId={}", officer());
    let (status, body) = app.get_as(admin(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], officer().to_string());
    assert_eq!(body["data"]["roles"], serde_json::json!(["development_officer"]));
}

#[tokio::test]
async fn test_unknown_user_has_no_roles() {
    let app = TestApp::new();

    let uri = format!("/role_list?userId={}", user(99));
    let (status, body) = app.get_as(super_admin(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], serde_json::json!([]));
}

#[tokio::test]
async fn test_admin_lists_every_user() {
    let app = TestApp::new();

    let (status, body) = app.get_as(admin(), "/role_list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 4);

    let users = body["data"]["users"].as_array().expect("users array");
    assert_eq!(users.len(), 4);
    let third = users
        .iter()
        .find(|u| u["userId"] == viewer_officer().to_string())
        .expect("user 3 listed");
    assert_eq!(third["roles"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_blank_user_id_lists_everyone() {
    let app = TestApp::new();

    let (status, body) = app.get_as(super_admin(), "/role_list?userId=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 4);
}

#[tokio::test]
async fn test_malformed_user_id_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.get_as(admin(), "/role_list?userId=not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/role_list", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::new();
    let other = csos_api::AuthConfig::with_secret(
        "a-completely-different-secret-for-signing",
        std::sync::Arc::new(csos_api::FixedClock(NOW)),
    )
    .expect("config");
    let token = csos_api::generate_jwt_token(&other, admin(), None).expect("token");

    let (status, body) = app
        .send(Method::GET, "/role_list", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_repeated_user_id_gets_json_error() {
    let app = TestApp::new();

    let uri = format!("/role_list?userId={0}&userId={0}", admin());
    let (status, body) = app.get_as(admin(), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(body["error"].is_string());
}
