// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Sign-up and sign-in issue a session token and cookie
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use maintenance_tracker::services::IdentityProvider;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{authed_request, body_json, create_test_app, create_test_jwt, unique_uid};

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/vehicles")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", "not-a-jwt", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let app = create_test_app();
    let token = maintenance_tracker::middleware::auth::create_jwt(
        "someone",
        "someone@example.com",
        b"a_completely_different_key_32b!!",
        1,
    )
    .unwrap();

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/vehicles", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let app = create_test_app();
    let token = create_test_jwt(&unique_uid());

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/tasks")
                .header(header::COOKIE, format!("garage_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_sign_up_issues_session_and_profile() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/auth/signup",
            json!({
                "email": "Driver@Example.com",
                "password": "hunter22",
                "displayName": "Dana Driver"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("garage_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"), "test frontend is plain http");

    let body = body_json(response).await;
    assert_eq!(body["email"], "driver@example.com");
    assert_eq!(body["displayName"], "Dana Driver");
    let token = body["token"].as_str().unwrap().to_string();

    // Profile was provisioned with zeroed counters
    let response = app
        .router
        .oneshot(authed_request("GET", "/api/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["email"], "driver@example.com");
    assert_eq!(profile["displayName"], "Dana Driver");
    assert_eq!(profile["vehicleCount"], 0);
    assert_eq!(profile["maintenanceTaskCount"], 0);
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let app = create_test_app();
    let body = json!({ "email": "dup@example.com", "password": "hunter22" });

    let first = app
        .router
        .clone()
        .oneshot(json_request("/auth/signup", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .router
        .oneshot(json_request("/auth/signup", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let error = body_json(second).await;
    assert_eq!(error["error"], "identity_error");
    assert!(error["details"]
        .as_str()
        .unwrap()
        .contains("already exists"));
}

#[tokio::test]
async fn test_sign_up_rejects_malformed_email() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(json_request(
            "/auth/signup",
            json!({ "email": "not-an-email", "password": "hunter22" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_wrong_password() {
    let app = create_test_app();
    app.identity.sign_up("wrong@example.com", "correct-horse", None).await.unwrap();

    let response = app
        .router
        .oneshot(json_request(
            "/auth/signin",
            json!({ "email": "wrong@example.com", "password": "battery-staple" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_sign_in_then_refresh() {
    let app = create_test_app();
    app.identity.sign_up("refresh@example.com", "correct-horse", None).await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/auth/signin",
            json!({ "email": "refresh@example.com", "password": "correct-horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    let uid = body["uid"].as_str().unwrap().to_string();

    let response = app
        .router
        .oneshot(authed_request("POST", "/auth/refresh", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let refreshed = body_json(response).await;
    assert_eq!(refreshed["uid"], uid);
    assert_eq!(refreshed["email"], "refresh@example.com");
}

#[tokio::test]
async fn test_sign_out_clears_cookie() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/signout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/vehicles")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    let methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("PATCH"));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/vehicles")
                .header(header::ORIGIN, "https://evil.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
