// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Sessions are accepted from the cookie or a Bearer header
//! 3. CORS preflight requests return correct headers
//! 4. Sign-in methods that are not configured answer 503

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, create_test_jwt, json_request, send, set_cookie_headers};

#[tokio::test]
async fn test_protected_routes_without_token() {
    let (app, _) = create_test_app();

    for (method, uri) in [
        ("GET", "/api/me"),
        ("PUT", "/api/me/nickname"),
        ("GET", "/api/events"),
        ("POST", "/api/events"),
        ("PUT", "/api/events/some-id"),
        ("DELETE", "/api/events/some-id"),
    ] {
        let (status, body) = send(&app, json_request(method, uri, None, None)).await;
        assert_eq!(
            status,
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require auth"
        );
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let (status, body) = send(
        &app,
        json_request("GET", "/api/events", Some("invalid.token.here"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = create_test_app();
    let token = availability_calendar::middleware::auth::create_jwt(
        "alice",
        b"some_other_key_32_bytes_minimum!",
    )
    .unwrap();

    let (status, _) = send(&app, json_request("GET", "/api/me", Some(&token), None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let (app, _) = create_test_app();
    let token = create_test_jwt("alice");

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/me")
            .header(header::COOKIE, format!("calendar_token={token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "alice");
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, json_request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["sign_in_methods"], json!([]));
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/events")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
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
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_unknown_origin_not_allowed() {
    let (app, _) = create_test_app();

    for origin in [
        "https://evil.example.com",
        "http://localhost.evil.com",
        "http://127.0.0.1.evil.com",
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/events")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none(),
            "origin {origin} should not be allowed"
        );
    }
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _) = create_test_app();
    let token = create_test_jwt("alice");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, format!("calendar_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cookies = set_cookie_headers(&response);
    let removal = cookies
        .iter()
        .find(|c| c.starts_with("calendar_token="))
        .unwrap_or_else(|| panic!("missing session removal cookie: {cookies:?}"));
    assert!(removal.contains("Max-Age=0"));
    assert!(removal.contains("Path=/"));
    assert!(removal.contains("HttpOnly"));
    assert!(removal.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_password_sign_in_not_configured() {
    let (app, _) = create_test_app();

    for uri in ["/auth/register", "/auth/login"] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                uri,
                None,
                Some(json!({ "email": "alice@example.com", "password": "hunter22" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(body["error"], "service_unavailable");
    }
}

#[tokio::test]
async fn test_google_sign_in_not_configured() {
    let (app, _) = create_test_app();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/auth/google",
            None,
            Some(json!({ "id_token": "whatever" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_credentials_validated() {
    let (app, _) = create_test_app();

    for body in [
        json!({ "email": "not-an-email", "password": "hunter22" }),
        json!({ "email": "alice@example.com", "password": "" }),
    ] {
        let (status, response) = send(
            &app,
            json_request("POST", "/auth/login", None, Some(body.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["details"].is_string());

    let (status, body) = send(
        &app,
        json_request("POST", "/auth/login", None, Some(json!({ "email": "a@b.c" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
