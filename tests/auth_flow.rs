//! End-to-end tests for the authentication endpoints.

mod common;

use axum::body::Bytes;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::StatusCode;
use common::{bearer, refresh_cookie, set_cookie, TestApp, PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_returns_tokens_and_cookie() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "ada@example.com",
            "username": "ada",
            "password": PASSWORD,
            "firstName": "Ada",
            "lastName": "Lovelace"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("refreshToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["meta"]["timestamp"].is_string());
    assert!(body["meta"]["version"].is_string());

    let data = &body["data"];
    assert_eq!(data["user"]["email"], "ada@example.com");
    assert_eq!(data["user"]["username"], "ada");
    assert_eq!(data["user"]["status"], "pending");
    assert_eq!(data["user"]["emailVerified"], false);
    assert!(data["user"].get("passwordHash").is_none());
    assert!(data["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(data["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(data["expiresIn"], 3600);
}

#[tokio::test]
async fn test_register_duplicates_conflict() {
    let app = TestApp::new().await;
    app.register("ada").await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "ADA@example.com",
            "username": "someone",
            "password": PASSWORD,
            "firstName": "A",
            "lastName": "B"
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "EMAIL_ALREADY_EXISTS");
    assert_eq!(body["error"]["field"], "email");

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "other@example.com",
            "username": "ada",
            "password": PASSWORD,
            "firstName": "A",
            "lastName": "B"
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "USERNAME_ALREADY_EXISTS");
    assert_eq!(body["error"]["field"], "username");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = TestApp::new().await;

    let cases = [
        (json!({"email": "not-an-email", "username": "ada", "password": PASSWORD, "firstName": "A", "lastName": "B"}), "email"),
        (json!({"email": "ada@example.com", "username": "ada", "password": "short", "firstName": "A", "lastName": "B"}), "password"),
        (json!({"email": "ada@example.com", "username": "ada", "password": PASSWORD, "firstName": "", "lastName": "B"}), "firstName"),
    ];

    for (payload, field) in cases {
        let response = app.server.post("/api/auth/register").json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], field);
    }
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/login")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_by_email_or_username() {
    let app = TestApp::new().await;
    app.register("ada").await;

    let response = app.login("ada@example.com", PASSWORD).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["user"]["username"], "ada");
    assert!(body["data"]["user"]["lastLoginAt"].is_string());
    assert!(set_cookie(&response).starts_with("refreshToken="));

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({"username": "ada", "password": PASSWORD}))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    app.register("ada").await;

    let unknown = app.login("nobody@example.com", PASSWORD).await;
    let wrong = app.login("ada@example.com", "wrong-password").await;

    unknown.assert_status(StatusCode::UNAUTHORIZED);
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    let unknown: Value = unknown.json();
    let wrong: Value = wrong.json();
    assert_eq!(unknown["error"]["code"], "INVALID_CREDENTIALS");
    assert_eq!(unknown["error"], wrong["error"]);
}

#[tokio::test]
async fn test_login_missing_password() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({"email": "ada@example.com"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["field"], "password");
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let app = TestApp::new().await;
    app.register("ada").await;

    for _ in 0..5 {
        app.login("ada@example.com", "wrong-password")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused while locked.
    let response = app.login("ada@example.com", PASSWORD).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "ACCOUNT_LOCKED");
}

#[tokio::test]
async fn test_refresh_with_cookie_rotates() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let original = data["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(&original))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let rotated = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, original);
    assert!(body["data"]["accessToken"].is_string());
    assert!(set_cookie(&response).contains(&rotated));

    // The old token is spent.
    let response = app
        .server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(&original))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");

    // The new one works once.
    app.server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(&rotated))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_refresh_with_body_token() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;

    let response = app
        .server
        .post("/api/auth/refresh")
        .json(&json!({"refreshToken": data["refreshToken"]}))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_refresh_without_token() {
    let app = TestApp::new().await;

    let response = app.server.post("/api/auth/refresh").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn test_refresh_expired_session() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;

    sqlx::query("UPDATE user_sessions SET expires_at = '2000-01-01T00:00:00.000Z'")
        .execute(app.db.pool())
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(data["refreshToken"].as_str().unwrap()))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "REFRESH_TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_logout_ends_session_and_clears_cookie() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let access = data["accessToken"].as_str().unwrap().to_string();
    let refresh = data["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .server
        .post("/api/auth/logout")
        .add_header(AUTHORIZATION, bearer(&access))
        .add_header(COOKIE, refresh_cookie(&refresh))
        .await;
    response.assert_status_ok();
    assert!(set_cookie(&response).contains("Max-Age=0"));
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!({}));

    let response = app
        .server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(&refresh))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");

    // The access token stays valid until it expires.
    app.server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&access))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_logout_leaves_other_sessions() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let other = app.login("ada@example.com", PASSWORD).await;
    let other: Value = other.json();

    app.server
        .post("/api/auth/logout")
        .add_header(AUTHORIZATION, bearer(data["accessToken"].as_str().unwrap()))
        .add_header(COOKIE, refresh_cookie(data["refreshToken"].as_str().unwrap()))
        .await
        .assert_status_ok();

    app.server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(other["data"]["refreshToken"].as_str().unwrap()))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let app = TestApp::new().await;

    let response = app.server.post("/api/auth/logout").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_and_sessions() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    app.login("ada@example.com", PASSWORD).await.assert_status_ok();
    let access = data["accessToken"].as_str().unwrap();

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(access))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["id"], data["user"]["id"]);
    assert_eq!(body["data"]["firstName"], "Test");

    let response = app
        .server
        .get("/api/auth/sessions")
        .add_header(AUTHORIZATION, bearer(access))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let sessions = body["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    for session in sessions {
        assert!(session["id"].is_string());
        assert!(session["expiresAt"].is_string());
        assert!(session.get("refreshTokenHash").is_none());
    }
}

#[tokio::test]
async fn test_email_verification_flow() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let user_id = data["user"]["id"].as_str().unwrap();
    let access = data["accessToken"].as_str().unwrap();

    // A fresh token replaces the first one.
    app.server
        .post("/api/auth/resend-verification")
        .add_header(AUTHORIZATION, bearer(access))
        .await
        .assert_status_ok();
    let token = app.verification_token(user_id).await;

    let response = app
        .server
        .post("/api/auth/verify-email")
        .json(&json!({"token": token}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["message"], "Email verified successfully");
    assert_eq!(body["data"]["user"]["status"], "active");
    assert_eq!(body["data"]["user"]["emailVerified"], true);

    let response = app
        .server
        .post("/api/auth/verify-email")
        .json(&json!({"token": token}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["message"], "Email already verified");

    let response = app
        .server
        .post("/api/auth/resend-verification")
        .add_header(AUTHORIZATION, bearer(access))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "EMAIL_ALREADY_VERIFIED");
}

#[tokio::test]
async fn test_verify_email_rejects_bad_tokens() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/verify-email")
        .json(&json!({"token": "does-not-exist"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_VERIFICATION_TOKEN");

    let response = app
        .server
        .post("/api/auth/verify-email")
        .json(&json!({"token": "  "}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "token");
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_login_rate_limit() {
    let mut config = common::test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.login_per_minute = 2;
    let app = TestApp::with_config(config).await;

    for _ in 0..2 {
        app.login("ada@example.com", "wrong-password")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let response = app.login("ada@example.com", "wrong-password").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");

    // Another identifier has its own budget.
    app.login("grace@example.com", "wrong-password")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lockout_applies_to_username_after_email_failures() {
    let app = TestApp::new().await;
    app.register("ada").await;

    for _ in 0..5 {
        app.login("ada@example.com", "wrong-password")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({"username": "ada", "password": "wrong-password"}))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "ACCOUNT_LOCKED");
}

#[tokio::test]
async fn test_register_rate_limit() {
    let mut config = common::test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.register_per_hour = 2;
    let app = TestApp::with_config(config).await;

    app.register("ada").await;
    app.register("grace").await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "linus@example.com",
            "username": "linus",
            "password": PASSWORD,
            "firstName": "Linus",
            "lastName": "T"
        }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_refresh_rate_limit() {
    let mut config = common::test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.refresh_per_minute = 2;
    let app = TestApp::with_config(config).await;

    for _ in 0..2 {
        let response = app.server.post("/api/auth/refresh").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");
    }

    let response = app.server.post("/api/auth/refresh").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");

    // Other endpoints keep their own budget.
    app.server.get("/health").await.assert_status_ok();
    app.register("ada").await;
}
