//! Permission checks, navigation pruning and role administration over HTTP.

mod common;

use aegis::AccessClaims;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::StatusCode;
use common::{bearer, refresh_cookie, TestApp, PASSWORD, TEST_SECRET};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

fn sorted_strings(value: &Value) -> Vec<String> {
    let mut items: Vec<String> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    items.sort();
    items
}

fn keys(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["key"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_default_role_permissions() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;

    let response = app
        .server
        .get("/api/auth/permissions")
        .add_header(AUTHORIZATION, bearer(data["accessToken"].as_str().unwrap()))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(sorted_strings(&body["data"]["roles"]), vec!["user"]);
    assert_eq!(
        sorted_strings(&body["data"]["permissions"]),
        vec!["dashboard.view", "profile.read", "profile.update"]
    );
}

#[tokio::test]
async fn test_navigation_requires_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/navigation").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_navigation_forbidden_without_permission() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;

    let response = app
        .server
        .get("/api/navigation")
        .add_header(AUTHORIZATION, bearer(data["accessToken"].as_str().unwrap()))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_navigation_pruned_for_manager() {
    let app = TestApp::new().await;
    let (_, access) = app.user_with_role("grace", "manager").await;

    let response = app
        .server
        .get("/api/navigation")
        .add_header(AUTHORIZATION, bearer(&access))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let items = &body["data"];
    assert_eq!(keys(items), vec!["dashboard", "admin", "help"]);
    assert_eq!(keys(&items[1]["children"]), vec!["users"]);
}

#[tokio::test]
async fn test_navigation_full_for_admin() {
    let app = TestApp::new().await;
    let (_, access) = app.user_with_role("root", "admin").await;

    let response = app
        .server
        .get("/api/navigation")
        .add_header(AUTHORIZATION, bearer(&access))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(keys(&body["data"][1]["children"]), vec!["roles", "users"]);
}

#[tokio::test]
async fn test_bearer_scheme_is_strict() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let token = data["accessToken"].as_str().unwrap();

    for header in [format!("bearer {token}"), format!("Token {token}"), "Bearer ".to_string()] {
        let response = app
            .server
            .get("/api/auth/me")
            .add_header(AUTHORIZATION, header)
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, "Bearer not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_expired_access_token() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let now = chrono::Utc::now().timestamp();

    let claims = AccessClaims {
        sub: data["user"]["id"].as_str().unwrap().to_string(),
        email: "ada@example.com".to_string(),
        iat: now - 7200,
        exp: now - 3600,
        jti: "expired".to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let app = TestApp::new().await;
    let now = chrono::Utc::now().timestamp();

    let claims = AccessClaims {
        sub: "someone".to_string(),
        email: "someone@example.com".to_string(),
        iat: now,
        exp: now + 3600,
        jti: "forged".to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-0123456789"),
    )
    .unwrap();

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_role_administration() {
    let app = TestApp::new().await;
    let (_, admin) = app.user_with_role("root", "admin").await;
    let data = app.register("ada").await;
    let ada_id = data["user"]["id"].as_str().unwrap().to_string();
    let ada_token = data["accessToken"].as_str().unwrap().to_string();

    let response = app
        .server
        .get("/api/rbac/roles")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|role| role["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "manager", "user"]);

    let response = app
        .server
        .post("/api/rbac/roles")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "name": "auditor",
            "description": "Read-only oversight",
            "permissions": ["users.read", "reports.export"]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "auditor");
    assert_eq!(
        sorted_strings(&body["data"]["permissions"]),
        vec!["reports.export", "users.read"]
    );

    let response = app
        .server
        .post("/api/rbac/roles")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"name": "auditor", "description": "", "permissions": []}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "ROLE_ALREADY_EXISTS");

    let response = app
        .server
        .post(&format!("/api/rbac/users/{ada_id}/roles"))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"role": "auditor"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["changed"], true);

    let response = app
        .server
        .get("/api/auth/permissions")
        .add_header(AUTHORIZATION, bearer(&ada_token))
        .await;
    let body: Value = response.json();
    assert!(sorted_strings(&body["data"]["permissions"]).contains(&"reports.export".to_string()));

    let response = app
        .server
        .delete(&format!("/api/rbac/users/{ada_id}/roles/auditor"))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["changed"], true);

    let response = app
        .server
        .get("/api/auth/permissions")
        .add_header(AUTHORIZATION, bearer(&ada_token))
        .await;
    let body: Value = response.json();
    assert_eq!(sorted_strings(&body["data"]["roles"]), vec!["user"]);
}

#[tokio::test]
async fn test_role_administration_rejects_bad_input() {
    let app = TestApp::new().await;
    let (_, admin) = app.user_with_role("root", "admin").await;

    let response = app
        .server
        .post("/api/rbac/roles")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"name": "broken", "description": "", "permissions": ["no-dot"]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["field"], "permissions");

    let response = app
        .server
        .post("/api/rbac/users/missing-user/roles")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"role": "user"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_administration_requires_permission() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let token = data["accessToken"].as_str().unwrap();

    app.server
        .get("/api/rbac/roles")
        .add_header(AUTHORIZATION, bearer(token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // A manager may read users but not create roles.
    let (_, manager) = app.user_with_role("grace", "manager").await;
    app.server
        .post("/api/rbac/roles")
        .add_header(AUTHORIZATION, bearer(&manager))
        .json(&json!({"name": "x", "description": "", "permissions": []}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_suspending_user_ends_sessions() {
    let app = TestApp::new().await;
    let (_, admin) = app.user_with_role("root", "admin").await;
    let data = app.register("ada").await;
    let ada_id = data["user"]["id"].as_str().unwrap();

    let response = app
        .server
        .put(&format!("/api/users/{ada_id}/status"))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"status": "suspended"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "suspended");

    let response = app
        .server
        .post("/api/auth/refresh")
        .add_header(COOKIE, refresh_cookie(data["refreshToken"].as_str().unwrap()))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");

    let response = app.login("ada@example.com", PASSWORD).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "ACCOUNT_DISABLED");

    let response = app
        .server
        .put(&format!("/api/users/{ada_id}/status"))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"status": "banished"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["field"], "status");
}

#[tokio::test]
async fn test_status_change_requires_permission() {
    let app = TestApp::new().await;
    let (_, manager) = app.user_with_role("grace", "manager").await;
    let data = app.register("ada").await;

    app.server
        .put(&format!("/api/users/{}/status", data["user"]["id"].as_str().unwrap()))
        .add_header(AUTHORIZATION, bearer(&manager))
        .json(&json!({"status": "inactive"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unlock_clears_lockout() {
    let app = TestApp::new().await;
    let (_, admin) = app.user_with_role("root", "admin").await;
    let data = app.register("ada").await;

    for _ in 0..5 {
        app.login("ada@example.com", "wrong-password").await;
    }
    app.login("ada@example.com", PASSWORD)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Only holders of users.unlock may clear it.
    app.server
        .post("/api/auth/unlock")
        .add_header(AUTHORIZATION, bearer(data["accessToken"].as_str().unwrap()))
        .json(&json!({"identifier": "ada@example.com"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .post("/api/auth/unlock")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({"identifier": "ada"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["identifier"], "ada");
    assert!(body["data"]["cleared"].as_u64().unwrap() >= 5);

    app.login("ada@example.com", PASSWORD).await.assert_status_ok();
}

#[tokio::test]
async fn test_access_token_carries_identity_only() {
    let app = TestApp::new().await;
    let data = app.register("ada").await;
    let access_token = data["accessToken"].as_str().unwrap();

    let parts: Vec<&str> = access_token.split('.').collect();
    assert_eq!(parts.len(), 3, "JWT should have 3 parts");

    use base64::Engine;
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let payload = engine
        .decode(parts[1])
        .expect("Failed to decode JWT payload");
    let claims: Value = serde_json::from_slice(&payload).expect("Failed to parse claims");

    assert_eq!(claims["sub"], data["user"]["id"]);
    assert_eq!(claims["email"], "ada@example.com");
    assert!(claims["jti"].is_string());
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        3600
    );
    // Permissions are resolved per request, never embedded.
    assert!(claims.get("permissions").is_none());
    assert!(claims.get("roles").is_none());
}
