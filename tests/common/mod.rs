//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use aegis::{AuthorizationEngine, Config, Database, WebServer};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";
pub const PASSWORD: &str = "correct-horse-battery";

/// Configuration with cheap hashing and no rate limits.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.auth.hashing.memory_kib = 1024;
    config.auth.hashing.iterations = 1;
    config.auth.hashing.parallelism = 1;
    config.rate_limit.enabled = false;
    config.navigation = serde_json::from_value(json!([
        {"key": "dashboard", "title": "Dashboard", "link": "/dashboard", "permissions": ["dashboard.view"]},
        {"key": "admin", "title": "Administration", "children": [
            {"key": "roles", "title": "Roles", "link": "/admin/roles", "permissions": ["roles.read"]},
            {"key": "users", "title": "Users", "link": "/admin/users", "permissions": ["users.read"]}
        ]},
        {"key": "help", "title": "Help", "link": "/help"}
    ]))
    .expect("navigation fixture");
    config
}

/// A running application over an in-memory database.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to open database");
        let web = WebServer::new(&config, db.clone()).expect("Failed to create web server");
        let server = TestServer::new(web.router()).expect("Failed to create test server");
        Self { server, db }
    }

    /// Register `username` with `<username>@example.com` and return the payload.
    pub async fn register(&self, username: &str) -> Value {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "email": format!("{username}@example.com"),
                "username": username,
                "password": PASSWORD,
                "firstName": "Test",
                "lastName": "User"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    /// Log in with `identifier` as email.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/api/auth/login")
            .json(&json!({"email": email, "password": password}))
            .await
    }

    /// Register `username` and grant it `role`.
    ///
    /// Permissions are resolved per request, so the registration token
    /// already carries the new role.
    pub async fn user_with_role(&self, username: &str, role: &str) -> (String, String) {
        let data = self.register(username).await;
        let user_id = data["user"]["id"].as_str().unwrap().to_string();
        AuthorizationEngine::new(self.db.clone())
            .assign_role(&user_id, role)
            .await
            .expect("Failed to assign role");
        let access = data["accessToken"].as_str().unwrap().to_string();
        (user_id, access)
    }

    /// Pending verification token of `user_id`.
    pub async fn verification_token(&self, user_id: &str) -> String {
        sqlx::query_scalar::<_, String>(
            "SELECT token FROM email_verifications WHERE user_id = ? AND verified = 0 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await
        .expect("verification token")
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn refresh_cookie(token: &str) -> String {
    format!("refreshToken={}", token)
}

/// The `Set-Cookie` header of `response`.
pub fn set_cookie(response: &TestResponse) -> String {
    response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap()
        .to_string()
}
