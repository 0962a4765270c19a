//! Test utilities for HTTP-level tests over the in-memory store.

use axum_test::TestServer;
use serde_json::json;

use crate::{
    AppState,
    api::models::auth::LoginResponse,
    config::{AdminConfig, Config, DatabaseConfig, PasswordConfig},
};

pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const ADMIN_PASSWORD: &str = "admin-test-password";

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        secret_key: Some("test-secret-key-for-testing-only-0123456789".to_string()),
        admin: AdminConfig {
            name: "Test Admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            about: None,
        },
        ..Default::default()
    };
    // Cheap hashing keeps the suite fast
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 128,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config
}

/// A seeded application over a fresh in-memory store, with the authorization gate applied.
pub async fn create_test_app() -> (TestServer, AppState) {
    let app = crate::Application::new(create_test_config())
        .await
        .expect("Failed to create application");
    app.into_test_server()
}

/// Log in and return the bearer token.
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({"email": email, "password": password}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<LoginResponse>().token
}

/// Register a USER account, log it in and return the bearer token.
pub async fn register(server: &TestServer, name: &str, email: &str, password: &str) -> String {
    server
        .post("/api/auth/register")
        .json(&json!({"name": name, "email": email, "password": password}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    login(server, email, password).await
}
