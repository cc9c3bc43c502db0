// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for tarmac-admin integration tests.
//!
//! Tests run the full router against a real PostgreSQL pointed at by
//! `TEST_TARMAC_DATABASE_URL`, with a seeded user session. Isolation comes
//! from uniquely named resources, so tests can run in parallel.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use tarmac_admin::{AppState, SECRET_HEADER, SESSION_HEADER, router};
use tarmac_state::sessions;

/// Secret wired into the app under test.
pub const TEST_SECRET: &str = "integration-secret";

/// Engine path answered by the info probe under test.
pub const TEST_ENGINE_PATH: &str = "/tmp/tarmac-test/engine.sock";

/// The app under test plus a valid session token.
pub struct TestApp {
    pub pool: PgPool,
    pub app: Router,
    pub token: String,
}

impl TestApp {
    /// Connect, migrate, seed a user session and build the router.
    pub async fn new() -> Result<Self, String> {
        let database_url = std::env::var("TEST_TARMAC_DATABASE_URL")
            .map_err(|_| "TEST_TARMAC_DATABASE_URL not set")?;

        let pool = PgPool::connect(&database_url)
            .await
            .map_err(|e| format!("Failed to connect to database: {}", e))?;

        tarmac_state::migrations::run(&pool)
            .await
            .map_err(|e| format!("Failed to run migrations: {}", e))?;

        let user = sessions::create_user(&pool, &format!("admin-test-{}", Uuid::new_v4()))
            .await
            .map_err(|e| format!("Failed to create test user: {}", e))?;
        let token = format!("test-token-{}", Uuid::new_v4());
        sessions::create_session(&pool, user.id, &token, None)
            .await
            .map_err(|e| format!("Failed to create test session: {}", e))?;

        let state = AppState::new(pool.clone(), TEST_SECRET, TEST_ENGINE_PATH);
        Ok(Self {
            pool,
            app: router(state),
            token,
        })
    }

    /// Dispatch a request and decode the JSON response body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Session-authenticated GET.
    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::get(uri)
            .header(SESSION_HEADER, &self.token)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Session-authenticated POST with a JSON body.
    pub async fn post(
        &self,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header(SESSION_HEADER, &self.token)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Session-authenticated PUT with a JSON body.
    pub async fn put(
        &self,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::put(uri)
            .header(SESSION_HEADER, &self.token)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Session-authenticated DELETE with a JSON body.
    pub async fn delete(
        &self,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::delete(uri)
            .header(SESSION_HEADER, &self.token)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Secret-authenticated request to the internal API.
    pub async fn internal(
        &self,
        method: &str,
        uri: &str,
        body: Option<&serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(SECRET_HEADER, TEST_SECRET);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }
}

/// Base64-encode content for an upload.
pub fn encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Minimal valid deploy payload: one entrypoint blob, one route.
pub fn minimal_deploy(host: &str) -> serde_json::Value {
    serde_json::json!({
        "blobs": [
            {"filename": "index.js", "type": "esmodule", "data": encode(b"export default {}")}
        ],
        "routes": [
            {"host": host, "basePaths": ["/"]}
        ]
    })
}

/// A platform-unique resource name.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Helper macro to skip tests if the database URL is not set.
#[macro_export]
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_TARMAC_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_TARMAC_DATABASE_URL not set");
            return;
        }
    };
}
