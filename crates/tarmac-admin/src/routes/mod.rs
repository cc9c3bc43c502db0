// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Route table assembly.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod internal;
mod kv;
mod projects;
mod queues;
mod versions;

/// Deploy payloads carry whole module trees and site archives as base64.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Build the full admin application: management API under `/api`,
/// runtime-facing API under `/__tarmac`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(projects::routes())
        .merge(versions::routes())
        .merge(kv::routes())
        .merge(queues::routes())
        .merge(internal::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Gate behavior is checkable without a database: every rejection below
// happens before the first store call, so a lazy pool never connects.
#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::{SECRET_HEADER, SESSION_HEADER};
    use crate::state::AppState;

    const SECRET: &str = "test-secret";
    const ENGINE_PATH: &str = "/tmp/engine/engine.sock";

    fn offline_app() -> Router {
        let pool = PgPool::connect_lazy("postgres://postgres@localhost:5432/unreachable")
            .expect("lazy pool");
        super::router(AppState::new(pool, SECRET, ENGINE_PATH))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("request failed");
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn internal_routes_reject_a_missing_secret() {
        let request = Request::get("/__tarmac").body(Body::empty()).unwrap();
        let (status, body) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["type"], "error");
    }

    #[tokio::test]
    async fn internal_routes_reject_a_wrong_secret() {
        let request = Request::get("/__tarmac")
            .header(SECRET_HEADER, "not-the-secret")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["type"], "error");
    }

    #[tokio::test]
    async fn info_probe_answers_the_engine_path() {
        let request = Request::get("/__tarmac")
            .header(SECRET_HEADER, SECRET)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enginePath"], ENGINE_PATH);
    }

    #[tokio::test]
    async fn admin_routes_reject_a_missing_session() {
        let request = Request::get("/api/projects").body(Body::empty()).unwrap();
        let (status, body) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_internal_body_is_a_400_envelope() {
        let request = Request::put(format!("/__tarmac/kv/{}", Uuid::new_v4()))
            .header(SECRET_HEADER, SECRET)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "error");
    }

    #[tokio::test]
    async fn session_header_alone_does_not_open_internal_routes() {
        let request = Request::get("/__tarmac")
            .header(SESSION_HEADER, "some-session")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
