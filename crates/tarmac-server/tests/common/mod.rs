// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for node-server integration tests.
//!
//! Tests run against a real PostgreSQL pointed at by
//! `TEST_TARMAC_DATABASE_URL` and isolate themselves through uniquely
//! named projects and hosts, so they can run in parallel on one schema.

#![allow(dead_code)]

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sqlx::PgPool;
use uuid::Uuid;

use tarmac_types::deploy::{BlobKind, BlobUpload, DeployRequest, Route};

/// Connect to the test database and apply migrations.
pub async fn test_pool() -> Result<PgPool, String> {
    let database_url = std::env::var("TEST_TARMAC_DATABASE_URL")
        .map_err(|_| "TEST_TARMAC_DATABASE_URL not set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .map_err(|e| format!("Failed to connect to database: {}", e))?;

    tarmac_state::migrations::run(&pool)
        .await
        .map_err(|e| format!("Failed to run migrations: {}", e))?;

    Ok(pool)
}

/// Create a project with a unique name.
pub async fn create_project(pool: &PgPool) -> Uuid {
    let name = format!("test-project-{}", Uuid::new_v4());
    tarmac_state::projects::create_project(pool, &name)
        .await
        .expect("Failed to create test project")
        .id
}

/// Minimal valid deploy payload: one entrypoint blob, one route on `host`.
pub fn minimal_payload(host: &str) -> DeployRequest {
    DeployRequest {
        blobs: vec![BlobUpload {
            filename: "index.js".into(),
            kind: BlobKind::Esmodule,
            data: BASE64.encode(b"export default {}"),
        }],
        routes: vec![Route {
            host: host.into(),
            base_paths: vec!["/".into()],
        }],
        text_bindings: vec![],
        json_bindings: vec![],
        data_bindings: vec![],
        environment_bindings: vec![],
        kv_bindings: vec![],
        queue_bindings: vec![],
        sites: vec![],
        cron_jobs: vec![],
    }
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
