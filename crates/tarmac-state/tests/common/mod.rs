// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for tarmac-state integration tests.
//!
//! Tests run against a real PostgreSQL pointed at by
//! `TEST_TARMAC_DATABASE_URL` and isolate themselves through uniquely named
//! projects/databases, so they can run in parallel against one schema.

#![allow(dead_code)]

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sqlx::PgPool;
use uuid::Uuid;

use tarmac_types::deploy::{BlobKind, BlobUpload, DeployRequest, Route};

/// Test context holding the shared pool.
pub struct TestContext {
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to the test database and apply migrations.
    pub async fn new() -> Result<Self, String> {
        let database_url = std::env::var("TEST_TARMAC_DATABASE_URL")
            .map_err(|_| "TEST_TARMAC_DATABASE_URL not set")?;

        let pool = PgPool::connect(&database_url)
            .await
            .map_err(|e| format!("Failed to connect to database: {}", e))?;

        tarmac_state::migrations::run(&pool)
            .await
            .map_err(|e| format!("Failed to run migrations: {}", e))?;

        Ok(Self { pool })
    }

    /// Create a project with a unique name.
    pub async fn create_project(&self) -> Uuid {
        let name = format!("test-project-{}", Uuid::new_v4());
        tarmac_state::projects::create_project(&self.pool, &name)
            .await
            .expect("Failed to create test project")
            .id
    }

    /// Create a KV database with a unique name.
    pub async fn create_kv_database(&self) -> Uuid {
        let name = format!("test-kv-{}", Uuid::new_v4());
        tarmac_state::kv::create_database(&self.pool, &name)
            .await
            .expect("Failed to create test KV database")
            .id
    }

    /// Create a queue with a unique name.
    pub async fn create_queue(&self) -> Uuid {
        let name = format!("test-queue-{}", Uuid::new_v4());
        tarmac_state::queues::create_queue(&self.pool, &name)
            .await
            .expect("Failed to create test queue")
            .id
    }

    /// Count rows of a version's child table.
    pub async fn count_children(&self, table: &str, version_id: Uuid) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE project_version_id = $1");
        sqlx::query_scalar(&sql)
            .bind(version_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count child rows")
    }

    /// Number of committed versions of a project.
    pub async fn version_count(&self, project_id: Uuid) -> i64 {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM project_versions WHERE project_id = $1"#)
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count versions")
    }

    /// Remove all rows from every table. Only for serially run maintenance;
    /// parallel tests rely on unique names instead.
    pub async fn cleanup(&self) {
        for table in [
            "queue_messages",
            "kv_entries",
            "cron_jobs",
            "site_files",
            "sites",
            "project_version_queue_bindings",
            "project_version_kv_bindings",
            "project_version_env_bindings",
            "project_version_data_bindings",
            "project_version_json_bindings",
            "project_version_text_bindings",
            "project_version_routes",
            "project_version_blobs",
            "project_versions",
            "data_blobs",
            "queues",
            "kv_databases",
            "projects",
            "sessions",
            "users",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&self.pool)
                .await
                .ok();
        }
    }
}

/// Base64-encode content for an upload.
pub fn encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// A blob upload with the given filename and content.
pub fn blob(filename: &str, kind: BlobKind, data: &[u8]) -> BlobUpload {
    BlobUpload {
        filename: filename.into(),
        kind,
        data: encode(data),
    }
}

/// Minimal valid deploy payload: one entrypoint blob, one route.
pub fn minimal_payload(host: &str) -> DeployRequest {
    DeployRequest {
        blobs: vec![blob("index.js", BlobKind::Esmodule, b"export default {}")],
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
