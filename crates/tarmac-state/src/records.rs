// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Row types shared by the query modules.
//!
//! Snapshot reads and runtime-state reads use different projections of the
//! same tables: snapshot records carry digests only, deployed records carry
//! the raw bytes the supervisor materializes onto disk.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Project row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRecord {
    /// Project id.
    pub id: Uuid,
    /// Unique project name.
    pub name: String,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// Highest committed version number, if any version exists.
    pub latest_version: Option<i32>,
}

/// Version row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VersionRecord {
    /// Version row id.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Sequential version number, gapless per project.
    pub version: i32,
    /// Commit time.
    pub deployed_at: DateTime<Utc>,
}

/// Blob of a version, digest projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VersionBlobRecord {
    /// Module filename.
    pub filename: String,
    /// Module kind (`esmodule`, `wasm`, `json`, `text`, `data`).
    pub kind: String,
    /// Lowercase hex SHA-256 of the content.
    pub digest: String,
    /// Position within the version; 0 is the entrypoint.
    pub blob_order: i32,
}

/// Blob of a version, content projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VersionBlobContent {
    /// Module filename.
    pub filename: String,
    /// Module kind.
    pub kind: String,
    /// Lowercase hex SHA-256 of the content.
    pub digest: String,
    /// Raw content bytes.
    pub data: Vec<u8>,
    /// Position within the version; 0 is the entrypoint.
    pub blob_order: i32,
}

/// Route row of a version.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteRecord {
    /// Hostname to match.
    pub host: String,
    /// Base paths under the host.
    pub base_paths: Vec<String>,
}

/// Text binding row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TextBindingRecord {
    /// Binding name.
    pub name: String,
    /// Bound value.
    pub value: String,
}

/// JSON binding row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JsonBindingRecord {
    /// Binding name.
    pub name: String,
    /// Bound value.
    pub value: serde_json::Value,
}

/// Data binding row, digest projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DataBindingRecord {
    /// Binding name.
    pub name: String,
    /// Lowercase hex SHA-256 of the payload.
    pub digest: String,
}

/// Data binding row, content projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DataBindingContent {
    /// Binding name.
    pub name: String,
    /// Raw payload bytes.
    pub data: Vec<u8>,
}

/// Environment binding row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnvBindingRecord {
    /// Binding name.
    pub name: String,
    /// Node-side environment variable.
    pub env_var: String,
}

/// KV binding row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KvBindingRecord {
    /// Binding name.
    pub name: String,
    /// Referenced database.
    pub kv_database_id: Uuid,
}

/// Queue binding row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueBindingRecord {
    /// Binding name.
    pub name: String,
    /// Referenced queue.
    pub queue_id: Uuid,
}

/// Site row with its id for file lookups.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteRecord {
    /// Site row id.
    pub id: Uuid,
    /// Site name.
    pub name: String,
}

/// Site file row, digest projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteFileRecord {
    /// Path within the site.
    pub path: String,
    /// Lowercase hex SHA-256 of the content.
    pub digest: String,
}

/// Site file row, content projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteFileContent {
    /// Path within the site.
    pub path: String,
    /// Lowercase hex SHA-256 of the content.
    pub digest: String,
    /// Raw content bytes.
    pub data: Vec<u8>,
}

/// Scheduled job row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CronJobRecord {
    /// Owning project.
    pub project_id: Uuid,
    /// Job name, unique within the project.
    pub name: String,
    /// Cron expression.
    pub cron: String,
    /// Whether the latest deploy still carries this job.
    pub enabled: bool,
    /// When the job first appeared.
    pub created_at: DateTime<Utc>,
    /// Last deploy that touched this job.
    pub updated_at: DateTime<Utc>,
}

/// KV database row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KvDatabaseRecord {
    /// Database id.
    pub id: Uuid,
    /// Database name.
    pub name: String,
    /// When the database was created.
    pub created_at: DateTime<Utc>,
}

/// Queue row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueRecord {
    /// Queue id.
    pub id: Uuid,
    /// Queue name.
    pub name: String,
    /// When the queue was created.
    pub created_at: DateTime<Utc>,
}

/// User row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    /// User id.
    pub id: Uuid,
    /// Unique username.
    pub username: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
