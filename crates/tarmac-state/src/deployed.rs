// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Latest-version state reads for runtime config generation.
//!
//! The supervisor reconfigures from these reads only, so results are
//! deterministic: projects come back ordered by id and blobs by their
//! upload order.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::records::{
    DataBindingContent, EnvBindingRecord, JsonBindingRecord, KvBindingRecord, QueueBindingRecord,
    RouteRecord, SiteFileContent, SiteRecord, TextBindingRecord, VersionBlobContent,
};

/// A deployed site with file contents.
#[derive(Debug, Clone)]
pub struct DeployedSite {
    /// Site name.
    pub name: String,
    /// Files with raw bytes.
    pub files: Vec<SiteFileContent>,
}

/// The latest committed version of one project, fully loaded.
#[derive(Debug, Clone)]
pub struct DeployedProject {
    /// Project id.
    pub project_id: Uuid,
    /// Project name.
    pub project_name: String,
    /// Version row id.
    pub version_id: Uuid,
    /// Version number.
    pub version: i32,
    /// Blobs with raw bytes, entrypoint first.
    pub blobs: Vec<VersionBlobContent>,
    /// Routes.
    pub routes: Vec<RouteRecord>,
    /// Text bindings.
    pub text_bindings: Vec<TextBindingRecord>,
    /// JSON bindings.
    pub json_bindings: Vec<JsonBindingRecord>,
    /// Data bindings with raw bytes.
    pub data_bindings: Vec<DataBindingContent>,
    /// Environment bindings.
    pub env_bindings: Vec<EnvBindingRecord>,
    /// KV bindings.
    pub kv_bindings: Vec<KvBindingRecord>,
    /// Queue bindings.
    pub queue_bindings: Vec<QueueBindingRecord>,
    /// Sites with file contents.
    pub sites: Vec<DeployedSite>,
}

#[derive(sqlx::FromRow)]
struct DeployedHead {
    project_id: Uuid,
    project_name: String,
    version_id: Uuid,
    version: i32,
}

/// Load the latest version of every project that has one.
pub async fn load_deployed_projects(pool: &PgPool) -> Result<Vec<DeployedProject>> {
    let heads = sqlx::query_as::<_, DeployedHead>(
        r#"
        SELECT p.id AS project_id, p.name AS project_name,
               v.id AS version_id, v.version
        FROM projects p
        JOIN LATERAL (
            SELECT id, version FROM project_versions
            WHERE project_id = p.id
            ORDER BY version DESC
            LIMIT 1
        ) v ON TRUE
        ORDER BY p.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut projects = Vec::with_capacity(heads.len());
    for head in heads {
        projects.push(load_project(pool, head).await?);
    }

    Ok(projects)
}

async fn load_project(pool: &PgPool, head: DeployedHead) -> Result<DeployedProject> {
    let blobs = sqlx::query_as::<_, VersionBlobContent>(
        r#"
        SELECT pvb.filename, b.kind, b.digest, b.data, pvb.blob_order
        FROM project_version_blobs pvb
        JOIN data_blobs b ON b.id = pvb.data_blob_id
        WHERE pvb.project_version_id = $1
        ORDER BY pvb.blob_order
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let routes = sqlx::query_as::<_, RouteRecord>(
        r#"
        SELECT host, base_paths FROM project_version_routes
        WHERE project_version_id = $1
        ORDER BY host
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let text_bindings = sqlx::query_as::<_, TextBindingRecord>(
        r#"
        SELECT name, value FROM project_version_text_bindings
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let json_bindings = sqlx::query_as::<_, JsonBindingRecord>(
        r#"
        SELECT name, value FROM project_version_json_bindings
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let data_bindings = sqlx::query_as::<_, DataBindingContent>(
        r#"
        SELECT name, data FROM project_version_data_bindings
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let env_bindings = sqlx::query_as::<_, EnvBindingRecord>(
        r#"
        SELECT name, env_var FROM project_version_env_bindings
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let kv_bindings = sqlx::query_as::<_, KvBindingRecord>(
        r#"
        SELECT name, kv_database_id FROM project_version_kv_bindings
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let queue_bindings = sqlx::query_as::<_, QueueBindingRecord>(
        r#"
        SELECT name, queue_id FROM project_version_queue_bindings
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let site_rows = sqlx::query_as::<_, SiteRecord>(
        r#"
        SELECT id, name FROM sites
        WHERE project_version_id = $1
        ORDER BY name
        "#,
    )
    .bind(head.version_id)
    .fetch_all(pool)
    .await?;

    let mut sites = Vec::with_capacity(site_rows.len());
    for site in site_rows {
        let files = sqlx::query_as::<_, SiteFileContent>(
            r#"
            SELECT path, digest, data FROM site_files
            WHERE site_id = $1
            ORDER BY path
            "#,
        )
        .bind(site.id)
        .fetch_all(pool)
        .await?;
        sites.push(DeployedSite {
            name: site.name,
            files,
        });
    }

    Ok(DeployedProject {
        project_id: head.project_id,
        project_name: head.project_name,
        version_id: head.version_id,
        version: head.version,
        blobs,
        routes,
        text_bindings,
        json_bindings,
        data_bindings,
        env_bindings,
        kv_bindings,
        queue_bindings,
        sites,
    })
}
