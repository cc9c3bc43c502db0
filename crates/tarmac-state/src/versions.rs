// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The deploy transaction and version reads.
//!
//! A deploy commits a complete project version or nothing. The project row is
//! locked for the duration of the transaction so concurrent deploys to the
//! same project serialize and version numbers stay gapless; deploys to other
//! projects proceed in parallel.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use croner::Cron;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use tarmac_types::deploy::{
    BlobDigest, BlobKind, DataBindingDigest, DeployRequest, SiteDigest, SiteFileDigest,
    VersionSnapshot, VersionSummary,
};

use crate::cron;
use crate::error::{Error, Result};
use crate::notify;
use crate::records::{
    DataBindingRecord, EnvBindingRecord, JsonBindingRecord, KvBindingRecord, QueueBindingRecord,
    RouteRecord, SiteRecord, TextBindingRecord, VersionBlobRecord, VersionRecord,
};

/// Upper bound on the version-list page size.
const MAX_PAGE_SIZE: i64 = 100;

struct DecodedBlob {
    filename: String,
    kind: BlobKind,
    data: Vec<u8>,
    digest: String,
}

struct DecodedDataBinding {
    name: String,
    data: Vec<u8>,
    digest: String,
}

struct DecodedSiteFile {
    path: String,
    data: Vec<u8>,
    digest: String,
}

struct DecodedSite {
    name: String,
    files: Vec<DecodedSiteFile>,
}

/// Payload with all base64 content decoded and digested, produced by
/// validation before the transaction opens.
struct DecodedDeploy {
    blobs: Vec<DecodedBlob>,
    data_bindings: Vec<DecodedDataBinding>,
    sites: Vec<DecodedSite>,
}

fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Validate a deploy payload and decode its content.
///
/// Runs before any database write; a failure here never touches the store.
fn validate(payload: &DeployRequest) -> Result<DecodedDeploy> {
    if payload.blobs.is_empty() {
        return Err(Error::InvalidDeploy("a version needs at least one blob".into()));
    }
    if payload.blobs[0].kind != BlobKind::Esmodule {
        return Err(Error::InvalidDeploy(
            "the first blob is the entrypoint and must be an esmodule".into(),
        ));
    }

    for route in &payload.routes {
        if route.host.is_empty() {
            return Err(Error::InvalidDeploy("route host must not be empty".into()));
        }
    }

    let mut cron_names = HashSet::new();
    for job in &payload.cron_jobs {
        if !cron_names.insert(job.name.as_str()) {
            return Err(Error::InvalidDeploy(format!(
                "duplicate cron job name: {}",
                job.name
            )));
        }
        Cron::new(&job.cron).parse().map_err(|e| {
            Error::InvalidDeploy(format!("cron job {}: invalid expression: {e}", job.name))
        })?;
    }

    let mut blobs = Vec::with_capacity(payload.blobs.len());
    for blob in &payload.blobs {
        let data = BASE64.decode(&blob.data).map_err(|_| {
            Error::InvalidDeploy(format!("blob {} is not valid base64", blob.filename))
        })?;
        let digest = digest_hex(&data);
        blobs.push(DecodedBlob {
            filename: blob.filename.clone(),
            kind: blob.kind,
            data,
            digest,
        });
    }

    let mut data_bindings = Vec::with_capacity(payload.data_bindings.len());
    for binding in &payload.data_bindings {
        let data = BASE64.decode(&binding.base64).map_err(|_| {
            Error::InvalidDeploy(format!("data binding {} is not valid base64", binding.name))
        })?;
        let digest = digest_hex(&data);
        data_bindings.push(DecodedDataBinding {
            name: binding.name.clone(),
            data,
            digest,
        });
    }

    let mut sites = Vec::with_capacity(payload.sites.len());
    for site in &payload.sites {
        let mut files = Vec::with_capacity(site.files.len());
        for file in &site.files {
            let data = BASE64.decode(&file.base64).map_err(|_| {
                Error::InvalidDeploy(format!(
                    "site {} file {} is not valid base64",
                    site.name, file.path
                ))
            })?;
            let digest = digest_hex(&data);
            files.push(DecodedSiteFile {
                path: file.path.clone(),
                data,
                digest,
            });
        }
        sites.push(DecodedSite {
            name: site.name.clone(),
            files,
        });
    }

    Ok(DecodedDeploy {
        blobs,
        data_bindings,
        sites,
    })
}

/// Commit a new version of a project.
///
/// Everything happens in one transaction: lock the project row, compute the
/// next gapless version number, insert the version and all child rows, diff
/// the scheduled jobs, and queue a reload notification that Postgres delivers
/// only on commit. Any failure rolls the whole deploy back.
pub async fn create_version(
    pool: &PgPool,
    project_id: Uuid,
    payload: &DeployRequest,
) -> Result<VersionSnapshot> {
    let decoded = validate(payload)?;

    let mut tx = pool.begin().await?;

    // Serializes concurrent deploys to this project. Gapless numbering
    // depends on holding this lock until commit.
    let locked: Option<Uuid> =
        sqlx::query_scalar(r#"SELECT id FROM projects WHERE id = $1 FOR UPDATE"#)
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(Error::ProjectNotFound(project_id));
    }

    let kv_ids: Vec<Uuid> = payload
        .kv_bindings
        .iter()
        .map(|b| b.kv_database_id)
        .collect();
    if !kv_ids.is_empty() {
        let found: Vec<Uuid> =
            sqlx::query_scalar(r#"SELECT id FROM kv_databases WHERE id = ANY($1)"#)
                .bind(&kv_ids)
                .fetch_all(&mut *tx)
                .await?;
        if let Some(missing) = kv_ids.iter().find(|id| !found.contains(id)) {
            return Err(Error::KvDatabaseNotFound(*missing));
        }
    }

    let queue_ids: Vec<Uuid> = payload.queue_bindings.iter().map(|b| b.queue_id).collect();
    if !queue_ids.is_empty() {
        let found: Vec<Uuid> = sqlx::query_scalar(r#"SELECT id FROM queues WHERE id = ANY($1)"#)
            .bind(&queue_ids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = queue_ids.iter().find(|id| !found.contains(id)) {
            return Err(Error::QueueNotFound(*missing));
        }
    }

    let next_version: i32 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(MAX(version), 0) + 1 FROM project_versions
        WHERE project_id = $1
        "#,
    )
    .bind(project_id)
    .fetch_one(&mut *tx)
    .await?;

    let version_id = Uuid::new_v4();
    let deployed_at: chrono::DateTime<chrono::Utc> = sqlx::query_scalar(
        r#"
        INSERT INTO project_versions (id, project_id, version)
        VALUES ($1, $2, $3)
        RETURNING deployed_at
        "#,
    )
    .bind(version_id)
    .bind(project_id)
    .bind(next_version)
    .fetch_one(&mut *tx)
    .await?;

    for (order, blob) in decoded.blobs.iter().enumerate() {
        let blob_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO data_blobs (id, kind, data, digest)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(blob_id)
        .bind(blob.kind.as_str())
        .bind(&blob.data)
        .bind(&blob.digest)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO project_version_blobs
                (id, project_version_id, data_blob_id, filename, blob_order)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(blob_id)
        .bind(&blob.filename)
        .bind(order as i32)
        .execute(&mut *tx)
        .await?;
    }

    for route in &payload.routes {
        sqlx::query(
            r#"
            INSERT INTO project_version_routes (id, project_version_id, host, base_paths)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&route.host)
        .bind(&route.base_paths)
        .execute(&mut *tx)
        .await?;
    }

    for binding in &payload.text_bindings {
        sqlx::query(
            r#"
            INSERT INTO project_version_text_bindings (id, project_version_id, name, value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&binding.name)
        .bind(&binding.value)
        .execute(&mut *tx)
        .await?;
    }

    for binding in &payload.json_bindings {
        sqlx::query(
            r#"
            INSERT INTO project_version_json_bindings (id, project_version_id, name, value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&binding.name)
        .bind(&binding.value)
        .execute(&mut *tx)
        .await?;
    }

    for binding in &decoded.data_bindings {
        sqlx::query(
            r#"
            INSERT INTO project_version_data_bindings
                (id, project_version_id, name, data, digest)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&binding.name)
        .bind(&binding.data)
        .bind(&binding.digest)
        .execute(&mut *tx)
        .await?;
    }

    for binding in &payload.environment_bindings {
        sqlx::query(
            r#"
            INSERT INTO project_version_env_bindings (id, project_version_id, name, env_var)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&binding.name)
        .bind(&binding.env_var)
        .execute(&mut *tx)
        .await?;
    }

    for binding in &payload.kv_bindings {
        sqlx::query(
            r#"
            INSERT INTO project_version_kv_bindings
                (id, project_version_id, name, kv_database_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&binding.name)
        .bind(binding.kv_database_id)
        .execute(&mut *tx)
        .await?;
    }

    for binding in &payload.queue_bindings {
        sqlx::query(
            r#"
            INSERT INTO project_version_queue_bindings
                (id, project_version_id, name, queue_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version_id)
        .bind(&binding.name)
        .bind(binding.queue_id)
        .execute(&mut *tx)
        .await?;
    }

    for site in &decoded.sites {
        let site_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO sites (id, project_version_id, name)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(site_id)
        .bind(version_id)
        .bind(&site.name)
        .execute(&mut *tx)
        .await?;

        for file in &site.files {
            sqlx::query(
                r#"
                INSERT INTO site_files (id, site_id, path, data, digest)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(site_id)
            .bind(&file.path)
            .bind(&file.data)
            .bind(&file.digest)
            .execute(&mut *tx)
            .await?;
        }
    }

    cron::apply_diff(&mut tx, project_id, &payload.cron_jobs).await?;

    notify::queue_reload(&mut *tx).await?;

    tx.commit().await?;

    info!(
        project_id = %project_id,
        version = next_version,
        blobs = decoded.blobs.len(),
        "Committed new project version"
    );

    Ok(VersionSnapshot {
        id: version_id,
        project_id,
        version: next_version,
        deployed_at: deployed_at.timestamp_millis(),
        blobs: decoded
            .blobs
            .iter()
            .map(|b| BlobDigest {
                filename: b.filename.clone(),
                kind: b.kind,
                digest: b.digest.clone(),
            })
            .collect(),
        routes: payload.routes.clone(),
        text_bindings: payload.text_bindings.clone(),
        json_bindings: payload.json_bindings.clone(),
        data_bindings: decoded
            .data_bindings
            .iter()
            .map(|b| DataBindingDigest {
                name: b.name.clone(),
                digest: b.digest.clone(),
            })
            .collect(),
        environment_bindings: payload.environment_bindings.clone(),
        kv_bindings: payload.kv_bindings.clone(),
        queue_bindings: payload.queue_bindings.clone(),
        sites: decoded
            .sites
            .iter()
            .map(|s| SiteDigest {
                name: s.name.clone(),
                files: s
                    .files
                    .iter()
                    .map(|f| SiteFileDigest {
                        path: f.path.clone(),
                        digest: f.digest.clone(),
                    })
                    .collect(),
            })
            .collect(),
        cron_jobs: payload.cron_jobs.clone(),
    })
}

/// List versions of a project, newest first. `page` is zero-based.
pub async fn list_versions(
    pool: &PgPool,
    project_id: Uuid,
    limit: i64,
    page: i64,
) -> Result<Vec<VersionSummary>> {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let offset = page.max(0) * limit;

    let records = sqlx::query_as::<_, VersionRecord>(
        r#"
        SELECT id, project_id, version, deployed_at
        FROM project_versions
        WHERE project_id = $1
        ORDER BY version DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(project_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| VersionSummary {
            id: r.id,
            project_id: r.project_id,
            version: r.version,
            deployed_at: r.deployed_at.timestamp_millis(),
        })
        .collect())
}

/// Get a full version snapshot by version row id.
pub async fn get_version(
    pool: &PgPool,
    project_id: Uuid,
    version_id: Uuid,
) -> Result<Option<VersionSnapshot>> {
    let head = sqlx::query_as::<_, VersionRecord>(
        r#"
        SELECT id, project_id, version, deployed_at
        FROM project_versions
        WHERE project_id = $1 AND id = $2
        "#,
    )
    .bind(project_id)
    .bind(version_id)
    .fetch_optional(pool)
    .await?;

    match head {
        Some(head) => Ok(Some(load_snapshot(pool, head).await?)),
        None => Ok(None),
    }
}

/// Get a full version snapshot by version number.
pub async fn find_by_version(
    pool: &PgPool,
    project_id: Uuid,
    version: i32,
) -> Result<Option<VersionSnapshot>> {
    let head = sqlx::query_as::<_, VersionRecord>(
        r#"
        SELECT id, project_id, version, deployed_at
        FROM project_versions
        WHERE project_id = $1 AND version = $2
        "#,
    )
    .bind(project_id)
    .bind(version)
    .fetch_optional(pool)
    .await?;

    match head {
        Some(head) => Ok(Some(load_snapshot(pool, head).await?)),
        None => Ok(None),
    }
}

#[derive(sqlx::FromRow)]
struct SiteFileJoinRecord {
    site_id: Uuid,
    path: String,
    digest: String,
}

async fn load_snapshot(pool: &PgPool, head: VersionRecord) -> Result<VersionSnapshot> {
    let blobs = sqlx::query_as::<_, VersionBlobRecord>(
        r#"
        SELECT pvb.filename, b.kind, b.digest, pvb.blob_order
        FROM project_version_blobs pvb
        JOIN data_blobs b ON b.id = pvb.data_blob_id
        WHERE pvb.project_version_id = $1
        ORDER BY pvb.blob_order
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let routes = sqlx::query_as::<_, RouteRecord>(
        r#"
        SELECT host, base_paths FROM project_version_routes
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let text_bindings = sqlx::query_as::<_, TextBindingRecord>(
        r#"
        SELECT name, value FROM project_version_text_bindings
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let json_bindings = sqlx::query_as::<_, JsonBindingRecord>(
        r#"
        SELECT name, value FROM project_version_json_bindings
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let data_bindings = sqlx::query_as::<_, DataBindingRecord>(
        r#"
        SELECT name, digest FROM project_version_data_bindings
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let env_bindings = sqlx::query_as::<_, EnvBindingRecord>(
        r#"
        SELECT name, env_var FROM project_version_env_bindings
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let kv_bindings = sqlx::query_as::<_, KvBindingRecord>(
        r#"
        SELECT name, kv_database_id FROM project_version_kv_bindings
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let queue_bindings = sqlx::query_as::<_, QueueBindingRecord>(
        r#"
        SELECT name, queue_id FROM project_version_queue_bindings
        WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let sites = sqlx::query_as::<_, SiteRecord>(
        r#"
        SELECT id, name FROM sites WHERE project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let site_files = sqlx::query_as::<_, SiteFileJoinRecord>(
        r#"
        SELECT f.site_id, f.path, f.digest
        FROM site_files f
        JOIN sites s ON s.id = f.site_id
        WHERE s.project_version_id = $1
        "#,
    )
    .bind(head.id)
    .fetch_all(pool)
    .await?;

    let mut files_by_site: HashMap<Uuid, Vec<SiteFileDigest>> = HashMap::new();
    for file in site_files {
        files_by_site
            .entry(file.site_id)
            .or_default()
            .push(SiteFileDigest {
                path: file.path,
                digest: file.digest,
            });
    }

    // Scheduled jobs are project-scoped; a snapshot reflects the currently
    // enabled set, which for the latest version equals its deploy payload.
    let cron_jobs = cron::list_enabled(pool, head.project_id).await?;

    Ok(VersionSnapshot {
        id: head.id,
        project_id: head.project_id,
        version: head.version,
        deployed_at: head.deployed_at.timestamp_millis(),
        blobs: blobs
            .into_iter()
            .map(|b| BlobDigest {
                filename: b.filename,
                kind: BlobKind::parse(&b.kind).unwrap_or(BlobKind::Data),
                digest: b.digest,
            })
            .collect(),
        routes: routes
            .into_iter()
            .map(|r| tarmac_types::deploy::Route {
                host: r.host,
                base_paths: r.base_paths,
            })
            .collect(),
        text_bindings: text_bindings
            .into_iter()
            .map(|b| tarmac_types::deploy::TextBinding {
                name: b.name,
                value: b.value,
            })
            .collect(),
        json_bindings: json_bindings
            .into_iter()
            .map(|b| tarmac_types::deploy::JsonBinding {
                name: b.name,
                value: b.value,
            })
            .collect(),
        data_bindings: data_bindings
            .into_iter()
            .map(|b| DataBindingDigest {
                name: b.name,
                digest: b.digest,
            })
            .collect(),
        environment_bindings: env_bindings
            .into_iter()
            .map(|b| tarmac_types::deploy::EnvironmentBinding {
                name: b.name,
                env_var: b.env_var,
            })
            .collect(),
        kv_bindings: kv_bindings
            .into_iter()
            .map(|b| tarmac_types::deploy::KvBindingRef {
                name: b.name,
                kv_database_id: b.kv_database_id,
            })
            .collect(),
        queue_bindings: queue_bindings
            .into_iter()
            .map(|b| tarmac_types::deploy::QueueBindingRef {
                name: b.name,
                queue_id: b.queue_id,
            })
            .collect(),
        sites: sites
            .into_iter()
            .map(|s| SiteDigest {
                files: files_by_site.remove(&s.id).unwrap_or_default(),
                name: s.name,
            })
            .collect(),
        cron_jobs,
    })
}
