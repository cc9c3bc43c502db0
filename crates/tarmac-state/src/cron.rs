// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scheduled-job diffing and reads.
//!
//! Scheduled jobs are project-scoped and survive deploys that drop them:
//! a job missing from an upload is disabled, never deleted, so its history
//! (`created_at`) is preserved across a later re-appearance.

use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use tarmac_types::deploy::CronJob;

use crate::error::Result;
use crate::records::CronJobRecord;

/// Outcome of diffing a project's stored jobs against an uploaded set.
///
/// Every job lands in exactly one bucket, so applying the diff touches each
/// job exactly once per deploy.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CronDiff {
    /// Jobs in the upload only: inserted enabled.
    pub insert: Vec<CronJob>,
    /// Jobs in both with a changed expression: schedule replaced, enabled.
    pub update: Vec<CronJob>,
    /// Jobs in both, unchanged: enabled.
    pub enable: Vec<String>,
    /// Enabled jobs missing from the upload: disabled.
    pub disable: Vec<String>,
}

/// Partition uploaded jobs against the stored set.
pub fn diff(existing: &[CronJobRecord], uploaded: &[CronJob]) -> CronDiff {
    let stored: HashMap<&str, &CronJobRecord> =
        existing.iter().map(|j| (j.name.as_str(), j)).collect();
    let uploaded_names: HashMap<&str, ()> =
        uploaded.iter().map(|j| (j.name.as_str(), ())).collect();

    let mut out = CronDiff::default();

    for job in uploaded {
        match stored.get(job.name.as_str()) {
            None => out.insert.push(job.clone()),
            Some(record) if record.cron != job.cron => out.update.push(job.clone()),
            Some(_) => out.enable.push(job.name.clone()),
        }
    }

    for record in existing {
        if record.enabled && !uploaded_names.contains_key(record.name.as_str()) {
            out.disable.push(record.name.clone());
        }
    }

    out
}

/// Apply the scheduled-job diff for a project inside a deploy transaction.
pub async fn apply_diff(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Uuid,
    uploaded: &[CronJob],
) -> Result<()> {
    let existing = sqlx::query_as::<_, CronJobRecord>(
        r#"
        SELECT project_id, name, cron, enabled, created_at, updated_at
        FROM cron_jobs
        WHERE project_id = $1
        "#,
    )
    .bind(project_id)
    .fetch_all(&mut **tx)
    .await?;

    let plan = diff(&existing, uploaded);
    debug!(
        project_id = %project_id,
        insert = plan.insert.len(),
        update = plan.update.len(),
        enable = plan.enable.len(),
        disable = plan.disable.len(),
        "Applying scheduled-job diff"
    );

    for job in &plan.insert {
        sqlx::query(
            r#"
            INSERT INTO cron_jobs (project_id, name, cron, enabled)
            VALUES ($1, $2, $3, TRUE)
            "#,
        )
        .bind(project_id)
        .bind(&job.name)
        .bind(&job.cron)
        .execute(&mut **tx)
        .await?;
    }

    for job in &plan.update {
        sqlx::query(
            r#"
            UPDATE cron_jobs
            SET cron = $3, enabled = TRUE, updated_at = now()
            WHERE project_id = $1 AND name = $2
            "#,
        )
        .bind(project_id)
        .bind(&job.name)
        .bind(&job.cron)
        .execute(&mut **tx)
        .await?;
    }

    for name in &plan.enable {
        sqlx::query(
            r#"
            UPDATE cron_jobs
            SET enabled = TRUE, updated_at = now()
            WHERE project_id = $1 AND name = $2
            "#,
        )
        .bind(project_id)
        .bind(name)
        .execute(&mut **tx)
        .await?;
    }

    for name in &plan.disable {
        sqlx::query(
            r#"
            UPDATE cron_jobs
            SET enabled = FALSE, updated_at = now()
            WHERE project_id = $1 AND name = $2
            "#,
        )
        .bind(project_id)
        .bind(name)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Enabled jobs of one project, name order.
pub async fn list_enabled(pool: &PgPool, project_id: Uuid) -> Result<Vec<CronJob>> {
    let records = sqlx::query_as::<_, CronJobRecord>(
        r#"
        SELECT project_id, name, cron, enabled, created_at, updated_at
        FROM cron_jobs
        WHERE project_id = $1 AND enabled
        ORDER BY name
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| CronJob {
            name: r.name,
            cron: r.cron,
        })
        .collect())
}

/// All jobs of one project, including disabled ones.
pub async fn list_jobs(pool: &PgPool, project_id: Uuid) -> Result<Vec<CronJobRecord>> {
    let records = sqlx::query_as::<_, CronJobRecord>(
        r#"
        SELECT project_id, name, cron, enabled, created_at, updated_at
        FROM cron_jobs
        WHERE project_id = $1
        ORDER BY name
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// An enabled job paired with the host its project currently answers on.
///
/// `host` is `None` when the project's latest version carries no routes;
/// such a job cannot be dispatched until a routed version is deployed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispatchableCronJob {
    /// Owning project.
    pub project_id: Uuid,
    /// Job name, unique within the project.
    pub name: String,
    /// Five-field cron expression.
    pub cron: String,
    /// First route host of the project's latest version, if any.
    pub host: Option<String>,
}

/// Enabled jobs joined with a dispatch host, ordered by project then name.
///
/// The host comes from the same version the engine serves: the highest
/// `version` per project, first route in host order.
pub async fn list_dispatchable(pool: &PgPool) -> Result<Vec<DispatchableCronJob>> {
    let jobs = sqlx::query_as::<_, DispatchableCronJob>(
        r#"
        SELECT c.project_id, c.name, c.cron, r.host
        FROM cron_jobs c
        LEFT JOIN LATERAL (
            SELECT pvr.host
            FROM project_versions pv
            JOIN project_version_routes pvr ON pvr.project_version_id = pv.id
            WHERE pv.project_id = c.project_id
            ORDER BY pv.version DESC, pvr.host
            LIMIT 1
        ) r ON TRUE
        WHERE c.enabled
        ORDER BY c.project_id, c.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(jobs)
}
