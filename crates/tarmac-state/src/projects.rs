// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project CRUD.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::records::ProjectRecord;

/// Create a project with a platform-unique name.
pub async fn create_project(pool: &PgPool, name: &str) -> Result<ProjectRecord> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO projects (id, name)
        VALUES ($1, $2)
        "#,
    )
    .bind(id)
    .bind(name)
    .execute(pool)
    .await
    .map_err(|e| {
        if Error::is_unique_violation(&e) {
            Error::NameTaken(name.to_string())
        } else {
            Error::Database(e)
        }
    })?;

    get_project(pool, id)
        .await?
        .ok_or(Error::ProjectNotFound(id))
}

/// Get a project by id, with its highest committed version number.
pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Option<ProjectRecord>> {
    let record = sqlx::query_as::<_, ProjectRecord>(
        r#"
        SELECT p.id, p.name, p.created_at,
               (SELECT MAX(v.version) FROM project_versions v
                WHERE v.project_id = p.id) AS latest_version
        FROM projects p
        WHERE p.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// List all projects, newest first.
pub async fn list_projects(pool: &PgPool) -> Result<Vec<ProjectRecord>> {
    let records = sqlx::query_as::<_, ProjectRecord>(
        r#"
        SELECT p.id, p.name, p.created_at,
               (SELECT MAX(v.version) FROM project_versions v
                WHERE v.project_id = p.id) AS latest_version
        FROM projects p
        ORDER BY p.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}
