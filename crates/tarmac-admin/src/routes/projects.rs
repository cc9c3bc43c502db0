// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project management endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use tarmac_state::projects;
use tarmac_state::records::ProjectRecord;
use tarmac_types::Project;

use crate::auth::Session;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list).post(create))
        .route("/api/projects/{project_id}", get(show))
}

pub(crate) fn to_api(record: ProjectRecord) -> Project {
    Project {
        id: record.id,
        name: record.name,
        created_at: record.created_at.timestamp_millis(),
        latest_version: record.latest_version,
    }
}

async fn list(
    _session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let records = projects::list_projects(&state.pool).await?;
    Ok(Json(records.into_iter().map(to_api).collect()))
}

async fn create(
    _session: Session,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<tarmac_types::NewProject>,
) -> Result<Json<Project>, ApiError> {
    let record = projects::create_project(&state.pool, &body.name).await?;
    Ok(Json(to_api(record)))
}

async fn show(
    _session: Session,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let record = projects::get_project(&state.pool, project_id)
        .await?
        .ok_or(tarmac_state::Error::ProjectNotFound(project_id))?;
    Ok(Json(to_api(record)))
}
