// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Version read and deploy endpoints.
//!
//! The deploy handler is intentionally thin. All validation, version
//! numbering and the reload notification live in the store transaction;
//! this layer only translates HTTP to a store call.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use tarmac_state::versions;
use tarmac_types::{DeployRequest, VersionSnapshot, VersionSummary};

use crate::auth::Session;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 5;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects/{project_id}/versions",
            get(list).post(deploy),
        )
        .route(
            "/api/projects/{project_id}/versions/find-by-version/{version}",
            get(find_by_version),
        )
        .route(
            "/api/projects/{project_id}/versions/{version_id}",
            get(show),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
    page: Option<i64>,
}

async fn list(
    _session: Session,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<VersionSummary>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = query.page.unwrap_or(0);
    let summaries = versions::list_versions(&state.pool, project_id, limit, page).await?;
    Ok(Json(summaries))
}

async fn deploy(
    _session: Session,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    ApiJson(payload): ApiJson<DeployRequest>,
) -> Result<Json<VersionSnapshot>, ApiError> {
    let snapshot = versions::create_version(&state.pool, project_id, &payload).await?;
    tracing::info!(
        project_id = %project_id,
        version = snapshot.version,
        "Deployed version"
    );
    Ok(Json(snapshot))
}

async fn show(
    _session: Session,
    State(state): State<AppState>,
    Path((project_id, version_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<VersionSnapshot>, ApiError> {
    let snapshot = versions::get_version(&state.pool, project_id, version_id)
        .await?
        .ok_or(tarmac_state::Error::VersionNotFound)?;
    Ok(Json(snapshot))
}

async fn find_by_version(
    _session: Session,
    State(state): State<AppState>,
    Path((project_id, version)): Path<(Uuid, i32)>,
) -> Result<Json<VersionSnapshot>, ApiError> {
    let snapshot = versions::find_by_version(&state.pool, project_id, version)
        .await?
        .ok_or(tarmac_state::Error::VersionNotFound)?;
    Ok(Json(snapshot))
}
