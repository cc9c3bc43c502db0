// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! KV database management and session-gated value access.
//!
//! Value endpoints mirror the internal API shapes so the dashboard and the
//! worker runtime read the same data the same way, just behind different
//! credentials.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use tarmac_state::kv;
use tarmac_state::records::KvDatabaseRecord;
use tarmac_types::kv::{KvAck, KvDeleteRequest, KvListQuery, KvListResult, KvPutRequest, KvValues};
use tarmac_types::{KvDatabase, NewKvDatabase};

use crate::auth::Session;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/kv", get(list_databases).post(create_database))
        .route(
            "/api/kv/{kv_id}/values",
            get(get_values).put(put_values).delete(delete_values),
        )
        .route("/api/kv/{kv_id}/list", get(list_keys))
}

fn to_api(record: KvDatabaseRecord) -> KvDatabase {
    KvDatabase {
        id: record.id,
        name: record.name,
        created_at: record.created_at.timestamp_millis(),
    }
}

/// Query string of a batched read: `?keys=a,b,c`.
#[derive(Debug, Deserialize)]
pub(crate) struct KeysQuery {
    pub(crate) keys: Option<String>,
}

/// Split the comma-separated `keys` parameter. The parameter is required;
/// splitting never drops segments, so `keys=` asks for the empty key.
pub(crate) fn split_keys(query: &KeysQuery) -> Result<Vec<String>, tarmac_state::Error> {
    match query.keys.as_deref() {
        Some(raw) => Ok(raw.split(',').map(str::to_string).collect()),
        None => Err(tarmac_state::Error::InvalidRequest(
            "missing keys parameter".to_string(),
        )),
    }
}

async fn list_databases(
    _session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<KvDatabase>>, ApiError> {
    let records = kv::list_databases(&state.pool).await?;
    Ok(Json(records.into_iter().map(to_api).collect()))
}

async fn create_database(
    _session: Session,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewKvDatabase>,
) -> Result<Json<KvDatabase>, ApiError> {
    let record = kv::create_database(&state.pool, &body.name).await?;
    Ok(Json(to_api(record)))
}

async fn get_values(
    _session: Session,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<KvValues>, ApiError> {
    let keys = split_keys(&query)?;
    let values = state.kv.get(kv_id, &keys).await?;
    Ok(Json(KvValues { values }))
}

async fn list_keys(
    _session: Session,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    Query(query): Query<KvListQuery>,
) -> Result<Json<KvListResult>, ApiError> {
    let page = state.kv.list(kv_id, &query).await?;
    Ok(Json(page))
}

async fn put_values(
    _session: Session,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    ApiJson(body): ApiJson<KvPutRequest>,
) -> Result<Json<KvAck>, ApiError> {
    state.kv.put(kv_id, &body.list).await?;
    Ok(Json(KvAck { success: true }))
}

async fn delete_values(
    _session: Session,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    ApiJson(body): ApiJson<KvDeleteRequest>,
) -> Result<Json<KvAck>, ApiError> {
    state.kv.delete(kv_id, &body.keys).await?;
    Ok(Json(KvAck { success: true }))
}
