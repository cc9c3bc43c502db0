// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime-facing endpoints under `/__tarmac`.
//!
//! Worker runtimes call these over the admin socket to resolve bindings.
//! Responses use the tagged envelope so runtimes can branch on the `type`
//! field; the one exception is the info probe, which answers a bare object.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use tarmac_state::queues;
use tarmac_types::kv::{
    ApiResult, KvAck, KvDeleteRequest, KvListQuery, KvListResult, KvPutRequest, KvValues,
};
use tarmac_types::{EngineInfo, QueueAck, QueueMessage};

use crate::auth::InternalCaller;
use crate::error::{InternalError, InternalJson};
use crate::routes::kv::{KeysQuery, split_keys};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/__tarmac", get(info))
        .route(
            "/__tarmac/kv/{kv_id}",
            get(kv_get).put(kv_put).delete(kv_delete),
        )
        .route("/__tarmac/kv/{kv_id}/list", get(kv_list))
        .route("/__tarmac/queues/{queue_id}", post(queue_push))
}

async fn info(
    _caller: InternalCaller,
    State(state): State<AppState>,
) -> Json<EngineInfo> {
    Json(EngineInfo {
        engine_path: state.engine_path.clone(),
    })
}

async fn kv_get(
    _caller: InternalCaller,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<ApiResult<KvValues>>, InternalError> {
    let keys = split_keys(&query)?;
    let values = state.kv.get(kv_id, &keys).await?;
    Ok(Json(ApiResult::Result {
        result: KvValues { values },
    }))
}

async fn kv_list(
    _caller: InternalCaller,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    Query(query): Query<KvListQuery>,
) -> Result<Json<ApiResult<KvListResult>>, InternalError> {
    let page = state.kv.list(kv_id, &query).await?;
    Ok(Json(ApiResult::Result { result: page }))
}

async fn kv_put(
    _caller: InternalCaller,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    InternalJson(body): InternalJson<KvPutRequest>,
) -> Result<Json<ApiResult<KvAck>>, InternalError> {
    state.kv.put(kv_id, &body.list).await?;
    Ok(Json(ApiResult::Result {
        result: KvAck { success: true },
    }))
}

async fn kv_delete(
    _caller: InternalCaller,
    State(state): State<AppState>,
    Path(kv_id): Path<Uuid>,
    InternalJson(body): InternalJson<KvDeleteRequest>,
) -> Result<Json<ApiResult<KvAck>>, InternalError> {
    state.kv.delete(kv_id, &body.keys).await?;
    Ok(Json(ApiResult::Result {
        result: KvAck { success: true },
    }))
}

async fn queue_push(
    _caller: InternalCaller,
    State(state): State<AppState>,
    Path(queue_id): Path<Uuid>,
    InternalJson(message): InternalJson<QueueMessage>,
) -> Result<Json<ApiResult<QueueAck>>, InternalError> {
    let id = queues::push_message(&state.pool, queue_id, &message.body).await?;
    Ok(Json(ApiResult::Result {
        result: QueueAck { id },
    }))
}
