// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Queue management endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use tarmac_state::queues;
use tarmac_state::records::QueueRecord;
use tarmac_types::{NewQueue, Queue};

use crate::auth::Session;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/api/queues", get(list).post(create))
}

fn to_api(record: QueueRecord) -> Queue {
    Queue {
        id: record.id,
        name: record.name,
        created_at: record.created_at.timestamp_millis(),
    }
}

async fn list(
    _session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<Queue>>, ApiError> {
    let records = queues::list_queues(&state.pool).await?;
    Ok(Json(records.into_iter().map(to_api).collect()))
}

async fn create(
    _session: Session,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewQueue>,
) -> Result<Json<Queue>, ApiError> {
    let record = queues::create_queue(&state.pool, &body.name).await?;
    Ok(Json(to_api(record)))
}
