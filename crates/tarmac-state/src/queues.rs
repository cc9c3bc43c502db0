// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Queues and the enqueue boundary.
//!
//! Delivery and consumption happen inside the worker runtime; the store only
//! owns queue identity (so bindings can be validated at deploy time) and
//! durable enqueue.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::records::QueueRecord;

/// Create a queue.
pub async fn create_queue(pool: &PgPool, name: &str) -> Result<QueueRecord> {
    let record = sqlx::query_as::<_, QueueRecord>(
        r#"
        INSERT INTO queues (id, name)
        VALUES ($1, $2)
        RETURNING id, name, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// List all queues, newest first.
pub async fn list_queues(pool: &PgPool) -> Result<Vec<QueueRecord>> {
    let records = sqlx::query_as::<_, QueueRecord>(
        r#"
        SELECT id, name, created_at FROM queues
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Get a queue by id.
pub async fn get_queue(pool: &PgPool, id: Uuid) -> Result<Option<QueueRecord>> {
    let record = sqlx::query_as::<_, QueueRecord>(
        r#"
        SELECT id, name, created_at FROM queues
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Durably enqueue a message. The queue must exist.
pub async fn push_message(
    pool: &PgPool,
    queue_id: Uuid,
    body: &serde_json::Value,
) -> Result<Uuid> {
    if get_queue(pool, queue_id).await?.is_none() {
        return Err(Error::QueueNotFound(queue_id));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO queue_messages (id, queue_id, body)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(id)
    .bind(queue_id)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(id)
}
