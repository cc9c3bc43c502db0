// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Administrative resource shapes: projects, KV databases, queues.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the session credential on admin endpoints.
pub const SESSION_HEADER: &str = "auth-token";

/// Header carrying the shared secret that gates the internal API.
pub const SECRET_HEADER: &str = "x-tarmac-secret";

/// Request body for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProject {
    /// Project name, unique across the platform.
    pub name: String,
}

/// A project as answered by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project id.
    pub id: Uuid,
    /// Project name.
    pub name: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Highest committed version number, if any.
    #[serde(rename = "latest_version")]
    pub latest_version: Option<i32>,
}

/// Request body for creating a KV database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewKvDatabase {
    /// Database name.
    pub name: String,
}

/// A KV database as answered by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvDatabase {
    /// Database id, referenced by KV bindings.
    pub id: Uuid,
    /// Database name.
    pub name: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
}

/// Request body for creating a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewQueue {
    /// Queue name.
    pub name: String,
}

/// A queue as answered by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    /// Queue id, referenced by queue bindings.
    pub id: Uuid,
    /// Queue name.
    pub name: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
}

/// Message pushed onto a queue by a worker runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    /// Arbitrary JSON body.
    pub body: serde_json::Value,
}

/// Acknowledgement of a durable enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueAck {
    /// Id of the stored message.
    pub id: Uuid,
}

/// Answer of the internal info probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    /// Unix socket the worker runtime serves on.
    pub engine_path: String,
}
