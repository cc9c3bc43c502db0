// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! KV request/response shapes and the tagged envelope used by the internal
//! API. Worker runtimes branch on the `type` tag instead of HTTP status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Envelope for internal endpoint responses.
///
/// Serializes as `{"type":"result","result":…}` or
/// `{"type":"error","error":…}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ApiResult<T> {
    /// Successful call.
    Result {
        /// Operation-specific payload.
        result: T,
    },
    /// Failed call.
    Error {
        /// Human-readable message.
        error: String,
    },
}

/// Batched read result, keyed by requested key. Missing keys are present
/// with a `null` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvValues {
    /// Requested keys mapped to their values.
    pub values: BTreeMap<String, Option<String>>,
}

/// Query parameters accepted by the list operation. All filters combine
/// with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvListQuery {
    /// Page size, clamped to 1..=1000. Defaults to 100.
    pub limit: Option<i64>,
    /// Epoch-millisecond cursor from a previous page.
    pub cursor: Option<i64>,
    /// Keep keys starting with this.
    pub prefix: Option<String>,
    /// Keep keys ending with this.
    pub suffix: Option<String>,
    /// Keep keys containing this.
    pub includes: Option<String>,
    /// Drop keys containing this.
    pub excludes: Option<String>,
}

/// One key of a list page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvKey {
    /// The key.
    pub key: String,
}

/// A page of keys ordered by recency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvListResult {
    /// Keys, most recently updated first.
    pub list: Vec<KvKey>,
    /// Cursor for the next page; `null` when this page was short, i.e. the
    /// list is exhausted.
    pub cursor: Option<i64>,
}

/// Transactional write. Pairs with a `null` value are deletes, the rest are
/// upserts. Applied atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvPutRequest {
    /// `[key, value|null]` pairs.
    pub list: Vec<(String, Option<String>)>,
}

/// Batched delete. Missing keys are not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvDeleteRequest {
    /// Keys to remove.
    pub keys: Vec<String>,
}

/// Acknowledgement payload for writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvAck {
    /// Always `true` on the success path.
    pub success: bool,
}
