// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared state of the admin app.

use sqlx::PgPool;
use tarmac_state::KvEngine;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Store pool.
    pub pool: PgPool,
    /// KV engine over the same pool.
    pub kv: KvEngine,
    /// Secret internal callers must present.
    pub secret: String,
    /// Engine socket path answered by the info probe.
    pub engine_path: String,
}

impl AppState {
    /// State over an existing pool.
    pub fn new(pool: PgPool, secret: impl Into<String>, engine_path: impl Into<String>) -> Self {
        Self {
            kv: KvEngine::new(pool.clone()),
            pool,
            secret: secret.into(),
            engine_path: engine_path.into(),
        }
    }
}
