// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for tarmac-engine.

use thiserror::Error;

/// Supervisor and config-generation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Filesystem or process operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store read failed during config generation.
    #[error("State error: {0}")]
    State(#[from] tarmac_state::Error),

    /// Config serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `start` was called while a runtime process is already active.
    #[error("Runtime process is already running")]
    AlreadyRunning,
}

/// Result type using the engine Error.
pub type Result<T> = std::result::Result<T, Error>;
