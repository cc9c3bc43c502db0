// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for tarmac-state.

use thiserror::Error;
use uuid::Uuid;

/// Store errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Project was not found.
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Version was not found.
    #[error("Version not found")]
    VersionNotFound,

    /// KV database was not found.
    #[error("KV database not found: {0}")]
    KvDatabaseNotFound(Uuid),

    /// Queue was not found.
    #[error("Queue not found: {0}")]
    QueueNotFound(Uuid),

    /// Deploy payload failed validation before any write.
    #[error("Invalid deploy: {0}")]
    InvalidDeploy(String),

    /// Request parameters failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A unique name is already in use.
    #[error("Name already in use: {0}")]
    NameTaken(String),
}

impl Error {
    /// True when the underlying database error is a unique-constraint
    /// violation.
    pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "23505")
    }
}

/// Result type using the store Error.
pub type Result<T> = std::result::Result<T, Error>;
