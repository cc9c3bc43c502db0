// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Session-credential lookups for the admin boundary.
//!
//! Login and user management happen outside the platform; this module only
//! answers "which user does this presented token belong to". Tokens are
//! stored hashed.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::records::UserRecord;

/// Hash a session token for storage and lookup.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Resolve a presented session token to a user id.
///
/// Returns `None` for unknown or expired tokens.
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT user_id FROM sessions
        WHERE token_hash = $1
          AND (expires_at IS NULL OR expires_at > now())
        "#,
    )
    .bind(token_hash(token))
    .fetch_optional(pool)
    .await?;

    Ok(user_id)
}

/// Create a user.
pub async fn create_user(pool: &PgPool, username: &str) -> Result<UserRecord> {
    let id = Uuid::new_v4();

    let record = sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (id, username)
        VALUES ($1, $2)
        RETURNING id, username, created_at
        "#,
    )
    .bind(id)
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if Error::is_unique_violation(&e) {
            Error::NameTaken(username.to_string())
        } else {
            Error::Database(e)
        }
    })?;

    Ok(record)
}

/// Store a session for a user. The token itself is never persisted.
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(token_hash(token))
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(id)
}
