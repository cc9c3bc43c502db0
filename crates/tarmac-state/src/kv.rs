// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! KV databases and the KV engine.
//!
//! Values are UTF-8 text keyed by (database, key). Reads are batched, writes
//! are transactional, and listing pages backwards through `updated_at` with
//! an epoch-millisecond cursor.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use tarmac_types::kv::{KvKey, KvListQuery, KvListResult};

use crate::error::{Error, Result};
use crate::records::KvDatabaseRecord;

/// Default page size for [`KvEngine::list`].
const DEFAULT_LIST_LIMIT: i64 = 100;
/// Hard page-size ceiling for [`KvEngine::list`].
const MAX_LIST_LIMIT: i64 = 1000;

/// Create a KV database.
pub async fn create_database(pool: &PgPool, name: &str) -> Result<KvDatabaseRecord> {
    let record = sqlx::query_as::<_, KvDatabaseRecord>(
        r#"
        INSERT INTO kv_databases (id, name)
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

/// List all KV databases, newest first.
pub async fn list_databases(pool: &PgPool) -> Result<Vec<KvDatabaseRecord>> {
    let records = sqlx::query_as::<_, KvDatabaseRecord>(
        r#"
        SELECT id, name, created_at FROM kv_databases
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Get a KV database by id.
pub async fn get_database(pool: &PgPool, id: Uuid) -> Result<Option<KvDatabaseRecord>> {
    let record = sqlx::query_as::<_, KvDatabaseRecord>(
        r#"
        SELECT id, name, created_at FROM kv_databases
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Escape LIKE metacharacters so user filters match literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[derive(sqlx::FromRow)]
struct EntryKeyRecord {
    key: String,
    updated_at: DateTime<Utc>,
}

/// The KV engine, scoped to a pool. One instance serves every database.
#[derive(Clone)]
pub struct KvEngine {
    pool: PgPool,
}

impl KvEngine {
    /// Create an engine over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn require_database(&self, database_id: Uuid) -> Result<()> {
        let exists: Option<i32> =
            sqlx::query_scalar(r#"SELECT 1 FROM kv_databases WHERE id = $1"#)
                .bind(database_id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(Error::KvDatabaseNotFound(database_id));
        }
        Ok(())
    }

    /// Batched point read. Every requested key appears in the result;
    /// missing keys map to `None`.
    pub async fn get(
        &self,
        database_id: Uuid,
        keys: &[String],
    ) -> Result<BTreeMap<String, Option<String>>> {
        self.require_database(database_id).await?;

        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT key, value FROM kv_entries
            WHERE kv_database_id = $1 AND key = ANY($2)
            "#,
        )
        .bind(database_id)
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        let mut values: BTreeMap<String, Option<String>> =
            keys.iter().map(|k| (k.clone(), None)).collect();
        for (key, value) in rows {
            values.insert(key, Some(value));
        }

        Ok(values)
    }

    /// Filtered listing, most recently updated first.
    ///
    /// All filters AND together. The returned cursor is the last row's
    /// `updated_at` in epoch milliseconds, or `None` when the page came back
    /// short, which signals the end of the list.
    pub async fn list(&self, database_id: Uuid, query: &KvListQuery) -> Result<KvListResult> {
        self.require_database(database_id).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let cursor = match query.cursor {
            Some(ms) => Some(DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                Error::InvalidRequest(format!("cursor out of range: {ms}"))
            })?),
            None => None,
        };
        let prefix = query.prefix.as_deref().map(|p| format!("{}%", escape_like(p)));
        let suffix = query.suffix.as_deref().map(|s| format!("%{}", escape_like(s)));
        let includes = query
            .includes
            .as_deref()
            .map(|i| format!("%{}%", escape_like(i)));
        let excludes = query
            .excludes
            .as_deref()
            .map(|e| format!("%{}%", escape_like(e)));

        let rows = sqlx::query_as::<_, EntryKeyRecord>(
            r#"
            SELECT key, updated_at FROM kv_entries
            WHERE kv_database_id = $1
              AND ($2::timestamptz IS NULL OR updated_at < $2)
              AND ($3::text IS NULL OR key LIKE $3)
              AND ($4::text IS NULL OR key LIKE $4)
              AND ($5::text IS NULL OR key LIKE $5)
              AND ($6::text IS NULL OR key NOT LIKE $6)
            ORDER BY updated_at DESC
            LIMIT $7
            "#,
        )
        .bind(database_id)
        .bind(cursor)
        .bind(prefix)
        .bind(suffix)
        .bind(includes)
        .bind(excludes)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let cursor = if (rows.len() as i64) < limit {
            None
        } else {
            rows.last().map(|r| r.updated_at.timestamp_millis())
        };

        Ok(KvListResult {
            list: rows.into_iter().map(|r| KvKey { key: r.key }).collect(),
            cursor,
        })
    }

    /// Transactional batched write. Pairs with a `None` value are deletes,
    /// the rest are upserts. All of it commits or none of it does.
    pub async fn put(
        &self,
        database_id: Uuid,
        entries: &[(String, Option<String>)],
    ) -> Result<()> {
        self.require_database(database_id).await?;

        let deletes: Vec<String> = entries
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.clone())
            .collect();
        let upserts: Vec<(&String, &String)> = entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
            .collect();

        let mut tx = self.pool.begin().await?;

        if !deletes.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM kv_entries
                WHERE kv_database_id = $1 AND key = ANY($2)
                "#,
            )
            .bind(database_id)
            .bind(&deletes)
            .execute(&mut *tx)
            .await?;
        }

        for (key, value) in upserts {
            sqlx::query(
                r#"
                INSERT INTO kv_entries (kv_database_id, key, value, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (kv_database_id, key)
                DO UPDATE SET value = EXCLUDED.value, updated_at = now()
                "#,
            )
            .bind(database_id)
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Batched delete. Keys that do not exist are ignored.
    pub async fn delete(&self, database_id: Uuid, keys: &[String]) -> Result<()> {
        self.require_database(database_id).await?;

        sqlx::query(
            r#"
            DELETE FROM kv_entries
            WHERE kv_database_id = $1 AND key = ANY($2)
            "#,
        )
        .bind(database_id)
        .bind(keys)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
