// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connection pool setup.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::Result;
use crate::migrations;

/// Connect to PostgreSQL and bring the schema up to date.
///
/// Every tarmac process goes through this function so a freshly pointed-at
/// database is usable without a separate migration step.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("Connected to database");

    migrations::run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}
