// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reload channel publish/subscribe.
//!
//! The channel is a pure wake-up: the payload carries no state and observers
//! re-read everything from the store. Delivery is at-least-once from the
//! observer's point of view; coalesced or duplicate notifications are
//! harmless because reconfiguration is idempotent.

use sqlx::PgPool;
use sqlx::postgres::{PgConnection, PgListener};

use crate::error::Result;

/// NOTIFY channel announcing committed deploys.
pub const RELOAD_CHANNEL: &str = "tarmac_reload";

/// Constant payload; observers ignore it.
pub const RELOAD_PAYLOAD: &str = "reload";

/// Queue a reload notification on the current transaction's connection.
///
/// Postgres holds NOTIFY until commit, so observers only ever wake for
/// state that is actually visible.
pub async fn queue_reload(conn: &mut PgConnection) -> Result<()> {
    sqlx::query(r#"SELECT pg_notify($1, $2)"#)
        .bind(RELOAD_CHANNEL)
        .bind(RELOAD_PAYLOAD)
        .execute(conn)
        .await?;
    Ok(())
}

/// Publish a reload immediately, outside any transaction.
pub async fn publish_reload(pool: &PgPool) -> Result<()> {
    sqlx::query(r#"SELECT pg_notify($1, $2)"#)
        .bind(RELOAD_CHANNEL)
        .bind(RELOAD_PAYLOAD)
        .execute(pool)
        .await?;
    Ok(())
}

/// Subscription to the reload channel.
///
/// `recv` reconnects transparently after connection loss, but notifications
/// sent while disconnected are gone. Callers pair the listener with a
/// periodic refresh so a lost wake-up delays reconfiguration instead of
/// skipping it.
pub struct ReloadListener {
    inner: PgListener,
}

impl ReloadListener {
    /// Subscribe using a connection from the pool's configuration.
    pub async fn connect(pool: &PgPool) -> Result<Self> {
        let mut inner = PgListener::connect_with(pool).await?;
        inner.listen(RELOAD_CHANNEL).await?;
        Ok(Self { inner })
    }

    /// Wait for the next notification.
    pub async fn recv(&mut self) -> Result<()> {
        let _ = self.inner.recv().await?;
        Ok(())
    }
}
