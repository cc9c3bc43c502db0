// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node-wide leader election over a PostgreSQL advisory lock.
//!
//! Every worker campaigns for the same session lock, keyed by the node id.
//! The worker holding it runs the node-singleton duties; the others keep
//! retrying and take over once the holder's session ends, whether through a
//! clean shutdown or a crashed process.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use sqlx::{Connection, PgConnection};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How often a non-leader retries the lock and a leader checks its session.
const CAMPAIGN_INTERVAL: Duration = Duration::from_secs(5);

/// Advisory lock key of a node: the first eight bytes of the hashed node id.
pub fn lock_key(node_id: &str) -> i64 {
    let digest = Sha256::digest(node_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

/// A running leadership campaign.
pub struct NodeLeadership {
    is_leader: watch::Receiver<bool>,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl NodeLeadership {
    /// Start campaigning on a dedicated connection.
    ///
    /// The lock is session-scoped, so it must not live on a pooled
    /// connection that gets recycled between queries.
    pub fn start(database_url: String, node_id: String) -> Self {
        let (leader_tx, is_leader) = watch::channel(false);
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(campaign(
            database_url,
            node_id,
            leader_tx,
            Arc::clone(&shutdown),
        ));
        Self {
            is_leader,
            shutdown,
            handle,
        }
    }

    /// Watch leadership changes. `true` while this worker holds the lock.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.is_leader.clone()
    }

    /// Whether this worker currently leads the node.
    pub fn is_leader(&self) -> bool {
        *self.is_leader.borrow()
    }

    /// Stop campaigning and release a held lock.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(err) = self.handle.await {
            error!("Leader campaign task panicked: {}", err);
        }
    }
}

async fn campaign(
    database_url: String,
    node_id: String,
    leader_tx: watch::Sender<bool>,
    shutdown: Arc<Notify>,
) {
    let key = lock_key(&node_id);
    debug!(node = %node_id, key, "Campaigning for node leadership");

    loop {
        let mut conn = match PgConnection::connect(&database_url).await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "Leader campaign connection failed");
                tokio::select! {
                    _ = shutdown.notified() => break,
                    _ = tokio::time::sleep(CAMPAIGN_INTERVAL) => continue,
                }
            }
        };

        if run_session(&mut conn, key, &node_id, &leader_tx, &shutdown).await {
            // Shutdown requested: closing the session releases the lock.
            let _ = conn.close().await;
            break;
        }

        // The session died. Any held lock is gone with it.
        if *leader_tx.borrow() {
            warn!(node = %node_id, "Lost node leadership");
        }
        let _ = leader_tx.send(false);
    }

    let _ = leader_tx.send(false);
    info!("Leader campaign stopped");
}

/// Drive one session until shutdown (true) or a connection error (false).
async fn run_session(
    conn: &mut PgConnection,
    key: i64,
    node_id: &str,
    leader_tx: &watch::Sender<bool>,
    shutdown: &Notify,
) -> bool {
    let mut leading = false;
    loop {
        if leading {
            if let Err(err) = sqlx::query("SELECT 1").execute(&mut *conn).await {
                warn!(error = %err, "Leader session health check failed");
                return false;
            }
        } else {
            match sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
                .bind(key)
                .fetch_one(&mut *conn)
                .await
            {
                Ok(true) => {
                    leading = true;
                    let _ = leader_tx.send(true);
                    info!(node = %node_id, "Acquired node leadership");
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(error = %err, "Leadership campaign query failed");
                    return false;
                }
            }
        }

        tokio::select! {
            _ = shutdown.notified() => return true,
            _ = tokio::time::sleep(CAMPAIGN_INTERVAL) => {}
        }
    }
}
