// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deploy-to-runtime reconciliation.
//!
//! One loop per worker regenerates the runtime config from the deployed
//! state and restarts the supervised runtime whenever the config digest
//! changes. Deploys announce themselves over `LISTEN/NOTIFY`; a periodic
//! refresh covers notifications lost while the listener reconnects.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use tarmac_engine::{LaunchSpec, RuntimeState, Supervisor, WorkerPaths, write_runtime_config};
use tarmac_state::ReloadListener;

/// Fallback refresh period when no notification arrives.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Per-worker reconcile loop. Owns the runtime supervisor.
pub struct Reconciler {
    pool: PgPool,
    supervisor: Supervisor,
    listener: ReloadListener,
    paths: WorkerPaths,
    launch: LaunchSpec,
    secret: String,
    refresh_interval: Duration,
    shutdown: Arc<Notify>,
    last_digest: Option<String>,
}

impl Reconciler {
    /// A loop that is not running yet; call [`Reconciler::reconcile_now`]
    /// once for the initial launch, then spawn [`Reconciler::run`].
    pub fn new(
        pool: PgPool,
        supervisor: Supervisor,
        listener: ReloadListener,
        paths: WorkerPaths,
        launch: LaunchSpec,
        secret: String,
    ) -> Self {
        Self {
            pool,
            supervisor,
            listener,
            paths,
            launch,
            secret,
            refresh_interval: REFRESH_INTERVAL,
            shutdown: Arc::new(Notify::new()),
            last_digest: None,
        }
    }

    /// Override the fallback refresh period.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Handle that stops [`Reconciler::run`].
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Regenerate the config and restart the runtime if it changed.
    ///
    /// The first call launches the runtime; callers treat its error as
    /// fatal, while the loop only logs later failures and retries on the
    /// next notification or refresh.
    pub async fn reconcile_now(&mut self) -> anyhow::Result<()> {
        if self.supervisor.state() == RuntimeState::Crashed {
            // A crashed runtime takes the whole worker down. Leave it to
            // the node loop instead of racing it with a restart.
            debug!("Runtime crashed; skipping reconciliation");
            return Ok(());
        }

        let generated = write_runtime_config(&self.pool, &self.paths, &self.secret).await?;
        if self.last_digest.as_deref() == Some(generated.digest.as_str())
            && self.supervisor.is_running()
        {
            debug!(digest = %generated.digest, "Runtime config unchanged");
            return Ok(());
        }

        info!(
            projects = generated.projects,
            digest = %generated.digest,
            "Applying runtime config"
        );
        self.supervisor.stop().await?;
        self.supervisor.start(&self.launch).await?;
        self.last_digest = Some(generated.digest);
        Ok(())
    }

    /// Run until shut down, then stop the runtime.
    pub async fn run(mut self) {
        info!(
            config = %self.paths.config_path().display(),
            "Reconcile loop started"
        );
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Reconcile loop shutting down");
                    break;
                }
                received = self.listener.recv() => match received {
                    Ok(()) => {
                        debug!("Deploy notification received");
                        if let Err(err) = self.reconcile_now().await {
                            error!(error = %err, "Reconciliation failed");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Deploy listener failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
                _ = tokio::time::sleep(self.refresh_interval) => {
                    if let Err(err) = self.reconcile_now().await {
                        error!(error = %err, "Reconciliation failed");
                    }
                }
            }
        }

        if let Err(err) = self.supervisor.stop().await {
            error!(error = %err, "Failed to stop the runtime during shutdown");
        }
    }
}
