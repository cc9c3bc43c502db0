// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! One worker's wiring: admin API, supervised runtime, front door and the
//! background loops, started together and torn down front door first.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{Notify, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use tarmac_admin::AppState;
use tarmac_engine::{LaunchSpec, RuntimeState, Supervisor, WorkerPaths};
use tarmac_proxy::{Proxy, ProxyConfig};
use tarmac_state::ReloadListener;

use crate::cron_dispatcher::CronDispatcher;
use crate::leader::NodeLeadership;
use crate::reconcile::Reconciler;

/// Everything one worker needs to run.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Hostname that selects the admin API at the front door.
    pub admin_host: String,
    /// Front-door TCP port, shared by all workers of the node.
    pub port: u16,
    /// Shared secret required on internal endpoints.
    pub secret: String,
    /// Identifier of this node, shared by its workers.
    pub node_id: String,
    /// Node data directory.
    pub directory: PathBuf,
    /// Total number of workers on this node.
    pub workers: usize,
    /// Index of this worker.
    pub worker_id: usize,
    /// Worker-runtime executable.
    pub runtime_program: PathBuf,
}

/// Bind the shared front-door port.
///
/// With more than one worker every process binds the same port through
/// `SO_REUSEPORT` and the kernel spreads connections across them.
fn bind_front_door(port: u16, workers: usize) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    if workers > 1 {
        socket.set_reuseport(true)?;
    }
    socket.bind(addr)?;
    socket.listen(1024)
}

/// A started worker: all services plus the handles to wind them down.
pub struct NodeRuntime {
    proxy: Proxy,
    admin_stop: oneshot::Sender<()>,
    admin_handle: JoinHandle<std::io::Result<()>>,
    reconcile_shutdown: Arc<Notify>,
    reconcile_handle: JoinHandle<()>,
    dispatcher_shutdown: Arc<Notify>,
    dispatcher_handle: JoinHandle<()>,
    leadership: NodeLeadership,
    runtime_state: watch::Receiver<RuntimeState>,
}

impl NodeRuntime {
    /// Start every service of one worker.
    ///
    /// The first runtime launch happens here, so a worker that cannot
    /// serve fails its startup instead of limping along empty.
    pub async fn start(config: NodeConfig, pool: PgPool) -> anyhow::Result<Self> {
        let paths = WorkerPaths::new(&config.directory, config.worker_id);
        paths
            .ensure()
            .await
            .context("preparing the worker directory")?;

        // Admin API on its per-worker socket.
        let state = AppState::new(
            pool.clone(),
            config.secret.clone(),
            paths.engine_socket().display().to_string(),
        );
        let app = tarmac_admin::router(state);
        let admin_socket = paths.admin_socket();
        let (admin_stop, admin_stopped) = oneshot::channel::<()>();
        let admin_handle = tokio::spawn(async move {
            tarmac_admin::serve_unix(&admin_socket, app, async move {
                let _ = admin_stopped.await;
            })
            .await
        });

        // Supervised runtime plus the loop that keeps it current.
        let supervisor = Supervisor::new(paths.clone());
        let runtime_state = supervisor.subscribe();
        let listener = ReloadListener::connect(&pool)
            .await
            .context("subscribing to deploy notifications")?;
        let launch = LaunchSpec::serve(&config.runtime_program, &paths.config_path());
        let mut reconciler = Reconciler::new(
            pool.clone(),
            supervisor,
            listener,
            paths.clone(),
            launch,
            config.secret.clone(),
        );
        reconciler
            .reconcile_now()
            .await
            .context("starting the worker runtime")?;
        let reconcile_shutdown = reconciler.shutdown_handle();
        let reconcile_handle = tokio::spawn(reconciler.run());

        // Front door last, so no request lands before the backends exist.
        let front_door = bind_front_door(config.port, config.workers)
            .with_context(|| format!("binding front-door port {}", config.port))?;
        let proxy = Proxy::start(
            front_door,
            ProxyConfig {
                admin_host: config.admin_host.clone(),
                secret: config.secret.clone(),
                admin_socket: paths.admin_socket(),
                engine_socket: paths.engine_socket(),
            },
        )?;

        // Node-singleton duties behind leader election.
        let leadership =
            NodeLeadership::start(config.database_url.clone(), config.node_id.clone());
        let dispatcher = CronDispatcher::new(pool, paths.engine_socket(), leadership.watch());
        let dispatcher_shutdown = dispatcher.shutdown_handle();
        let dispatcher_handle = tokio::spawn(dispatcher.run());

        info!(
            worker = config.worker_id,
            port = config.port,
            admin_host = %config.admin_host,
            "Worker started"
        );

        Ok(Self {
            proxy,
            admin_stop,
            admin_handle,
            reconcile_shutdown,
            reconcile_handle,
            dispatcher_shutdown,
            dispatcher_handle,
            leadership,
            runtime_state,
        })
    }

    /// Observe the supervised runtime's state.
    pub fn runtime_state(&self) -> watch::Receiver<RuntimeState> {
        self.runtime_state.clone()
    }

    /// Stop every service, front door first.
    pub async fn shutdown(self) {
        self.proxy.shutdown().await;

        self.dispatcher_shutdown.notify_one();
        if let Err(err) = self.dispatcher_handle.await {
            error!("Scheduled dispatch task panicked: {}", err);
        }

        self.leadership.shutdown().await;

        self.reconcile_shutdown.notify_one();
        if let Err(err) = self.reconcile_handle.await {
            error!("Reconcile task panicked: {}", err);
        }

        let _ = self.admin_stop.send(());
        match self.admin_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("Admin server failed during shutdown: {}", err),
            Err(err) => error!("Admin server task panicked: {}", err),
        }

        info!("Worker stopped");
    }
}

/// Run one worker until a signal arrives or the runtime crashes.
///
/// A crashed runtime makes this return an error after teardown, which
/// exits the worker non-zero and brings the whole node down with it.
pub async fn run_worker(config: NodeConfig) -> anyhow::Result<()> {
    info!(
        node = %config.node_id,
        worker = config.worker_id,
        "Starting worker"
    );

    let pool = tarmac_state::pool::connect(&config.database_url).await?;
    let node = NodeRuntime::start(config, pool).await?;

    let mut runtime_state = node.runtime_state();
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    let crashed = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break false;
            }
            _ = sigterm.recv() => {
                info!("Termination signal received");
                break false;
            }
            changed = runtime_state.changed() => {
                if changed.is_err() {
                    break false;
                }
                if *runtime_state.borrow_and_update() == RuntimeState::Crashed {
                    error!("Worker runtime crashed");
                    break true;
                }
            }
        }
    };

    node.shutdown().await;

    if crashed {
        anyhow::bail!("worker runtime crashed");
    }
    Ok(())
}
