// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle management for the worker-runtime child process.
//!
//! One supervisor owns at most one runtime child. State transitions are
//! published on a watch channel so the node runtime can react to a crash
//! without polling. A non-zero exit that nobody asked for is `Crashed` and
//! the node treats it as fatal; the process manager around the node restarts
//! the whole worker rather than us respawning a half-known runtime.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::log_demux;
use crate::paths::WorkerPaths;

/// How long a stop waits between SIGTERM and SIGKILL.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle states of the runtime child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// No child process exists.
    Stopped,
    /// The child is being spawned.
    Starting,
    /// The child is up and serving the engine socket.
    Running,
    /// The child is being torn down on request.
    Stopping,
    /// The child exited non-zero without a stop request.
    Crashed,
}

/// How to launch the runtime executable.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Runtime executable.
    pub program: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// The standard `serve` invocation against a generated config file.
    pub fn serve(program: impl Into<PathBuf>, config_path: &Path) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "serve".to_string(),
                config_path.display().to_string(),
                "--verbose".to_string(),
            ],
        }
    }
}

struct ChildHandle {
    stop_tx: oneshot::Sender<()>,
    exited: JoinHandle<()>,
}

/// Supervises the single runtime child of one node worker.
pub struct Supervisor {
    paths: WorkerPaths,
    state_tx: watch::Sender<RuntimeState>,
    child: Option<ChildHandle>,
}

impl Supervisor {
    /// A supervisor with no child, in `Stopped`.
    pub fn new(paths: WorkerPaths) -> Self {
        let (state_tx, _) = watch::channel(RuntimeState::Stopped);
        Self {
            paths,
            state_tx,
            child: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> RuntimeState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<RuntimeState> {
        self.state_tx.subscribe()
    }

    /// True while a child exists and has not exited.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), RuntimeState::Starting | RuntimeState::Running)
    }

    /// Spawn the runtime child.
    ///
    /// The child is considered `Running` once the spawn succeeds; readiness
    /// of the engine socket is the runtime's own business. Both output
    /// streams are drained through the log demultiplexer.
    pub async fn start(&mut self, launch: &LaunchSpec) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::AlreadyRunning);
        }

        self.state_tx.send_replace(RuntimeState::Starting);
        self.paths.ensure().await?;
        // A stale socket file from a previous run blocks the child's bind.
        remove_socket_file(&self.paths.engine_socket()).await?;

        let mut cmd = Command::new(&launch.program);
        cmd.args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state_tx.send_replace(RuntimeState::Stopped);
                return Err(e.into());
            }
        };

        let worker_id = self.paths.worker_id();
        info!(
            worker = worker_id,
            program = %launch.program.display(),
            pid = child.id(),
            "Runtime process started"
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(log_demux::pump(stdout, worker_id, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_demux::pump(stderr, worker_id, true));
        }

        // Running before the monitor spawns: an instant exit must observe
        // Running and overwrite it, not the other way around.
        self.state_tx.send_replace(RuntimeState::Running);

        let (stop_tx, stop_rx) = oneshot::channel();
        let exited = tokio::spawn(monitor_child(
            child,
            self.state_tx.clone(),
            stop_rx,
            self.paths.engine_socket(),
            worker_id,
        ));
        self.child = Some(ChildHandle { stop_tx, exited });

        Ok(())
    }

    /// Stop the runtime child and clean up its socket file.
    ///
    /// Idempotent: with no child this only normalizes the state to
    /// `Stopped`, which also acknowledges an observed crash.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.child.take() {
            // The monitor task performs the kill and the transition.
            let _ = handle.stop_tx.send(());
            if let Err(e) = handle.exited.await {
                error!("Runtime monitor task failed: {}", e);
            }
        }
        remove_socket_file(&self.paths.engine_socket()).await?;
        self.state_tx.send_replace(RuntimeState::Stopped);
        Ok(())
    }
}

/// Own the child until it exits or a stop is requested.
async fn monitor_child(
    mut child: Child,
    state_tx: watch::Sender<RuntimeState>,
    mut stop_rx: oneshot::Receiver<()>,
    engine_socket: PathBuf,
    worker_id: usize,
) {
    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) if status.success() => {
                    info!(worker = worker_id, "Runtime process exited cleanly");
                    state_tx.send_replace(RuntimeState::Stopped);
                }
                Ok(status) => {
                    error!(
                        worker = worker_id,
                        code = status.code(),
                        "Runtime process crashed"
                    );
                    state_tx.send_replace(RuntimeState::Crashed);
                }
                Err(e) => {
                    error!(worker = worker_id, "Failed to reap runtime process: {}", e);
                    state_tx.send_replace(RuntimeState::Crashed);
                }
            }
        }
        _ = &mut stop_rx => {
            state_tx.send_replace(RuntimeState::Stopping);
            graceful_kill(&mut child, worker_id).await;
            let _ = tokio::fs::remove_file(&engine_socket).await;
            state_tx.send_replace(RuntimeState::Stopped);
        }
    }
}

/// SIGTERM first; SIGKILL when the grace period runs out.
async fn graceful_kill(child: &mut Child, worker_id: usize) {
    if let Some(pid) = child.id() {
        let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        match timeout(STOP_GRACE, child.wait()).await {
            Ok(_) => {
                info!(worker = worker_id, "Runtime process stopped");
                return;
            }
            Err(_) => {
                warn!(worker = worker_id, "Runtime ignored SIGTERM, killing");
            }
        }
    }
    if let Err(e) = child.kill().await {
        error!(worker = worker_id, "Failed to kill runtime process: {}", e);
    }
}

async fn remove_socket_file(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
