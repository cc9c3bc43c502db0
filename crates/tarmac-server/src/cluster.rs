// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker-process cluster.
//!
//! The master spawns N copies of its own executable, each flagged as a
//! worker through `TARMAC_WORKER_ID`, and watches them. One worker failing
//! takes the whole node down non-zero so an external supervisor restarts
//! it as a unit.

use std::ffi::OsString;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::{Context, bail};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::Command;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Environment variable carrying a worker's index. Set only by the master.
pub const WORKER_ENV: &str = "TARMAC_WORKER_ID";

/// How long workers get to exit after a termination signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Worker index of this process, or `None` in the master.
pub fn worker_index() -> anyhow::Result<Option<usize>> {
    match std::env::var(WORKER_ENV) {
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).context("reading the worker index"),
        Ok(raw) => {
            let index = raw
                .parse::<usize>()
                .with_context(|| format!("invalid {WORKER_ENV} value {raw:?}"))?;
            Ok(Some(index))
        }
    }
}

/// Spawn `workers` copies of this executable and wait for them.
///
/// Returns once every worker exited cleanly, or with an error after any
/// worker failed. Interrupt and termination signals are forwarded to all
/// workers first.
pub async fn run_master(workers: usize) -> anyhow::Result<()> {
    let exe = std::env::current_exe().context("resolving own executable")?;
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    let mut children = JoinSet::new();
    let mut pids = Vec::with_capacity(workers);

    for index in 0..workers {
        let mut child = Command::new(&exe)
            .args(&args)
            .env(WORKER_ENV, index.to_string())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning worker {index}"))?;
        if let Some(pid) = child.id() {
            pids.push(Pid::from_raw(pid as i32));
        }
        info!(worker = index, pid = child.id(), "Worker spawned");
        children.spawn(async move { (index, child.wait().await) });
    }

    info!(workers, "Node master running");

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; stopping workers");
                drain(children, &pids).await;
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("Termination signal received; stopping workers");
                drain(children, &pids).await;
                return Ok(());
            }
            joined = children.join_next() => match joined {
                None => return Ok(()),
                Some(Ok((index, Ok(status)))) if status.success() => {
                    info!(worker = index, "Worker exited");
                }
                Some(Ok((index, Ok(status)))) => {
                    error!(worker = index, code = status.code(), "Worker failed; stopping the node");
                    drain(children, &pids).await;
                    bail!("worker {index} exited with {status}");
                }
                Some(Ok((index, Err(err)))) => {
                    error!(worker = index, error = %err, "Worker wait failed; stopping the node");
                    drain(children, &pids).await;
                    bail!("waiting on worker {index} failed: {err}");
                }
                Some(Err(err)) => {
                    error!(error = %err, "Worker watch task panicked; stopping the node");
                    drain(children, &pids).await;
                    bail!("worker watch task panicked: {err}");
                }
            }
        }
    }
}

/// Signal every worker and wait out the grace period, then kill stragglers.
async fn drain(mut children: JoinSet<(usize, std::io::Result<ExitStatus>)>, pids: &[Pid]) {
    for pid in pids {
        if let Err(err) = kill(*pid, Signal::SIGTERM) {
            // ESRCH means the worker is already gone.
            if err != Errno::ESRCH {
                warn!(pid = pid.as_raw(), error = %err, "Failed to signal worker");
            }
        }
    }

    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    loop {
        match tokio::time::timeout_at(deadline, children.join_next()).await {
            Ok(None) => break,
            Ok(Some(Ok((index, Ok(status))))) => {
                info!(worker = index, code = status.code(), "Worker stopped");
            }
            Ok(Some(Ok((index, Err(err))))) => {
                warn!(worker = index, error = %err, "Worker wait failed");
            }
            Ok(Some(Err(err))) => {
                warn!(error = %err, "Worker watch task panicked");
            }
            Err(_) => {
                // Grace period over. Aborting the watch tasks drops the
                // child handles, which kills the processes.
                warn!("Workers still running after the grace period; killing");
                children.abort_all();
                while children.join_next().await.is_some() {}
                break;
            }
        }
    }
}
