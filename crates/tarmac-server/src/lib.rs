// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tarmac node server.
//!
//! A node is one machine serving tarmac projects. The master process
//! spawns one worker process per configured slot; every worker runs the
//! full service stack against its own socket directory:
//!
//! ```text
//! master ─ spawns ─▶ worker 0..N, each with
//!                      ├── front door   shared TCP port (SO_REUSEPORT)
//!                      ├── admin API    <dir>/<id>/admin/admin.sock
//!                      ├── runtime      <dir>/<id>/engine/engine.sock
//!                      ├── reconcile    deploys to runtime restarts
//!                      └── dispatch     scheduled events, leader-gated
//! ```
//!
//! Workers share nothing but the database and the listening port, so any
//! of them can serve any request and one crashing never corrupts its
//! siblings. Node-singleton duties run on whichever worker holds the
//! node's advisory lock.

#![deny(missing_docs)]

/// Command-line flags and their environment fallbacks.
pub mod cli;

/// Master process: worker spawning and supervision.
pub mod cluster;

/// Scheduled-event dispatch to the worker runtime.
pub mod cron_dispatcher;

/// Advisory-lock leader election among a node's workers.
pub mod leader;

/// Per-worker service wiring.
pub mod node;

/// Deploy-to-runtime reconciliation.
pub mod reconcile;

pub use cli::{Cli, WorkerCount};
pub use cron_dispatcher::CronDispatcher;
pub use leader::NodeLeadership;
pub use node::{NodeConfig, NodeRuntime, run_worker};
pub use reconcile::Reconciler;
