// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tarmac runtime supervision.
//!
//! Each node worker runs exactly one worker-runtime child, an opaque process
//! that loads a generated config and serves every deployed project over a
//! Unix socket. This crate turns committed store state into that config and
//! keeps the child alive, observable, and attributable.
//!
//! # Architecture
//!
//! ```text
//!  PostgreSQL (tarmac-state)
//!        │ load_deployed_projects
//!        ▼
//!  config::write_runtime_config ──► engine/config.json
//!        │ digest                    engine/blobs/<sha256>
//!        ▼
//!  Supervisor::start ─────────────► tarmac-runtime serve config.json
//!        │                                │ stdout/stderr
//!        ▼                                ▼
//!  watch<RuntimeState>               log_demux ──► tracing events
//! ```
//!
//! # Reconfiguration
//!
//! A reload is stop-then-start against a freshly written config. Because
//! config generation is deterministic, the caller compares the generated
//! digest against the previous pass and skips the restart when the bytes did
//! not change.
//!
//! # Modules
//!
//! - [`paths`]: Per-worker filesystem layout
//! - [`config`]: Runtime config generation and artifact materialization
//! - [`supervisor`]: Child process lifecycle and state machine
//! - [`log_demux`]: Tenant attribution of runtime output
//! - [`error`]: Error types for supervision

#![deny(missing_docs)]

/// Error types for supervision.
pub mod error;

/// Per-worker filesystem layout.
pub mod paths;

/// Runtime config generation and artifact materialization.
pub mod config;

/// Tenant attribution of runtime output.
pub mod log_demux;

/// Child process lifecycle and state machine.
pub mod supervisor;

pub use config::{GeneratedConfig, write_runtime_config};
pub use error::{Error, Result};
pub use paths::WorkerPaths;
pub use supervisor::{LaunchSpec, RuntimeState, Supervisor};
