// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tarmac system of record.
//!
//! This crate owns every byte of durable platform state: projects, their
//! immutable versions with blobs/routes/bindings/sites, per-project scheduled
//! jobs, KV databases with their entries, and queues. PostgreSQL is the only
//! backend.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       tarmac-state                        │
//! ├───────────────────────────────────────────────────────────┤
//! │  versions: deploy transaction (reconciler)                │
//! │  kv:       multi-tenant KV engine                         │
//! │  cron:     scheduled-job diffing                          │
//! │  deployed: per-node runtime state reads                   │
//! ├───────────────────────────────────────────────────────────┤
//! │  notify:   LISTEN/NOTIFY wakeups on commit                │
//! ├───────────────────────────────────────────────────────────┤
//! │  PostgreSQL (sqlx, embedded migrations)                   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Deploy pipeline
//!
//! A deploy is one transaction: the project row is locked, the next gapless
//! version number is computed, the version row and all child rows are
//! inserted, scheduled jobs are diffed against the uploaded set, and a
//! payload-free notification is queued on the reload channel. Postgres
//! delivers the notification only if the transaction commits, so observers
//! never reconfigure against uncommitted state.
//!
//! # Modules
//!
//! - [`pool`]: Connection pool setup and migration on connect
//! - [`migrations`]: Embedded schema migrations
//! - [`records`]: Row types shared by the query modules
//! - [`projects`]: Project CRUD
//! - [`sessions`]: Session-credential lookups for the admin boundary
//! - [`versions`]: The deploy transaction and version reads
//! - [`cron`]: Scheduled-job diffing and reads
//! - [`kv`]: KV databases and the KV engine
//! - [`queues`]: Queues and the enqueue boundary
//! - [`deployed`]: Latest-version state reads for runtime config generation
//! - [`notify`]: Reload channel publish/subscribe
//! - [`error`]: Error types for store operations

#![deny(missing_docs)]

/// Error types for store operations.
pub mod error;

/// Embedded schema migrations.
pub mod migrations;

/// Connection pool setup; applies migrations on connect.
pub mod pool;

/// Row types shared by the query modules.
pub mod records;

/// Project CRUD.
pub mod projects;

/// Session-credential lookups for the admin boundary.
pub mod sessions;

/// The deploy transaction and version reads.
pub mod versions;

/// Scheduled-job diffing and reads.
pub mod cron;

/// KV databases and the KV engine.
pub mod kv;

/// Queues and the enqueue boundary.
pub mod queues;

/// Latest-version state reads for runtime config generation.
pub mod deployed;

/// Reload channel publish/subscribe.
pub mod notify;

pub use error::{Error, Result};
pub use kv::KvEngine;
pub use notify::{RELOAD_CHANNEL, ReloadListener};
