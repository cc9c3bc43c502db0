// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tarmac administrative HTTP API.
//!
//! One axum app served over the per-worker admin unix socket, carrying two
//! surfaces with different credentials:
//!
//! - `/api/*`: project, version, KV and queue management for dashboards and
//!   CLIs, gated by a session credential in the `auth-token` header.
//! - `/__tarmac/*`: binding resolution for worker runtimes, gated by the
//!   shared secret in the `x-tarmac-secret` header.
//!
//! The front door node proxies public `/__tarmac` traffic here only after
//! checking the secret itself; the gate is enforced again in this crate
//! because runtimes dial the admin socket directly.
//!
//! Handlers are thin translations from HTTP to [`tarmac_state`] calls. The
//! deploy endpoint in particular delegates validation, gapless version
//! numbering and the commit-time reload notification to the store
//! transaction.

#![deny(missing_docs)]

/// Boundary authentication extractors.
pub mod auth;

/// API error types and response rendering.
pub mod error;

/// Route handlers and the route table.
pub mod routes;

/// Unix-socket serving.
pub mod serve;

/// Shared app state.
pub mod state;

pub use auth::{InternalCaller, SECRET_HEADER, SESSION_HEADER, Session};
pub use error::{ApiError, ApiJson, InternalError, InternalJson};
pub use routes::router;
pub use serve::serve_unix;
pub use state::AppState;
