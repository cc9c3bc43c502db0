// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tarmac front door.
//!
//! One TCP listener per node worker, forwarding every request onto one of
//! two per-worker Unix sockets:
//!
//! ```text
//!              ┌──────────────────────────────┐
//!   TCP :8080  │          tarmac-proxy        │
//!  ───────────▶│  /__tarmac* ── secret gate   │
//!              │  host == admin host ─────────┼──▶ admin.sock  (admin API)
//!              │  any other host ─────────────┼──▶ engine.sock (worker runtime)
//!              └──────────────────────────────┘
//! ```
//!
//! Decisions are made per request from the path and the `host` header
//! alone. Requests under the internal prefix must present the shared
//! secret and are answered 403 locally otherwise, so that prefix never
//! reaches tenant code unauthenticated. Forwarding preserves the request
//! as-is apart from injecting `x-forwarded-host` and `x-forwarded-proto`
//! when absent, and HTTP/1.1 upgrades are bridged by pairing the upgrade
//! futures of both legs.

#![deny(missing_docs)]

/// Per-request routing decisions.
pub mod classify;

/// One-shot HTTP over a Unix socket.
pub mod client;

/// Error types for the front door.
pub mod error;

/// The accept loop and per-request forwarding.
pub mod serve;

pub use classify::{Backend, INTERNAL_PREFIX, classify_host, secret_allows};
pub use client::send_over_unix;
pub use error::{Error, Result};
pub use serve::{Proxy, ProxyConfig};
