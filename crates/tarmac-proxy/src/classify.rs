// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-request routing decisions.
//!
//! Both decisions here are pure functions over request data, so every
//! request is classified independently and nothing is cached across
//! requests.

/// Path prefix reserved for the platform. Requests under it never reach
/// tenant code.
pub const INTERNAL_PREFIX: &str = "/__tarmac";

/// Which upstream socket a request is forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The administrative API socket.
    Admin,
    /// The worker-runtime socket.
    Engine,
}

/// Classify a request by its `host` header.
///
/// The port is stripped and the comparison is case-insensitive. Requests
/// without a usable host go to the admin backend.
pub fn classify_host(host_header: Option<&str>, admin_host: &str) -> Backend {
    let host = host_header
        .map(|raw| raw.split_once(':').map_or(raw, |(host, _)| host))
        .unwrap_or("");
    if host.is_empty() || host.eq_ignore_ascii_case(admin_host) {
        Backend::Admin
    } else {
        Backend::Engine
    }
}

/// Whether a presented secret opens the internal prefix. Absent and wrong
/// values are equally denied.
pub fn secret_allows(presented: Option<&str>, secret: &str) -> bool {
    presented == Some(secret)
}
