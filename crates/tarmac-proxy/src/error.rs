// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for tarmac-proxy.

use std::path::PathBuf;

use thiserror::Error;

/// Front-door errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Dialing an upstream socket failed.
    #[error("Connect to {socket} failed: {source}")]
    Connect {
        /// Socket that refused the connection.
        socket: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Speaking HTTP to an upstream failed.
    #[error("Upstream HTTP error: {0}")]
    Http(#[from] hyper::Error),
}

/// Result type using the front-door Error.
pub type Result<T> = std::result::Result<T, Error>;
