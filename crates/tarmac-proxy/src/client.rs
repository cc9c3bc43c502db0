// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! One-shot HTTP over a Unix socket.

use std::path::Path;

use hyper::body::{Body, Incoming};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::{Error, Result};

/// Send one request over a fresh connection to a Unix socket.
///
/// The connection task is spawned with upgrade support and winds down when
/// the returned response (and its body) is dropped, so an abandoned caller
/// cancels the upstream work with it.
pub async fn send_over_unix<B>(socket: &Path, request: Request<B>) -> Result<Response<Incoming>>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let stream = UnixStream::connect(socket).await.map_err(|source| Error::Connect {
        socket: socket.to_path_buf(),
        source,
    })?;

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.with_upgrades().await {
            debug!("Upstream connection ended with error: {}", err);
        }
    });

    Ok(sender.send_request(request).await?)
}
