// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Unix-socket serving.

use std::io;
use std::path::Path;

use axum::Router;
use tokio::fs;
use tokio::net::UnixListener;
use tracing::info;

/// Serve the app on a unix socket until `shutdown` resolves.
///
/// The parent directory is created and a stale socket file from a previous
/// run is removed before binding. In-flight requests drain after shutdown
/// resolves.
pub async fn serve_unix<F>(socket_path: &Path, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    match fs::remove_file(socket_path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let listener = UnixListener::bind(socket_path)?;
    info!(socket = %socket_path.display(), "Admin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
