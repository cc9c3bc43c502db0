// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! On-disk layout for one node worker.
//!
//! Every worker owns a private directory under the node data dir. The admin
//! API binds the admin socket; the runtime child binds the engine socket and
//! reads the generated config plus the content-addressed artifact store next
//! to it.

use std::path::{Path, PathBuf};

/// Per-worker filesystem layout: `<root>/<worker_id>/{admin,engine}/...`.
#[derive(Debug, Clone)]
pub struct WorkerPaths {
    root: PathBuf,
    worker_id: usize,
}

impl WorkerPaths {
    /// Layout rooted at the node data dir for the given worker index.
    pub fn new(root: impl Into<PathBuf>, worker_id: usize) -> Self {
        Self {
            root: root.into(),
            worker_id,
        }
    }

    /// Worker index within the node.
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Directory owned by this worker.
    pub fn worker_dir(&self) -> PathBuf {
        self.root.join(self.worker_id.to_string())
    }

    /// Directory holding the admin socket.
    pub fn admin_dir(&self) -> PathBuf {
        self.worker_dir().join("admin")
    }

    /// Unix socket the admin API listens on.
    pub fn admin_socket(&self) -> PathBuf {
        self.admin_dir().join("admin.sock")
    }

    /// Directory holding the engine socket and runtime artifacts.
    pub fn engine_dir(&self) -> PathBuf {
        self.worker_dir().join("engine")
    }

    /// Unix socket the runtime child binds.
    pub fn engine_socket(&self) -> PathBuf {
        self.engine_dir().join("engine.sock")
    }

    /// Generated runtime config file.
    pub fn config_path(&self) -> PathBuf {
        self.engine_dir().join("config.json")
    }

    /// Content-addressed store for blob, data-binding, and site-file bytes.
    pub fn blob_dir(&self) -> PathBuf {
        self.engine_dir().join("blobs")
    }

    /// Disk path of one content-addressed artifact.
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.blob_dir().join(digest)
    }

    /// Create the directory tree.
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.admin_dir()).await?;
        tokio::fs::create_dir_all(self.blob_dir()).await?;
        Ok(())
    }
}

impl AsRef<Path> for WorkerPaths {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}
