// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node server binary: a master that spawns workers, or one worker.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use tarmac_server::{Cli, cluster, node};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cluster::worker_index()? {
        Some(worker_id) => node::run_worker(cli.node_config(worker_id)?).await,
        None => {
            // Reach the database once up front so migrations run exactly
            // once and a bad URL fails before any worker spawns.
            let pool = tarmac_state::pool::connect(cli.database_url()?).await?;
            pool.close().await;
            cluster::run_master(cli.workers()).await
        }
    }
}
