// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconcile loop against a real database and a stand-in runtime process.

mod common;

use std::time::Duration;

use uuid::Uuid;

use tarmac_engine::{LaunchSpec, RuntimeState, Supervisor, WorkerPaths};
use tarmac_server::Reconciler;
use tarmac_state::ReloadListener;

/// A runtime stand-in that just stays alive until signalled.
fn sleeper() -> LaunchSpec {
    LaunchSpec {
        program: "/bin/sh".into(),
        args: vec!["-c".into(), "sleep 30".into()],
    }
}

#[tokio::test]
async fn deploy_notification_rewrites_the_config() {
    skip_if_no_db!();
    let pool = common::test_pool().await.expect("test pool");

    let dir = tempfile::tempdir().expect("tempdir");
    let paths = WorkerPaths::new(dir.path(), 0);

    let supervisor = Supervisor::new(paths.clone());
    let mut state_rx = supervisor.subscribe();
    let listener = ReloadListener::connect(&pool).await.expect("listener");
    let mut reconciler = Reconciler::new(
        pool.clone(),
        supervisor,
        listener,
        paths.clone(),
        sleeper(),
        "secret".into(),
    )
    .with_refresh_interval(Duration::from_secs(3600));

    reconciler.reconcile_now().await.expect("initial launch");
    assert!(paths.config_path().is_file());

    let shutdown = reconciler.shutdown_handle();
    let handle = tokio::spawn(reconciler.run());

    // Deploying a new project fires a notification every worker hears.
    let project_id = common::create_project(&pool).await;
    let host = format!("reconcile-{}.test", Uuid::new_v4());
    tarmac_state::versions::create_version(&pool, project_id, &common::minimal_payload(&host))
        .await
        .expect("deploy failed");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        let config = tokio::fs::read_to_string(paths.config_path())
            .await
            .unwrap_or_default();
        if config.contains(&host) {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "config never picked up the deploy"
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    shutdown.notify_one();
    handle.await.expect("reconcile task");
    assert_eq!(*state_rx.borrow_and_update(), RuntimeState::Stopped);
}

#[tokio::test]
async fn unchanged_state_does_not_restart_the_runtime() {
    skip_if_no_db!();
    let pool = common::test_pool().await.expect("test pool");

    let dir = tempfile::tempdir().expect("tempdir");
    let paths = WorkerPaths::new(dir.path(), 0);

    let supervisor = Supervisor::new(paths.clone());
    let mut state_rx = supervisor.subscribe();
    let listener = ReloadListener::connect(&pool).await.expect("listener");
    let mut reconciler = Reconciler::new(
        pool.clone(),
        supervisor,
        listener,
        paths.clone(),
        sleeper(),
        "secret".into(),
    );

    reconciler.reconcile_now().await.expect("initial launch");
    let before = tokio::fs::read(paths.config_path()).await.expect("config");
    while state_rx.has_changed().expect("supervisor alive") {
        state_rx.borrow_and_update();
    }

    reconciler.reconcile_now().await.expect("second pass");
    let after = tokio::fs::read(paths.config_path()).await.expect("config");

    // A parallel test may deploy between the two passes; only a truly
    // unchanged config proves the runtime was left alone.
    if before == after {
        assert!(!state_rx.has_changed().expect("supervisor alive"));
    }

    // Wind down through the loop so the stand-in process is stopped.
    let shutdown = reconciler.shutdown_handle();
    let handle = tokio::spawn(reconciler.run());
    shutdown.notify_one();
    handle.await.expect("reconcile task");
    assert_eq!(*state_rx.borrow_and_update(), RuntimeState::Stopped);
}
