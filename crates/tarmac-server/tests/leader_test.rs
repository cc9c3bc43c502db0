// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Leader election among workers campaigning for one node id.

mod common;

use std::time::Duration;

use uuid::Uuid;

use tarmac_server::NodeLeadership;

async fn wait_for_leadership(leadership: &NodeLeadership, timeout: Duration) {
    let mut watch = leadership.watch();
    tokio::time::timeout(timeout, async {
        while !*watch.borrow() {
            watch.changed().await.expect("campaign task gone");
        }
    })
    .await
    .expect("never became leader");
}

#[tokio::test]
async fn only_one_worker_leads_and_failover_happens() {
    skip_if_no_db!();
    let url = std::env::var("TEST_TARMAC_DATABASE_URL").unwrap();
    let node_id = format!("test-node-{}", Uuid::new_v4());

    let first = NodeLeadership::start(url.clone(), node_id.clone());
    wait_for_leadership(&first, Duration::from_secs(10)).await;

    let second = NodeLeadership::start(url.clone(), node_id.clone());
    // Give the second campaigner time to connect and lose its first try.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(first.is_leader());
    assert!(!second.is_leader());

    // A clean shutdown releases the lock; the other worker takes over on
    // one of its retries.
    first.shutdown().await;
    wait_for_leadership(&second, Duration::from_secs(30)).await;

    second.shutdown().await;
}

#[tokio::test]
async fn different_nodes_elect_independently() {
    skip_if_no_db!();
    let url = std::env::var("TEST_TARMAC_DATABASE_URL").unwrap();

    let one = NodeLeadership::start(url.clone(), format!("test-node-{}", Uuid::new_v4()));
    let two = NodeLeadership::start(url.clone(), format!("test-node-{}", Uuid::new_v4()));

    wait_for_leadership(&one, Duration::from_secs(10)).await;
    wait_for_leadership(&two, Duration::from_secs(10)).await;

    one.shutdown().await;
    two.shutdown().await;
}
