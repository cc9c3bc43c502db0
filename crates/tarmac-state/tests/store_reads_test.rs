// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for deployed-state reads, queues, and sessions.

mod common;

use chrono::{Duration, Utc};
use common::{TestContext, blob, minimal_payload};
use tarmac_state::{deployed, projects, queues, sessions, versions};
use tarmac_types::deploy::BlobKind;
use uuid::Uuid;

#[tokio::test]
async fn deployed_state_returns_latest_version_only() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut v1 = minimal_payload("deployed.test");
    v1.blobs = vec![blob("index.js", BlobKind::Esmodule, b"// v1")];
    versions::create_version(&ctx.pool, project_id, &v1)
        .await
        .expect("deploy failed");

    let mut v2 = minimal_payload("deployed.test");
    v2.blobs = vec![blob("index.js", BlobKind::Esmodule, b"// v2")];
    versions::create_version(&ctx.pool, project_id, &v2)
        .await
        .expect("deploy failed");

    let state = deployed::load_deployed_projects(&ctx.pool)
        .await
        .expect("load failed");
    let mine = state
        .iter()
        .find(|p| p.project_id == project_id)
        .expect("project missing from deployed state");

    assert_eq!(mine.version, 2);
    assert_eq!(mine.blobs.len(), 1);
    assert_eq!(mine.blobs[0].data, b"// v2");
    assert_eq!(mine.routes[0].host, "deployed.test");
}

#[tokio::test]
async fn undeployed_projects_are_absent_from_deployed_state() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let state = deployed::load_deployed_projects(&ctx.pool)
        .await
        .expect("load failed");
    assert!(state.iter().all(|p| p.project_id != project_id));
}

#[tokio::test]
async fn queue_push_requires_an_existing_queue() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let queue_id = ctx.create_queue().await;

    queues::push_message(&ctx.pool, queue_id, &serde_json::json!({"n": 1}))
        .await
        .expect("push failed");

    let err = queues::push_message(&ctx.pool, Uuid::new_v4(), &serde_json::json!({}))
        .await
        .expect_err("push to ghost queue should fail");
    assert!(matches!(err, tarmac_state::Error::QueueNotFound(_)));
}

#[tokio::test]
async fn session_tokens_authenticate_until_expiry() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");

    let user = sessions::create_user(&ctx.pool, &format!("user-{}", Uuid::new_v4()))
        .await
        .expect("create user failed");

    let token = format!("token-{}", Uuid::new_v4());
    sessions::create_session(&ctx.pool, user.id, &token, None)
        .await
        .expect("create session failed");

    let resolved = sessions::authenticate(&ctx.pool, &token)
        .await
        .expect("authenticate failed");
    assert_eq!(resolved, Some(user.id));

    let unknown = sessions::authenticate(&ctx.pool, "wrong-token")
        .await
        .expect("authenticate failed");
    assert_eq!(unknown, None);

    let expired_token = format!("token-{}", Uuid::new_v4());
    sessions::create_session(
        &ctx.pool,
        user.id,
        &expired_token,
        Some(Utc::now() - Duration::hours(1)),
    )
    .await
    .expect("create session failed");
    let expired = sessions::authenticate(&ctx.pool, &expired_token)
        .await
        .expect("authenticate failed");
    assert_eq!(expired, None);
}

#[tokio::test]
async fn project_latest_version_tracks_deploys() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let before = projects::get_project(&ctx.pool, project_id)
        .await
        .expect("get failed")
        .expect("project missing");
    assert_eq!(before.latest_version, None);

    versions::create_version(&ctx.pool, project_id, &minimal_payload("latest.test"))
        .await
        .expect("deploy failed");

    let after = projects::get_project(&ctx.pool, project_id)
        .await
        .expect("get failed")
        .expect("project missing");
    assert_eq!(after.latest_version, Some(1));
}

#[tokio::test]
async fn duplicate_project_names_are_rejected() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");

    let name = format!("dup-{}", Uuid::new_v4());
    projects::create_project(&ctx.pool, &name)
        .await
        .expect("create failed");

    let err = projects::create_project(&ctx.pool, &name)
        .await
        .expect_err("duplicate name should fail");
    assert!(matches!(err, tarmac_state::Error::NameTaken(_)));
}
