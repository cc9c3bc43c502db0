// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for scheduled-job diffing across deploys.

mod common;

use common::{TestContext, minimal_payload};
use tarmac_state::{cron, versions};
use tarmac_types::deploy::CronJob;

fn job(name: &str, cron: &str) -> CronJob {
    CronJob {
        name: name.into(),
        cron: cron.into(),
    }
}

#[tokio::test]
async fn new_jobs_are_inserted_enabled() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut payload = minimal_payload("cron-new.test");
    payload.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &payload)
        .await
        .expect("deploy failed");

    let jobs = cron::list_jobs(&ctx.pool, project_id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].enabled);
    assert_eq!(jobs[0].cron, "* * * * *");
}

#[tokio::test]
async fn dropped_jobs_are_disabled_not_deleted() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut with_job = minimal_payload("cron-drop.test");
    with_job.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &with_job)
        .await
        .expect("deploy failed");

    versions::create_version(&ctx.pool, project_id, &minimal_payload("cron-drop.test"))
        .await
        .expect("deploy failed");

    let jobs = cron::list_jobs(&ctx.pool, project_id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(!jobs[0].enabled);

    assert!(cron::list_enabled(&ctx.pool, project_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn reappearing_job_is_reenabled_with_history_preserved() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut with_job = minimal_payload("cron-revive.test");
    with_job.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &with_job)
        .await
        .expect("deploy failed");
    let created_at = cron::list_jobs(&ctx.pool, project_id).await.unwrap()[0].created_at;

    versions::create_version(&ctx.pool, project_id, &minimal_payload("cron-revive.test"))
        .await
        .expect("deploy failed");

    versions::create_version(&ctx.pool, project_id, &with_job)
        .await
        .expect("deploy failed");

    let jobs = cron::list_jobs(&ctx.pool, project_id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].enabled);
    assert_eq!(jobs[0].created_at, created_at);
}

#[tokio::test]
async fn changed_expression_is_updated_and_enabled() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut v1 = minimal_payload("cron-change.test");
    v1.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &v1)
        .await
        .expect("deploy failed");

    let mut v2 = minimal_payload("cron-change.test");
    v2.cron_jobs = vec![job("tick", "0 * * * *")];
    versions::create_version(&ctx.pool, project_id, &v2)
        .await
        .expect("deploy failed");

    let jobs = cron::list_jobs(&ctx.pool, project_id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].enabled);
    assert_eq!(jobs[0].cron, "0 * * * *");
}

#[tokio::test]
async fn mixed_deploy_touches_each_job_once() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut v1 = minimal_payload("cron-mixed.test");
    v1.cron_jobs = vec![
        job("keep", "* * * * *"),
        job("change", "* * * * *"),
        job("drop", "* * * * *"),
    ];
    versions::create_version(&ctx.pool, project_id, &v1)
        .await
        .expect("deploy failed");

    let mut v2 = minimal_payload("cron-mixed.test");
    v2.cron_jobs = vec![
        job("keep", "* * * * *"),
        job("change", "30 * * * *"),
        job("fresh", "0 0 * * *"),
    ];
    versions::create_version(&ctx.pool, project_id, &v2)
        .await
        .expect("deploy failed");

    let jobs = cron::list_jobs(&ctx.pool, project_id).await.unwrap();
    assert_eq!(jobs.len(), 4);

    let by_name = |name: &str| jobs.iter().find(|j| j.name == name).unwrap();
    assert!(by_name("keep").enabled);
    assert!(by_name("change").enabled);
    assert_eq!(by_name("change").cron, "30 * * * *");
    assert!(!by_name("drop").enabled);
    assert!(by_name("fresh").enabled);
}

#[tokio::test]
async fn dispatchable_host_follows_latest_version() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut v1 = minimal_payload("cron-host-old.test");
    v1.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &v1)
        .await
        .expect("deploy failed");

    let mut v2 = minimal_payload("cron-host-new.test");
    v2.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &v2)
        .await
        .expect("deploy failed");

    let dispatchable = cron::list_dispatchable(&ctx.pool).await.unwrap();
    let mine: Vec<_> = dispatchable
        .iter()
        .filter(|j| j.project_id == project_id)
        .collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].name, "tick");
    assert_eq!(mine[0].host.as_deref(), Some("cron-host-new.test"));
}

#[tokio::test]
async fn dispatchable_without_routes_has_no_host() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut payload = minimal_payload("unused.test");
    payload.routes = vec![];
    payload.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &payload)
        .await
        .expect("deploy failed");

    let dispatchable = cron::list_dispatchable(&ctx.pool).await.unwrap();
    let mine: Vec<_> = dispatchable
        .iter()
        .filter(|j| j.project_id == project_id)
        .collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].host, None);
}

#[tokio::test]
async fn disabled_jobs_are_not_dispatchable() {
    skip_if_no_db!();
    let ctx = TestContext::new().await.expect("test context");
    let project_id = ctx.create_project().await;

    let mut with_job = minimal_payload("cron-gone.test");
    with_job.cron_jobs = vec![job("tick", "* * * * *")];
    versions::create_version(&ctx.pool, project_id, &with_job)
        .await
        .expect("deploy failed");

    versions::create_version(&ctx.pool, project_id, &minimal_payload("cron-gone.test"))
        .await
        .expect("deploy failed");

    let dispatchable = cron::list_dispatchable(&ctx.pool).await.unwrap();
    assert!(!dispatchable.iter().any(|j| j.project_id == project_id));
}
