// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Leader-gated dispatch of scheduled events to the worker runtime.
//!
//! The loop wakes several times a minute, matches every enabled cron
//! expression against the current UTC minute and posts one scheduled event
//! per due job to the engine socket, addressed by the host the owning
//! project serves. A fired-minute map keeps a job from firing twice within
//! the same minute even though the loop ticks faster than the schedule
//! granularity.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use croner::Cron;
use http_body_util::Full;
use hyper::{Method, Request, header};
use sqlx::PgPool;
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tarmac_state::cron::{self, DispatchableCronJob};
use tarmac_types::deploy::ScheduledJob;

/// Path the runtime's entrypoint answers scheduled events on.
const SCHEDULED_PATH: &str = "/__tarmac/scheduled";

/// Tick period. Well under a minute so no due minute falls between ticks.
const TICK_INTERVAL: Duration = Duration::from_secs(20);

/// Scheduled-event dispatch loop of one worker.
///
/// Every worker runs one, but only the current node leader dispatches, so
/// a job fires once per node and minute rather than once per worker.
pub struct CronDispatcher {
    pool: PgPool,
    engine_socket: PathBuf,
    leadership: watch::Receiver<bool>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
    fired: HashMap<(Uuid, String), DateTime<Utc>>,
}

impl CronDispatcher {
    /// A dispatch loop gated on the given leadership watch.
    pub fn new(pool: PgPool, engine_socket: PathBuf, leadership: watch::Receiver<bool>) -> Self {
        Self {
            pool,
            engine_socket,
            leadership,
            tick_interval: TICK_INTERVAL,
            shutdown: Arc::new(Notify::new()),
            fired: HashMap::new(),
        }
    }

    /// Override the tick period.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Handle that stops [`CronDispatcher::run`].
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Run until shut down.
    pub async fn run(mut self) {
        info!("Scheduled dispatch loop started");
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Scheduled dispatch loop shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.tick_interval) => {
                    if !*self.leadership.borrow() {
                        continue;
                    }
                    if let Err(err) = self.dispatch_due().await {
                        error!(error = %err, "Scheduled dispatch failed");
                    }
                }
            }
        }
    }

    /// Fire every enabled job whose expression matches the current minute.
    async fn dispatch_due(&mut self) -> anyhow::Result<()> {
        let minute = Utc::now()
            .duration_trunc(TimeDelta::minutes(1))
            .context("clock out of range")?;
        let jobs = cron::list_dispatchable(&self.pool).await?;

        // Jobs disabled or deleted since the last tick keep no history.
        self.fired
            .retain(|key, _| jobs.iter().any(|j| j.project_id == key.0 && j.name == key.1));

        for job in jobs {
            if !self.job_due(&job, minute) {
                continue;
            }
            let Some(host) = job.host.clone() else {
                debug!(
                    project_id = %job.project_id,
                    job = %job.name,
                    "Job's project has no routed version; skipping"
                );
                continue;
            };
            // Marked fired before sending: a delivery failure is logged,
            // never retried within the minute.
            self.fired.insert((job.project_id, job.name.clone()), minute);
            match self.send_scheduled(&host, &job).await {
                Ok(()) => info!(
                    project_id = %job.project_id,
                    job = %job.name,
                    host = %host,
                    "Dispatched scheduled event"
                ),
                Err(err) => warn!(
                    error = %err,
                    project_id = %job.project_id,
                    job = %job.name,
                    "Scheduled event delivery failed"
                ),
            }
        }
        Ok(())
    }

    /// Whether the job matches this minute and has not fired for it yet.
    fn job_due(&self, job: &DispatchableCronJob, minute: DateTime<Utc>) -> bool {
        if self.fired.get(&(job.project_id, job.name.clone())) == Some(&minute) {
            return false;
        }
        match schedule_matches(&job.cron, minute) {
            Ok(due) => due,
            Err(err) => {
                warn!(
                    project_id = %job.project_id,
                    job = %job.name,
                    error = %err,
                    "Unparseable stored cron expression"
                );
                false
            }
        }
    }

    /// Post one scheduled event to the engine socket, addressed by host.
    async fn send_scheduled(&self, host: &str, job: &DispatchableCronJob) -> anyhow::Result<()> {
        let event = ScheduledJob {
            name: job.name.clone(),
            cron: job.cron.clone(),
        };
        let body = serde_json::to_vec(&event)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(SCHEDULED_PATH)
            .header(header::HOST, host)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;

        let response = tarmac_proxy::send_over_unix(&self.engine_socket, request).await?;
        if !response.status().is_success() {
            anyhow::bail!("runtime answered {}", response.status());
        }
        Ok(())
    }
}

/// Whether a five-field expression matches the given minute.
pub(crate) fn schedule_matches(
    expression: &str,
    minute: DateTime<Utc>,
) -> Result<bool, croner::errors::CronError> {
    let cron = Cron::new(expression).parse()?;
    cron.is_time_matching(&minute)
}
