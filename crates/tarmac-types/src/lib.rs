// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tarmac wire types - request and response shapes shared by every service
//!
//! This crate defines the JSON surface of the platform:
//! - Deploy payloads and immutable version snapshots (`deploy`)
//! - KV request/response shapes and the tagged result envelope (`kv`)
//! - Administrative resource shapes (`admin`)
//!
//! All shapes serialize with camelCase field names. The deploy payload is a
//! strict schema: unknown fields are rejected so a malformed upload fails
//! before any database write.

pub mod admin;
pub mod deploy;
pub mod kv;

pub use admin::{
    EngineInfo, KvDatabase, NewKvDatabase, NewProject, NewQueue, Project, Queue, QueueAck,
    QueueMessage, SECRET_HEADER, SESSION_HEADER,
};
pub use deploy::{
    BlobDigest, BlobKind, BlobUpload, CronJob, DataBindingDigest, DataBindingUpload, DeployRequest,
    EnvironmentBinding, JsonBinding, KvBindingRef, QueueBindingRef, Route, ScheduledJob,
    SiteDigest, SiteFileDigest, SiteFileUpload, SiteUpload, TextBinding, VersionSnapshot,
    VersionSummary,
};
pub use kv::{
    ApiResult, KvAck, KvDeleteRequest, KvKey, KvListQuery, KvListResult, KvPutRequest, KvValues,
};
