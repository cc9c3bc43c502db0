// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deploy payloads and version snapshots.
//!
//! A deploy uploads the full desired state of a project in one request. The
//! platform records it as an immutable version and answers with a snapshot in
//! which every piece of uploaded content is replaced by its SHA-256 digest.
//! Raw bytes never travel back out through the API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Module kind of an uploaded blob.
///
/// The first blob of a version is the entrypoint and must be an ES module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    /// ES module (JavaScript).
    Esmodule,
    /// WebAssembly module.
    Wasm,
    /// JSON module.
    Json,
    /// Plain text module.
    Text,
    /// Opaque binary module.
    Data,
}

impl BlobKind {
    /// Lowercase tag, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            BlobKind::Esmodule => "esmodule",
            BlobKind::Wasm => "wasm",
            BlobKind::Json => "json",
            BlobKind::Text => "text",
            BlobKind::Data => "data",
        }
    }

    /// Parse a lowercase tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "esmodule" => Some(BlobKind::Esmodule),
            "wasm" => Some(BlobKind::Wasm),
            "json" => Some(BlobKind::Json),
            "text" => Some(BlobKind::Text),
            "data" => Some(BlobKind::Data),
            _ => None,
        }
    }
}

/// A code blob as uploaded: filename, module kind, base64 content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlobUpload {
    /// Module filename as referenced by the runtime (e.g. `index.js`).
    pub filename: String,
    /// Module kind.
    #[serde(rename = "type")]
    pub kind: BlobKind,
    /// Base64-encoded content.
    pub data: String,
}

/// A blob in a version snapshot: identity only, no content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobDigest {
    /// Module filename.
    pub filename: String,
    /// Module kind.
    #[serde(rename = "type")]
    pub kind: BlobKind,
    /// Lowercase hex SHA-256 of the decoded content.
    pub digest: String,
}

/// Hostname plus base paths under which a version serves traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Route {
    /// Hostname to match, without port.
    pub host: String,
    /// Base paths under the host. `/` matches everything.
    pub base_paths: Vec<String>,
}

/// Named UTF-8 string exposed to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextBinding {
    /// Binding name as seen by worker code.
    pub name: String,
    /// Bound value.
    pub value: String,
}

/// Named JSON document exposed to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JsonBinding {
    /// Binding name as seen by worker code.
    pub name: String,
    /// Bound value.
    pub value: serde_json::Value,
}

/// Named binary payload as uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataBindingUpload {
    /// Binding name as seen by worker code.
    pub name: String,
    /// Base64-encoded payload.
    pub base64: String,
}

/// Named binary payload in a snapshot: digest only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBindingDigest {
    /// Binding name.
    pub name: String,
    /// Lowercase hex SHA-256 of the decoded payload.
    pub digest: String,
}

/// Binding resolved from a node-side environment variable at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvironmentBinding {
    /// Binding name as seen by worker code.
    pub name: String,
    /// Environment variable read on the node at config generation time.
    pub env_var: String,
}

/// Reference to a KV database by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KvBindingRef {
    /// Binding name as seen by worker code.
    pub name: String,
    /// Target database. Must exist at deploy time.
    pub kv_database_id: Uuid,
}

/// Reference to a queue by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueueBindingRef {
    /// Binding name as seen by worker code.
    pub name: String,
    /// Target queue. Must exist at deploy time.
    pub queue_id: Uuid,
}

/// A static site file as uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteFileUpload {
    /// Path within the site, e.g. `index.html`.
    pub path: String,
    /// Base64-encoded content.
    pub base64: String,
}

/// A named static site with its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteUpload {
    /// Site name as seen by worker code.
    pub name: String,
    /// Files in the site.
    pub files: Vec<SiteFileUpload>,
}

/// A site file in a snapshot: digest only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFileDigest {
    /// Path within the site.
    pub path: String,
    /// Lowercase hex SHA-256 of the decoded content.
    pub digest: String,
}

/// A site in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDigest {
    /// Site name.
    pub name: String,
    /// Files, digests only.
    pub files: Vec<SiteFileDigest>,
}

/// A scheduled job: unique name plus cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CronJob {
    /// Job name, unique within the project.
    pub name: String,
    /// Cron expression (five-field, standard syntax).
    pub cron: String,
}

/// Full desired state of a project, uploaded in one request.
///
/// `blobs` and `routes` are required; every other list defaults to empty.
/// Unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployRequest {
    /// Code blobs. The first entry is the entrypoint.
    pub blobs: Vec<BlobUpload>,
    /// Hostnames and base paths this version serves.
    pub routes: Vec<Route>,
    /// Text bindings.
    #[serde(default)]
    pub text_bindings: Vec<TextBinding>,
    /// JSON bindings.
    #[serde(default)]
    pub json_bindings: Vec<JsonBinding>,
    /// Binary data bindings.
    #[serde(default)]
    pub data_bindings: Vec<DataBindingUpload>,
    /// Environment-variable bindings.
    #[serde(default)]
    pub environment_bindings: Vec<EnvironmentBinding>,
    /// KV database bindings.
    #[serde(default)]
    pub kv_bindings: Vec<KvBindingRef>,
    /// Queue bindings.
    #[serde(default)]
    pub queue_bindings: Vec<QueueBindingRef>,
    /// Static sites.
    #[serde(default)]
    pub sites: Vec<SiteUpload>,
    /// Scheduled jobs. Diffed against the project's existing jobs.
    #[serde(default)]
    pub cron_jobs: Vec<CronJob>,
}

/// An immutable version as answered by the API.
///
/// Mirrors the deploy payload with content replaced by digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    /// Version row id.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Sequential version number, 1-based and gapless per project.
    pub version: i32,
    /// Commit time, epoch milliseconds.
    pub deployed_at: i64,
    /// Blobs, digests only, in upload order.
    pub blobs: Vec<BlobDigest>,
    /// Routes.
    pub routes: Vec<Route>,
    /// Text bindings.
    pub text_bindings: Vec<TextBinding>,
    /// JSON bindings.
    pub json_bindings: Vec<JsonBinding>,
    /// Binary data bindings, digests only.
    pub data_bindings: Vec<DataBindingDigest>,
    /// Environment-variable bindings.
    pub environment_bindings: Vec<EnvironmentBinding>,
    /// KV database bindings.
    pub kv_bindings: Vec<KvBindingRef>,
    /// Queue bindings.
    pub queue_bindings: Vec<QueueBindingRef>,
    /// Static sites, digests only.
    pub sites: Vec<SiteDigest>,
    /// Scheduled jobs carried by this deploy.
    pub cron_jobs: Vec<CronJob>,
}

/// One row of a version listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    /// Version row id.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Sequential version number.
    pub version: i32,
    /// Commit time, epoch milliseconds.
    pub deployed_at: i64,
}

/// Body of a scheduled-job dispatch to the worker runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    /// Job name.
    pub name: String,
    /// Cron expression that fired.
    pub cron: String,
}
