// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime config generation.
//!
//! The config is a deterministic function of committed store state plus the
//! worker's filesystem layout: same state, same bytes. The reconcile loop
//! compares the digest of the generated bytes against the previous pass and
//! skips the runtime restart when nothing changed, which makes coalesced or
//! spurious reload notifications cheap.
//!
//! Blob and site-file bytes are not inlined. They are materialized once into
//! a content-addressed store under the engine dir and referenced by path, so
//! a config rewrite never rewrites unchanged artifacts.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use tarmac_state::deployed::{self, DeployedProject};

use crate::error::Result;
use crate::paths::WorkerPaths;

/// Everything the runtime child needs to serve one worker's share of traffic.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Worker index within the node.
    pub worker_id: usize,
    /// Socket the runtime must bind.
    pub engine_socket: String,
    /// Socket the runtime calls for KV and queue bindings.
    pub admin_socket: String,
    /// Shared secret for internal-API calls back to the admin socket.
    pub secret: String,
    /// Host routing table across all projects.
    pub routes: Vec<RouteEntry>,
    /// Latest version of every deployed project.
    pub projects: Vec<ProjectEntry>,
}

/// One host route, pointing at the owning project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    /// Hostname to match.
    pub host: String,
    /// Base paths under the host.
    pub base_paths: Vec<String>,
    /// Project serving this route.
    pub project_id: Uuid,
}

/// One deployed project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    /// Project id.
    pub id: Uuid,
    /// Project name.
    pub name: String,
    /// Deployed version number.
    pub version: i32,
    /// Filename of the module the runtime loads first.
    pub entrypoint: String,
    /// All modules of the version, upload order preserved.
    pub modules: Vec<ModuleEntry>,
    /// Bindings exposed to the tenant code.
    pub bindings: Vec<BindingEntry>,
    /// Static sites of the version.
    pub sites: Vec<SiteEntry>,
}

/// One module, referencing its materialized content.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    /// Module filename.
    pub filename: String,
    /// Module kind.
    pub kind: String,
    /// Content-addressed file under the engine dir.
    pub file: String,
}

/// One binding. Text, JSON, data, and environment values are inline; KV and
/// queue bindings reference the internal API on the admin socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BindingEntry {
    /// Inline string value.
    Text {
        /// Binding name.
        name: String,
        /// Bound value.
        value: String,
    },
    /// Inline JSON value.
    Json {
        /// Binding name.
        name: String,
        /// Bound value.
        value: serde_json::Value,
    },
    /// Inline binary value, base64-encoded.
    Data {
        /// Binding name.
        name: String,
        /// Base64 payload.
        data: String,
    },
    /// Value resolved from the node's environment at generation time.
    Environment {
        /// Binding name.
        name: String,
        /// Resolved value; null when the variable is unset on this node.
        value: Option<String>,
    },
    /// KV database reachable through the internal API.
    Kv {
        /// Binding name.
        name: String,
        /// Database to scope requests to.
        #[serde(rename = "kvDatabaseId")]
        kv_database_id: Uuid,
        /// Admin socket serving the internal KV endpoints.
        socket: String,
    },
    /// Queue reachable through the internal API.
    Queue {
        /// Binding name.
        name: String,
        /// Queue to enqueue into.
        #[serde(rename = "queueId")]
        queue_id: Uuid,
        /// Admin socket serving the internal queue endpoints.
        socket: String,
    },
}

/// One static site.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    /// Site name.
    pub name: String,
    /// Files of the site.
    pub files: Vec<SiteFileEntry>,
}

/// One site file, referencing its materialized content.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFileEntry {
    /// Path within the site.
    pub path: String,
    /// Content-addressed file under the engine dir.
    pub file: String,
}

/// Outcome of one config generation pass.
#[derive(Debug, Clone)]
pub struct GeneratedConfig {
    /// Hex SHA-256 of the written config bytes.
    pub digest: String,
    /// Number of deployed projects in the config.
    pub projects: usize,
}

/// Build the config value for an already-loaded deployed state.
///
/// Pure apart from environment-binding resolution, which reads the node's
/// process environment. Input ordering carries through unchanged, so the
/// deterministic ordering of [`deployed::load_deployed_projects`] makes the
/// serialized bytes deterministic too.
pub fn build_config(
    projects: &[DeployedProject],
    paths: &WorkerPaths,
    secret: &str,
) -> RuntimeConfig {
    let admin_socket = paths.admin_socket().display().to_string();

    let mut routes = Vec::new();
    let mut entries = Vec::with_capacity(projects.len());
    for project in projects {
        for route in &project.routes {
            routes.push(RouteEntry {
                host: route.host.clone(),
                base_paths: route.base_paths.clone(),
                project_id: project.project_id,
            });
        }

        let entrypoint = project
            .blobs
            .first()
            .map(|blob| blob.filename.clone())
            .unwrap_or_default();
        let modules = project
            .blobs
            .iter()
            .map(|blob| ModuleEntry {
                filename: blob.filename.clone(),
                kind: blob.kind.clone(),
                file: paths.blob_path(&blob.digest).display().to_string(),
            })
            .collect();

        let mut bindings = Vec::new();
        for binding in &project.text_bindings {
            bindings.push(BindingEntry::Text {
                name: binding.name.clone(),
                value: binding.value.clone(),
            });
        }
        for binding in &project.json_bindings {
            bindings.push(BindingEntry::Json {
                name: binding.name.clone(),
                value: binding.value.clone(),
            });
        }
        for binding in &project.data_bindings {
            bindings.push(BindingEntry::Data {
                name: binding.name.clone(),
                data: BASE64.encode(&binding.data),
            });
        }
        for binding in &project.env_bindings {
            let value = std::env::var(&binding.env_var).ok();
            if value.is_none() {
                warn!(
                    project = %project.project_name,
                    binding = %binding.name,
                    env_var = %binding.env_var,
                    "Environment binding has no value on this node"
                );
            }
            bindings.push(BindingEntry::Environment {
                name: binding.name.clone(),
                value,
            });
        }
        for binding in &project.kv_bindings {
            bindings.push(BindingEntry::Kv {
                name: binding.name.clone(),
                kv_database_id: binding.kv_database_id,
                socket: admin_socket.clone(),
            });
        }
        for binding in &project.queue_bindings {
            bindings.push(BindingEntry::Queue {
                name: binding.name.clone(),
                queue_id: binding.queue_id,
                socket: admin_socket.clone(),
            });
        }

        let sites = project
            .sites
            .iter()
            .map(|site| SiteEntry {
                name: site.name.clone(),
                files: site
                    .files
                    .iter()
                    .map(|file| SiteFileEntry {
                        path: file.path.clone(),
                        file: paths.blob_path(&file.digest).display().to_string(),
                    })
                    .collect(),
            })
            .collect();

        entries.push(ProjectEntry {
            id: project.project_id,
            name: project.project_name.clone(),
            version: project.version,
            entrypoint,
            modules,
            bindings,
            sites,
        });
    }

    RuntimeConfig {
        worker_id: paths.worker_id(),
        engine_socket: paths.engine_socket().display().to_string(),
        admin_socket,
        secret: secret.to_string(),
        routes,
        projects: entries,
    }
}

/// Load the deployed state and write the config plus its artifacts.
pub async fn write_runtime_config(
    pool: &PgPool,
    paths: &WorkerPaths,
    secret: &str,
) -> Result<GeneratedConfig> {
    let projects = deployed::load_deployed_projects(pool).await?;
    write_config_files(&projects, paths, secret).await
}

/// Materialize artifacts and write the config for an already-loaded state.
pub async fn write_config_files(
    projects: &[DeployedProject],
    paths: &WorkerPaths,
    secret: &str,
) -> Result<GeneratedConfig> {
    paths.ensure().await?;
    for project in projects {
        for blob in &project.blobs {
            materialize(paths, &blob.digest, &blob.data).await?;
        }
        for site in &project.sites {
            for file in &site.files {
                materialize(paths, &file.digest, &file.data).await?;
            }
        }
    }

    let config = build_config(projects, paths, secret);
    let bytes = serde_json::to_vec_pretty(&config)?;
    tokio::fs::write(paths.config_path(), &bytes).await?;

    Ok(GeneratedConfig {
        digest: digest_hex(&bytes),
        projects: projects.len(),
    })
}

/// Write one artifact unless it already exists. An existing file under a
/// digest name already holds these bytes.
async fn materialize(paths: &WorkerPaths, digest: &str, data: &[u8]) -> Result<()> {
    let target = paths.blob_path(digest);
    match tokio::fs::metadata(&target).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::write(&target, data).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarmac_state::deployed::DeployedSite;
    use tarmac_state::records::{
        DataBindingContent, EnvBindingRecord, KvBindingRecord, RouteRecord, SiteFileContent,
        TextBindingRecord, VersionBlobContent,
    };

    fn fixture_project() -> DeployedProject {
        let data = b"export default {}".to_vec();
        let digest = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(&data))
        };
        DeployedProject {
            project_id: Uuid::from_u128(1),
            project_name: "blog".to_string(),
            version_id: Uuid::from_u128(2),
            version: 3,
            blobs: vec![VersionBlobContent {
                filename: "index.js".to_string(),
                kind: "esmodule".to_string(),
                digest,
                data,
                blob_order: 0,
            }],
            routes: vec![RouteRecord {
                host: "blog.example.com".to_string(),
                base_paths: vec!["/".to_string()],
            }],
            text_bindings: vec![TextBindingRecord {
                name: "GREETING".to_string(),
                value: "hello".to_string(),
            }],
            json_bindings: vec![],
            data_bindings: vec![DataBindingContent {
                name: "SEED".to_string(),
                data: vec![1, 2, 3],
            }],
            env_bindings: vec![],
            kv_bindings: vec![KvBindingRecord {
                name: "CACHE".to_string(),
                kv_database_id: Uuid::from_u128(9),
            }],
            queue_bindings: vec![],
            sites: vec![DeployedSite {
                name: "assets".to_string(),
                files: vec![SiteFileContent {
                    path: "/logo.svg".to_string(),
                    digest: "feed".to_string(),
                    data: b"<svg/>".to_vec(),
                }],
            }],
        }
    }

    #[test]
    fn same_state_serializes_to_identical_bytes() {
        let paths = WorkerPaths::new("/data", 0);
        let projects = vec![fixture_project()];
        let a = serde_json::to_vec(&build_config(&projects, &paths, "s")).unwrap();
        let b = serde_json::to_vec(&build_config(&projects, &paths, "s")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bindings_carry_their_type_tag() {
        let paths = WorkerPaths::new("/data", 0);
        let projects = vec![fixture_project()];
        let value = serde_json::to_value(build_config(&projects, &paths, "s")).unwrap();
        let bindings = value["projects"][0]["bindings"].as_array().unwrap();
        let tags: Vec<&str> = bindings
            .iter()
            .map(|b| b["type"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["text", "data", "kv"]);
        assert_eq!(bindings[1]["data"], "AQID");
        assert_eq!(
            bindings[2]["kvDatabaseId"],
            Uuid::from_u128(9).to_string()
        );
        assert_eq!(bindings[2]["socket"], "/data/0/admin/admin.sock");
    }

    #[test]
    fn routes_flatten_across_projects() {
        let paths = WorkerPaths::new("/data", 0);
        let mut second = fixture_project();
        second.project_id = Uuid::from_u128(5);
        second.routes = vec![RouteRecord {
            host: "shop.example.com".to_string(),
            base_paths: vec!["/".to_string(), "/api".to_string()],
        }];
        let projects = vec![fixture_project(), second];
        let config = build_config(&projects, &paths, "s");
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].host, "blog.example.com");
        assert_eq!(config.routes[1].host, "shop.example.com");
        assert_eq!(config.routes[1].project_id, Uuid::from_u128(5));
    }

    #[test]
    fn entrypoint_is_the_first_blob() {
        let paths = WorkerPaths::new("/data", 0);
        let config = build_config(&[fixture_project()], &paths, "s");
        assert_eq!(config.projects[0].entrypoint, "index.js");
        assert_eq!(config.projects[0].modules[0].kind, "esmodule");
    }

    #[test]
    fn environment_bindings_resolve_from_the_process() {
        let paths = WorkerPaths::new("/data", 0);
        let mut project = fixture_project();
        project.env_bindings = vec![
            EnvBindingRecord {
                name: "PATH_COPY".to_string(),
                env_var: "PATH".to_string(),
            },
            EnvBindingRecord {
                name: "MISSING".to_string(),
                env_var: "TARMAC_TEST_UNSET_VARIABLE".to_string(),
            },
        ];
        let config = build_config(&[project], &paths, "s");
        let env: Vec<_> = config.projects[0]
            .bindings
            .iter()
            .filter_map(|b| match b {
                BindingEntry::Environment { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(env.len(), 2);
        assert_eq!(env[0].0, "PATH_COPY");
        assert!(env[0].1.is_some());
        assert_eq!(env[1], ("MISSING".to_string(), None));
    }

    #[tokio::test]
    async fn write_pass_is_stable_and_materializes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = WorkerPaths::new(dir.path(), 0);
        let projects = vec![fixture_project()];

        let first = write_config_files(&projects, &paths, "s").await.unwrap();
        let second = write_config_files(&projects, &paths, "s").await.unwrap();
        assert_eq!(first.digest, second.digest);
        assert_eq!(first.projects, 1);

        assert!(paths.config_path().is_file());
        assert!(paths.blob_path(&projects[0].blobs[0].digest).is_file());
        assert!(paths.blob_path("feed").is_file());

        let mut changed = projects.clone();
        changed[0].blobs[0].filename = "main.js".to_string();
        let third = write_config_files(&changed, &paths, "s").await.unwrap();
        assert_ne!(first.digest, third.digest);
    }
}
