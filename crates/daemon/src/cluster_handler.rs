// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster bundle handler.
//!
//! The external façade for cluster bundles: creation drives the
//! coordinator against every enumerated node; the read-side operations fan
//! out across master peers through the proxy client and collapse the typed
//! replies into one HTTP status.
//!
//! Cluster bundle state lives in the same store the node-local surface
//! serves, so cross-master queries go through the node-local API of each
//! peer and never recurse through the cluster surface.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use dx_cluster::{Coordinator, Node, NodeUrlBuilder, ProxyClient, ProxyError};
use dx_core::{Bundle, BundleStatus, BundleType, Clock, SystemClock};
use dx_store::BundleStore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::discovery::{Discovery, NodeInfo};
use crate::error::ApiError;

/// Which sides of the cluster a creation fans out to.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    pub masters: bool,
    pub agents: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self { masters: true, agents: true }
    }
}

/// Serves the cluster surface of one master.
pub struct ClusterHandler<C: Clock = SystemClock> {
    store: Arc<BundleStore>,
    discovery: Arc<dyn Discovery>,
    url_builder: Arc<dyn NodeUrlBuilder>,
    proxy: Arc<dyn ProxyClient>,
    poll_interval: Duration,
    bundle_timeout: Duration,
    clock: C,
}

impl ClusterHandler<SystemClock> {
    pub fn new(
        store: Arc<BundleStore>,
        discovery: Arc<dyn Discovery>,
        url_builder: Arc<dyn NodeUrlBuilder>,
        proxy: Arc<dyn ProxyClient>,
        poll_interval: Duration,
        bundle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            discovery,
            url_builder,
            proxy,
            poll_interval,
            bundle_timeout,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> ClusterHandler<C> {
    /// Start a cluster bundle and return its `Started` snapshot.
    ///
    /// Node enumeration failures are terminal: the bundle is persisted as
    /// `Failed` and the error is returned. Otherwise collection runs
    /// asynchronously and lands the merged archive in this bundle's store
    /// entry when every node is accounted for.
    pub async fn create(&self, id: &str, options: CreateOptions) -> Result<Bundle, ApiError> {
        if self.store.exists(id) {
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                format!("bundle {id} already exists"),
            ));
        }
        self.store.create(id)?;
        drop(self.store.create_archive(id)?);

        let started_at = self.clock.now_utc();
        let initial = Bundle::started(id, BundleType::Cluster, started_at);
        self.store.write_state(&initial)?;

        let mut infos: Vec<NodeInfo> = Vec::new();
        if options.masters {
            match self.discovery.masters().await {
                Ok(masters) => infos.extend(masters),
                Err(e) => return Err(self.fail_creation(id, started_at, "master", &e.to_string())),
            }
        }
        if options.agents {
            match self.discovery.agents().await {
                Ok(agents) => infos.extend(agents),
                Err(e) => return Err(self.fail_creation(id, started_at, "agent", &e.to_string())),
            }
        }
        let nodes = self.resolve(infos);
        tracing::info!(bundle = %id, nodes = nodes.len(), "starting cluster bundle");

        // The per-node local bundles get their own id, distinct from the
        // cluster bundle's.
        let local_id = Uuid::new_v4().to_string();
        let coordinator = Coordinator::new(
            Arc::clone(&self.proxy),
            self.poll_interval,
            self.store.bundle_dir(id),
        );

        let store = Arc::clone(&self.store);
        let clock = self.clock.clone();
        let id = id.to_string();
        let timeout = self.bundle_timeout;
        tokio::spawn(async move {
            run_collection(store, clock, coordinator, nodes, id, local_id, timeout, started_at)
                .await;
        });

        Ok(initial)
    }

    /// Persist the `Failed` terminal state and produce the creation error.
    fn fail_creation(
        &self,
        id: &str,
        started_at: DateTime<Utc>,
        side: &str,
        msg: &str,
    ) -> ApiError {
        let bundle = Bundle {
            id: id.to_string(),
            kind: BundleType::Cluster,
            size: 0,
            status: BundleStatus::Failed,
            started_at: Some(started_at),
            stopped_at: Some(self.clock.now_utc()),
            errors: vec![msg.to_string()],
        };
        if let Err(e) = self.store.write_state(&bundle) {
            tracing::error!(bundle = %id, error = %e, "failed to persist Failed state");
        }
        ApiError::internal(format!("error getting {side} nodes for bundle {id}: {msg}"))
    }

    /// Query each master in turn; the first good reply wins.
    pub async fn status(&self, id: &str) -> Result<Bundle, ApiError> {
        let mut unreadable: Option<String> = None;
        for base_url in self.master_urls().await? {
            match self.proxy.status(&base_url, id).await {
                Ok(bundle) => return Ok(bundle),
                Err(ProxyError::NotFound) => {}
                Err(ProxyError::Unreadable(msg)) => unreadable = Some(msg),
                Err(e) => {
                    tracing::warn!(master = %base_url, bundle = %id, error = %e, "status query failed");
                }
            }
        }
        match unreadable {
            Some(msg) => {
                Err(ApiError::internal(format!("bundle {id} state is unreadable: {msg}")))
            }
            None => Err(ApiError::not_found(format!("bundle {id} not found"))),
        }
    }

    /// Broadcast the delete to every master and collapse the outcomes.
    pub async fn delete(&self, id: &str) -> Result<Bundle, ApiError> {
        let mut deleted: Option<Bundle> = None;
        let mut not_completed = false;
        let mut unreadable: Option<String> = None;
        for base_url in self.master_urls().await? {
            match self.proxy.delete(&base_url, id).await {
                Ok(bundle) => deleted = deleted.or(Some(bundle)),
                Err(ProxyError::NotFound) => {}
                Err(ProxyError::NotCompleted) => not_completed = true,
                Err(ProxyError::Unreadable(msg)) => unreadable = Some(msg),
                Err(e) => unreadable = Some(e.to_string()),
            }
        }
        if not_completed {
            return Err(ApiError::new(
                StatusCode::NOT_MODIFIED,
                format!("bundle {id} is not completed"),
            ));
        }
        if let Some(msg) = unreadable {
            return Err(ApiError::internal(format!("could not delete bundle {id}: {msg}")));
        }
        match deleted {
            Some(bundle) => Ok(bundle),
            None => Err(ApiError::not_found(format!("bundle {id} not found"))),
        }
    }

    /// Union of every master's bundle list.
    pub async fn list(&self) -> Result<Vec<Bundle>, ApiError> {
        let mut bundles = Vec::new();
        for base_url in self.master_urls().await? {
            let listed = self.proxy.list(&base_url).await.map_err(|e| {
                ApiError::internal(format!("could not list bundles on {base_url}: {e}"))
            })?;
            bundles.extend(listed);
        }
        Ok(bundles)
    }

    /// Fetch the archive from the first master whose status reply is good.
    pub async fn download(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        for base_url in self.master_urls().await? {
            match self.proxy.status(&base_url, id).await {
                Ok(_) => return self.fetch(&base_url, id).await,
                Err(e) => {
                    tracing::debug!(master = %base_url, bundle = %id, error = %e, "master does not serve this bundle");
                }
            }
        }
        Err(ApiError::not_found(format!("bundle {id} not found on any master")))
    }

    async fn fetch(&self, base_url: &str, id: &str) -> Result<Vec<u8>, ApiError> {
        let tmp = std::env::temp_dir().join(format!("dx-download-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&tmp)
            .await
            .map_err(|e| ApiError::internal(format!("could not create staging dir: {e}")))?;
        let dest = tmp.join(format!("{id}.zip"));

        let outcome = match self.proxy.get_file(base_url, id, &dest).await {
            Ok(()) => tokio::fs::read(&dest)
                .await
                .map_err(|e| ApiError::internal(format!("could not read downloaded archive: {e}"))),
            Err(ProxyError::NotFound) => {
                Err(ApiError::not_found(format!("bundle {id} has no downloadable archive")))
            }
            Err(e) => Err(ApiError::internal(format!("could not download bundle {id}: {e}"))),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&tmp).await {
            tracing::warn!(path = %tmp.display(), error = %e, "could not remove staging dir");
        }
        outcome
    }

    fn resolve(&self, infos: Vec<NodeInfo>) -> Vec<Node> {
        let mut nodes = Vec::new();
        for info in infos {
            match self.url_builder.base_url(&info.ip, info.role) {
                Ok(base_url) => nodes.push(Node::new(info.ip, info.role, base_url)),
                Err(e) => {
                    tracing::warn!(node = %info.ip, error = %e, "skipping node without a usable URL");
                }
            }
        }
        nodes
    }

    async fn master_urls(&self) -> Result<Vec<String>, ApiError> {
        let masters = self
            .discovery
            .masters()
            .await
            .map_err(|e| ApiError::internal(format!("error getting master nodes: {e}")))?;
        Ok(self.resolve(masters).into_iter().map(|n| n.base_url).collect())
    }
}

/// Drive the coordinator to completion and persist the terminal state.
#[allow(clippy::too_many_arguments)]
async fn run_collection<C: Clock>(
    store: Arc<BundleStore>,
    clock: C,
    coordinator: Coordinator<dyn ProxyClient>,
    nodes: Vec<Node>,
    id: String,
    local_id: String,
    timeout: Duration,
    started_at: DateTime<Utc>,
) {
    let statuses = coordinator.create_bundle(&local_id, &nodes).await;

    let ctx = CancellationToken::new();
    let deadline = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            ctx.cancel();
        })
    };
    let (merged, report) = coordinator.collect_bundle(&ctx, &local_id, &nodes, statuses).await;
    deadline.abort();

    let mut errors = report.errors();
    let mut status = BundleStatus::Done;
    let archive = store.archive_path(&id);
    if let Err(e) = tokio::fs::copy(&merged, &archive).await {
        tracing::error!(bundle = %id, error = %e, "could not copy merged archive");
        errors.push(format!("could not copy merged archive: {e}"));
        status = BundleStatus::Failed;
    }

    // Intermediate downloads and the merged archive are no longer needed.
    let _ = tokio::fs::remove_file(&merged).await;
    for node in &nodes {
        let staged = store.bundle_dir(&id).join(format!("{}.zip", node.key()));
        let _ = tokio::fs::remove_file(staged).await;
    }

    let size = tokio::fs::metadata(&archive).await.map(|m| m.len()).unwrap_or(0);
    let bundle = Bundle {
        id: id.clone(),
        kind: BundleType::Cluster,
        size,
        status,
        started_at: Some(started_at),
        stopped_at: Some(clock.now_utc()),
        errors,
    };
    if let Err(e) = store.write_state(&bundle) {
        tracing::error!(bundle = %id, error = %e, "failed to write terminal state");
    }
    tracing::info!(bundle = %id, status = %bundle.status, size, "cluster bundle finished");
}

#[cfg(test)]
#[path = "cluster_handler_tests.rs"]
mod tests;
