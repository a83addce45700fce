// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-pool coordinator for cluster bundles.
//!
//! A fixed pool of workers consumes job futures from a shared queue. Poll
//! jobs reschedule themselves through a timer task instead of sleeping on a
//! worker. Shutdown is signaled by a separate quit token that workers
//! select on; the job queue itself is never closed, so an in-flight job can
//! always enqueue its successor without racing a closed channel.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dx_core::BundleStatus;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::merge;
use crate::node::Node;
use crate::proxy::{ProxyClient, ProxyError};
use crate::report::BundleReport;

/// Fixed number of coordinator workers.
pub const WORKER_POOL_SIZE: usize = 10;

/// One observation of a node's bundle, emitted on the status channel.
///
/// Each node produces any number of `done: false` events followed by
/// exactly one with `done: true`.
#[derive(Debug, Clone)]
pub struct BundleStatusEvent {
    pub id: String,
    pub node: Node,
    pub done: bool,
    pub err: Option<String>,
}

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Coordinates one cluster bundle across many nodes.
///
/// Construct one coordinator per cluster bundle; collection cancels the
/// pool on every exit path, after which the coordinator is spent.
pub struct Coordinator<P: ?Sized> {
    proxy: Arc<P>,
    interval: Duration,
    workdir: PathBuf,
    job_tx: mpsc::Sender<Job>,
    quit: CancellationToken,
}

impl<P: ProxyClient + ?Sized + 'static> Coordinator<P> {
    /// Spawn the worker pool. `interval` paces status polling; downloads
    /// and the merged archive land under `workdir`.
    pub fn new(proxy: Arc<P>, interval: Duration, workdir: impl Into<PathBuf>) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>(1);
        let quit = CancellationToken::new();
        let job_rx = Arc::new(Mutex::new(job_rx));
        for index in 0..WORKER_POOL_SIZE {
            tokio::spawn(worker_loop(index, Arc::clone(&job_rx), quit.clone()));
        }
        Self { proxy, interval, workdir: workdir.into(), job_tx, quit }
    }

    /// Signal used to stop the pool; exposed so callers can bound
    /// collection with their own context.
    pub fn quit_token(&self) -> &CancellationToken {
        &self.quit
    }

    /// Fan the creation of local bundle `id` out to `nodes`.
    ///
    /// Returns the status channel: multiple events per node, terminated per
    /// node by exactly one `done` event. The channel is deliberately small;
    /// the caller must keep draining while the bundle is in progress.
    pub async fn create_bundle(
        &self,
        id: &str,
        nodes: &[Node],
    ) -> mpsc::Receiver<BundleStatusEvent> {
        let (status_tx, status_rx) = mpsc::channel(1);
        let ctx = Arc::new(PollCtx {
            proxy: Arc::clone(&self.proxy),
            job_tx: self.job_tx.clone(),
            quit: self.quit.clone(),
            interval: self.interval,
            status_tx,
            id: id.to_string(),
        });
        for node in nodes {
            let job = ctx.creation_job(node.clone());
            self.enqueue(job).await;
        }
        status_rx
    }

    async fn enqueue(&self, job: Job) {
        tokio::select! {
            _ = self.quit.cancelled() => {}
            _ = self.job_tx.send(job) => {}
        }
    }

    /// Drain `statuses` until every node is finished (or `ctx` cancels),
    /// downloading each finished node's archive, then merge.
    ///
    /// Returns the merged archive path and the per-node report. The path is
    /// best-effort: merge failures are recorded in the report or logged,
    /// never propagated.
    pub async fn collect_bundle(
        &self,
        ctx: &CancellationToken,
        id: &str,
        nodes: &[Node],
        mut statuses: mpsc::Receiver<BundleStatusEvent>,
    ) -> (PathBuf, BundleReport) {
        let mut report = BundleReport::new(id);
        let mut downloaded: Vec<(String, PathBuf)> = Vec::new();
        let mut pending: BTreeMap<String, Node> =
            nodes.iter().map(|n| (n.key(), n.clone())).collect();

        while !pending.is_empty() {
            let event = tokio::select! {
                _ = ctx.cancelled() => break,
                event = statuses.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if !event.done {
                if let Some(err) = &event.err {
                    tracing::debug!(node = %event.node.ip, error = %err, "node bundle not ready");
                }
                continue;
            }
            let key = event.node.key();
            if pending.remove(&key).is_none() {
                continue;
            }
            match event.err {
                Some(err) => report.fail(key, err),
                None => match self.download(id, &event.node).await {
                    Ok(path) => {
                        report.succeed(key.clone());
                        downloaded.push((key, path));
                    }
                    Err(e) => report.fail(key, format!("could not download bundle: {e}")),
                },
            }
        }

        for key in pending.into_keys() {
            report.fail(key, "context canceled before all node bundles finished");
        }

        // Every exit path stops the pool before merging.
        self.quit.cancel();

        // Merge in node enumeration order, not download completion order.
        downloaded.sort_by_key(|(key, _)| nodes.iter().position(|n| n.key() == *key));

        let out = self.workdir.join(format!("bundle-{id}.zip"));
        let fallback = report.clone();
        let merge_out = out.clone();
        let report = match tokio::task::spawn_blocking(move || {
            merge::merge_archives(&merge_out, downloaded, report)
        })
        .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "merge task failed");
                fallback
            }
        };
        (out, report)
    }

    async fn download(&self, id: &str, node: &Node) -> Result<PathBuf, ProxyError> {
        let dest = self.workdir.join(format!("{}.zip", node.key()));
        self.proxy.get_file(&node.base_url, id, &dest).await?;
        tracing::info!(node = %node.ip, bundle = %id, path = %dest.display(), "downloaded node bundle");
        Ok(dest)
    }
}

async fn worker_loop(index: usize, jobs: Arc<Mutex<mpsc::Receiver<Job>>>, quit: CancellationToken) {
    loop {
        let job = tokio::select! {
            _ = quit.cancelled() => break,
            job = async { jobs.lock().await.recv().await } => match job {
                Some(job) => job,
                None => break,
            },
        };
        job.await;
    }
    tracing::debug!(worker = index, "coordinator worker stopped");
}

/// Shared context for the per-node creation/poll jobs.
struct PollCtx<P: ?Sized> {
    proxy: Arc<P>,
    job_tx: mpsc::Sender<Job>,
    quit: CancellationToken,
    interval: Duration,
    status_tx: mpsc::Sender<BundleStatusEvent>,
    id: String,
}

impl<P: ProxyClient + ?Sized + 'static> PollCtx<P> {
    fn creation_job(self: &Arc<Self>, node: Node) -> Job {
        let ctx = Arc::clone(self);
        Box::pin(async move {
            match ctx.proxy.create_bundle(&node.base_url, &ctx.id).await {
                Ok(_) => {
                    tracing::info!(node = %node.ip, bundle = %ctx.id, "local bundle creation accepted");
                    let job = ctx.status_job(node);
                    ctx.enqueue(job).await;
                }
                Err(e) => {
                    tracing::warn!(node = %node.ip, bundle = %ctx.id, error = %e, "local bundle creation failed");
                    ctx.emit(node, true, Some(format!("could not create local bundle: {e}"))).await;
                }
            }
        })
    }

    fn status_job(self: &Arc<Self>, node: Node) -> Job {
        let ctx = Arc::clone(self);
        Box::pin(async move { ctx.run_status_check(node).await })
    }

    async fn run_status_check(self: Arc<Self>, node: Node) {
        match self.proxy.status(&node.base_url, &self.id).await {
            Err(ProxyError::Unreadable(msg)) => {
                // An unreadable state never heals; give up on the node.
                self.emit(node, true, Some(format!("bundle state is unreadable: {msg}"))).await;
            }
            Err(e) => {
                self.reschedule(node.clone());
                self.emit(node, false, Some(e.to_string())).await;
            }
            Ok(bundle) => match bundle.status {
                BundleStatus::Done | BundleStatus::Deleted | BundleStatus::Canceled => {
                    self.emit(node, true, None).await;
                }
                _ => {
                    self.reschedule(node.clone());
                    self.emit(node, false, None).await;
                }
            },
        }
    }

    /// Re-enqueue a status check after the poll interval. The timer runs in
    /// its own task so no worker sits on the sleep.
    fn reschedule(self: &Arc<Self>, node: Node) {
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = ctx.quit.cancelled() => {}
                _ = tokio::time::sleep(ctx.interval) => {
                    let job = ctx.status_job(node);
                    ctx.enqueue(job).await;
                }
            }
        });
    }

    async fn enqueue(&self, job: Job) {
        tokio::select! {
            _ = self.quit.cancelled() => {}
            _ = self.job_tx.send(job) => {}
        }
    }

    async fn emit(&self, node: Node, done: bool, err: Option<String>) {
        let event = BundleStatusEvent { id: self.id.clone(), node, done, err };
        tokio::select! {
            _ = self.quit.cancelled() => {}
            _ = self.status_tx.send(event) => {}
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
