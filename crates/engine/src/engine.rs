// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local bundle engine: runs collectors and produces the archive.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dx_collect::{CollectError, CollectGuard, Collector};
use dx_core::{sanitize_entry_name, Bundle, BundleStatus, BundleType, Clock, SystemClock};
use dx_store::{BundleStore, StoreError};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::archive;

/// Archive entry listing what ran, in order.
pub const SUMMARY_REPORT: &str = "summaryReport.txt";
/// Archive entry holding accumulated errors, present only when there were any.
pub const SUMMARY_ERRORS_REPORT: &str = "summaryErrorsReport.txt";

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bundle {0} already exists")]
    AlreadyExists(String),

    #[error("bundle {0} not found")]
    NotFound(String),

    /// Delete was asked for a bundle that has no archive to remove.
    /// Carries the current state so callers can echo it unchanged.
    #[error("bundle {} is not completed", .0.id)]
    NotCompleted(Box<Bundle>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("archive failure: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn store_err(e: StoreError) -> EngineError {
    match e {
        StoreError::NotFound(id) => EngineError::NotFound(id),
        other => EngineError::Store(other),
    }
}

/// Produces local bundles into a [`BundleStore`].
#[derive(Clone)]
pub struct LocalBundleEngine<C: Clock = SystemClock> {
    store: Arc<BundleStore>,
    clock: C,
}

impl LocalBundleEngine<SystemClock> {
    pub fn new(store: Arc<BundleStore>) -> Self {
        Self { store, clock: SystemClock }
    }
}

impl<C: Clock> LocalBundleEngine<C> {
    pub fn with_clock(store: Arc<BundleStore>, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<BundleStore> {
        &self.store
    }

    /// Start producing a bundle and return its `Started` snapshot.
    ///
    /// Collectors run asynchronously, in declared order, bounded by
    /// `timeout`; the terminal state lands in the store when they finish.
    /// Must be called from within a Tokio runtime.
    pub fn create(
        &self,
        id: &str,
        collectors: Vec<Box<dyn Collector>>,
        timeout: Duration,
    ) -> Result<Bundle, EngineError> {
        if self.store.exists(id) {
            return Err(EngineError::AlreadyExists(id.to_string()));
        }
        self.store.create(id).map_err(|e| match e {
            StoreError::AlreadyExists(id) => EngineError::AlreadyExists(id),
            other => EngineError::Store(other),
        })?;
        // Claim the archive path up front so readers see the bundle as live.
        drop(self.store.create_archive(id)?);

        let started_at = self.clock.now_utc();
        let initial = Bundle::started(id, BundleType::Local, started_at);
        self.store.write_state(&initial)?;

        let guard = CollectGuard::new(timeout);
        let store = Arc::clone(&self.store);
        let clock = self.clock.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            produce(store, clock, id, collectors, guard, started_at).await;
        });

        Ok(initial)
    }

    /// Current state of a bundle.
    pub fn status(&self, id: &str) -> Result<Bundle, EngineError> {
        self.store.read_state(id).map_err(store_err)
    }

    /// All bundles known to this node.
    pub fn list(&self) -> Result<Vec<Bundle>, EngineError> {
        self.store.list().map_err(store_err)
    }

    /// Remove a Done bundle's archive, keeping its state as `Deleted`.
    pub fn delete(&self, id: &str) -> Result<Bundle, EngineError> {
        let mut bundle = self.store.read_state(id).map_err(store_err)?;
        if bundle.status != BundleStatus::Done {
            return Err(EngineError::NotCompleted(Box::new(bundle)));
        }
        self.store.delete_archive(id)?;
        bundle.status = BundleStatus::Deleted;
        self.store.write_state(&bundle)?;
        Ok(bundle)
    }
}

/// Collect a single entry body, bounded by the guard.
async fn read_body(
    collector: &dyn Collector,
    guard: &CollectGuard,
) -> Result<Vec<u8>, CollectError> {
    let mut body = tokio::select! {
        err = guard.expired() => return Err(err),
        r = collector.collect(guard) => r?,
    };
    let mut buf = Vec::new();
    tokio::select! {
        err = guard.expired() => Err(err),
        r = body.read_to_end(&mut buf) => {
            r?;
            Ok(buf)
        }
    }
}

/// The asynchronous producer: runs every collector, assembles the archive,
/// and writes the terminal state.
async fn produce<C: Clock>(
    store: Arc<BundleStore>,
    clock: C,
    id: String,
    collectors: Vec<Box<dyn Collector>>,
    guard: CollectGuard,
    started_at: DateTime<Utc>,
) {
    let mut summary = String::new();
    let mut errors: Vec<String> = Vec::new();
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    for collector in &collectors {
        if let Err(e) = guard.check() {
            errors.push(e.to_string());
            break;
        }
        summary.push_str(&format!("[START GET {}]\n", collector.name()));
        match read_body(collector.as_ref(), &guard).await {
            Ok(bytes) => entries.push((sanitize_entry_name(collector.name()), bytes)),
            Err(e) => {
                let msg = format!("could not collect {}: {}", collector.name(), e);
                tracing::warn!(
                    bundle = %id,
                    collector = collector.name(),
                    error = %e,
                    "collector failed"
                );
                if collector.optional() {
                    entries.push((
                        sanitize_entry_name(collector.name()),
                        msg.clone().into_bytes(),
                    ));
                }
                errors.push(msg);
            }
        }
        summary.push_str(&format!("[STOP GET {}]\n", collector.name()));
    }

    entries.push((SUMMARY_REPORT.to_string(), summary.into_bytes()));
    if !errors.is_empty() {
        entries.push((SUMMARY_ERRORS_REPORT.to_string(), errors.join("\n").into_bytes()));
    }

    let archive_path = store.archive_path(&id);
    let written =
        tokio::task::spawn_blocking(move || archive::write_archive(&archive_path, entries)).await;

    let mut status = BundleStatus::Done;
    let size = match written {
        Ok(Ok(size)) => size,
        Ok(Err(e)) => {
            tracing::error!(bundle = %id, error = %e, "archive write failed");
            errors.push(format!("could not write archive: {e}"));
            status = BundleStatus::Failed;
            0
        }
        Err(e) => {
            tracing::error!(bundle = %id, error = %e, "archive task failed");
            errors.push(format!("could not write archive: {e}"));
            status = BundleStatus::Failed;
            0
        }
    };

    let bundle = Bundle {
        id: id.clone(),
        kind: BundleType::Local,
        size,
        status,
        started_at: Some(started_at),
        stopped_at: Some(clock.now_utc()),
        errors,
    };
    if let Err(e) = store.write_state(&bundle) {
        tracing::error!(bundle = %id, error = %e, "failed to write terminal state");
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
