// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx-collect: content collectors for local diagnostics bundles.
//!
//! A [`Collector`] is one named source of bytes inside a bundle archive.
//! Collection is bounded by a [`CollectGuard`] carrying the bundle deadline;
//! every body stream a collector hands back keeps honoring that guard.

mod command;
mod config;
mod error;
mod file;
mod guard;
mod http;
mod journal;

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

pub use command::CommandCollector;
pub use config::CollectorConfig;
pub use error::CollectError;
pub use file::FileCollector;
pub use guard::{CollectGuard, GuardedReader};
pub use http::HttpEndpointCollector;
pub use journal::JournalCollector;

/// Lazy body stream returned by a collector.
pub type CollectorBody = Pin<Box<dyn AsyncRead + Send>>;

/// A named source of one archive entry.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Entry name inside the archive. Unique within one bundle; sanitized
    /// by the engine before it becomes a path.
    fn name(&self) -> &str;

    /// Whether a failure of this collector is tolerated. Optional failures
    /// still produce an archive entry (the error text becomes the body);
    /// mandatory failures produce none.
    fn optional(&self) -> bool;

    /// Produce the body stream. Must return promptly with
    /// [`CollectError::DeadlineExceeded`] or [`CollectError::Canceled`]
    /// once the guard has expired.
    async fn collect(&self, guard: &CollectGuard) -> Result<CollectorBody, CollectError>;
}
