// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File collector: streams a local file.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;

use crate::{CollectError, CollectGuard, Collector, CollectorBody, GuardedReader};

/// Streams the contents of a file on the local filesystem.
pub struct FileCollector {
    name: String,
    optional: bool,
    path: PathBuf,
}

impl FileCollector {
    pub fn new(name: impl Into<String>, optional: bool, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), optional, path: path.into() }
    }
}

#[async_trait]
impl Collector for FileCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }

    async fn collect(&self, guard: &CollectGuard) -> Result<CollectorBody, CollectError> {
        guard.check()?;
        let file = File::open(&self.path).await.map_err(|source| CollectError::Open {
            path: self.path.clone(),
            source,
        })?;
        Ok(Box::pin(GuardedReader::new(file, guard.clone())))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
