// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal collector: recent systemd journal entries.

use std::time::Duration;

use async_trait::async_trait;

use crate::{CollectError, CollectGuard, Collector, CollectorBody};

/// Captures journal entries newer than `since` via `journalctl`.
///
/// Only meaningful where systemd exists; on other platforms `collect`
/// always fails with [`CollectError::Unsupported`].
pub struct JournalCollector {
    name: String,
    optional: bool,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    since: Duration,
}

impl JournalCollector {
    pub fn new(name: impl Into<String>, optional: bool, since: Duration) -> Self {
        Self { name: name.into(), optional, since }
    }
}

#[async_trait]
impl Collector for JournalCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }

    #[cfg(target_os = "linux")]
    async fn collect(&self, guard: &CollectGuard) -> Result<CollectorBody, CollectError> {
        let command = vec![
            "journalctl".to_string(),
            "-x".to_string(),
            "--no-pager".to_string(),
            "--since".to_string(),
            format!("-{}s", self.since.as_secs()),
        ];
        crate::CommandCollector::new(self.name.clone(), self.optional, command)
            .collect(guard)
            .await
    }

    #[cfg(not(target_os = "linux"))]
    async fn collect(&self, _guard: &CollectGuard) -> Result<CollectorBody, CollectError> {
        Err(CollectError::Unsupported)
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
