// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative collector configuration.
//!
//! The daemon loads its collector list from a JSON array of these entries;
//! each entry builds the matching [`Collector`] at bundle-creation time.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    Collector, CommandCollector, FileCollector, HttpEndpointCollector, JournalCollector,
};

/// One configured collector entry, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CollectorConfig {
    Command {
        name: String,
        #[serde(default)]
        optional: bool,
        command: Vec<String>,
    },
    File {
        name: String,
        #[serde(default)]
        optional: bool,
        path: PathBuf,
    },
    Http {
        name: String,
        #[serde(default)]
        optional: bool,
        url: String,
    },
    Journal {
        name: String,
        #[serde(default)]
        optional: bool,
        since_secs: u64,
    },
}

impl CollectorConfig {
    pub fn name(&self) -> &str {
        match self {
            CollectorConfig::Command { name, .. }
            | CollectorConfig::File { name, .. }
            | CollectorConfig::Http { name, .. }
            | CollectorConfig::Journal { name, .. } => name,
        }
    }

    /// Instantiate the collector this entry describes.
    pub fn build(&self, client: &reqwest::Client) -> Box<dyn Collector> {
        match self {
            CollectorConfig::Command { name, optional, command } => {
                Box::new(CommandCollector::new(name.clone(), *optional, command.clone()))
            }
            CollectorConfig::File { name, optional, path } => {
                Box::new(FileCollector::new(name.clone(), *optional, path.clone()))
            }
            CollectorConfig::Http { name, optional, url } => Box::new(HttpEndpointCollector::new(
                name.clone(),
                *optional,
                url.clone(),
                client.clone(),
            )),
            CollectorConfig::Journal { name, optional, since_secs } => Box::new(
                JournalCollector::new(name.clone(), *optional, Duration::from_secs(*since_secs)),
            ),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
