// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collector set served by the node-local surface.
//!
//! Operators describe what to collect in a JSON file; without one, a small
//! built-in set applies. Entry names are prefixed with the node's address
//! so that merged cluster archives keep per-node subtrees.

use std::path::{Path, PathBuf};

use dx_collect::{Collector, CollectorConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorsError {
    #[error("could not read collectors file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse collectors file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The configured collectors, instantiated fresh for every bundle.
#[derive(Debug)]
pub struct CollectorSet {
    configs: Vec<CollectorConfig>,
    client: reqwest::Client,
}

impl CollectorSet {
    /// Load the collector list from a JSON file.
    pub fn from_file(path: &Path, client: reqwest::Client) -> Result<Self, CollectorsError> {
        let raw = std::fs::read(path).map_err(|source| CollectorsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let configs = serde_json::from_slice(&raw).map_err(|source| CollectorsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { configs, client })
    }

    /// The built-in set, with entry names rooted under the node's address.
    pub fn default_for_node(node_ip: &str, client: reqwest::Client) -> Self {
        let name = |tail: &str| format!("{node_ip}/{tail}");
        let configs = vec![
            CollectorConfig::Command {
                name: name("uname"),
                optional: false,
                command: vec!["uname".into(), "-a".into()],
            },
            CollectorConfig::Command {
                name: name("ps"),
                optional: true,
                command: vec!["ps".into(), "aux".into()],
            },
            CollectorConfig::File {
                name: name("loadavg"),
                optional: true,
                path: PathBuf::from("/proc/loadavg"),
            },
            CollectorConfig::Journal {
                name: name("journal"),
                optional: true,
                since_secs: 3 * 3600,
            },
        ];
        Self { configs, client }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Instantiate the collectors, in configured order.
    pub fn build(&self) -> Vec<Box<dyn Collector>> {
        self.configs.iter().map(|config| config.build(&self.client)).collect()
    }
}

#[cfg(test)]
#[path = "collectors_tests.rs"]
mod tests;
