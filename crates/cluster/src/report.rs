// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node outcome report for a cluster bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Entry name the serialized report takes inside the merged archive.
pub const MERGED_REPORT_ENTRY: &str = "summaryErrorReport.txt";

/// Outcome of one node's bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

/// Machine-readable per-node success/failure report, keyed by node.
///
/// A `BTreeMap` keeps the serialized form independent of completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleReport {
    pub id: String,
    pub nodes: BTreeMap<String, NodeReport>,
}

impl BundleReport {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), nodes: BTreeMap::new() }
    }

    pub fn succeed(&mut self, node_key: impl Into<String>) {
        self.nodes.insert(node_key.into(), NodeReport { succeeded: true, err: None });
    }

    pub fn fail(&mut self, node_key: impl Into<String>, err: impl Into<String>) {
        self.nodes
            .insert(node_key.into(), NodeReport { succeeded: false, err: Some(err.into()) });
    }

    /// Error strings of all failed nodes, prefixed with the node key.
    pub fn errors(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|(key, node)| {
                node.err.as_ref().map(|err| format!("{key}: {err}"))
            })
            .collect()
    }

    /// True when every reported node succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.nodes.values().all(|n| n.succeeded)
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
