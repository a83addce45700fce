// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node inventory seam.
//!
//! How masters and agents are actually found is deployment-specific; the
//! handler only needs the two role-scoped listings. The static variant
//! serves fixed inventories from configuration.

use async_trait::async_trait;
use dx_cluster::NodeRole;
use thiserror::Error;

/// Address and role of one discovered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub ip: String,
    pub role: NodeRole,
}

impl NodeInfo {
    pub fn new(ip: impl Into<String>, role: NodeRole) -> Self {
        Self { ip: ip.into(), role }
    }
}

/// Failure to enumerate the cluster.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DiscoveryError(pub String);

/// Source of the cluster's node inventory.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn masters(&self) -> Result<Vec<NodeInfo>, DiscoveryError>;

    /// Agents of both kinds (private and public).
    async fn agents(&self) -> Result<Vec<NodeInfo>, DiscoveryError>;
}

/// Fixed inventory from configuration.
pub struct StaticDiscovery {
    masters: Vec<String>,
    agents: Vec<String>,
    public_agents: Vec<String>,
}

impl StaticDiscovery {
    pub fn new(masters: Vec<String>, agents: Vec<String>, public_agents: Vec<String>) -> Self {
        Self { masters, agents, public_agents }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn masters(&self) -> Result<Vec<NodeInfo>, DiscoveryError> {
        Ok(self.masters.iter().map(|ip| NodeInfo::new(ip, NodeRole::Master)).collect())
    }

    async fn agents(&self) -> Result<Vec<NodeInfo>, DiscoveryError> {
        let mut nodes: Vec<NodeInfo> =
            self.agents.iter().map(|ip| NodeInfo::new(ip, NodeRole::Agent)).collect();
        nodes.extend(
            self.public_agents.iter().map(|ip| NodeInfo::new(ip, NodeRole::PublicAgent)),
        );
        Ok(nodes)
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
