// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster node identity and URL resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role a node plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Master,
    Agent,
    PublicAgent,
}

dx_core::simple_display! {
    NodeRole {
        Master => "master",
        Agent => "agent",
        PublicAgent => "public_agent",
    }
}

/// One node the coordinator talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub ip: String,
    pub role: NodeRole,
    /// Base URL of the node's bundle service, e.g. `http://10.0.0.1:1050`.
    pub base_url: String,
}

impl Node {
    pub fn new(ip: impl Into<String>, role: NodeRole, base_url: impl Into<String>) -> Self {
        Self { ip: ip.into(), role, base_url: base_url.into() }
    }

    /// Stable key identifying this node in reports and file names.
    pub fn key(&self) -> String {
        format!("{}_{}", self.ip, self.role)
    }
}

/// Failure to resolve a node's service URL.
#[derive(Debug, Error)]
#[error("could not build URL for node {ip}: {reason}")]
pub struct UrlBuildError {
    pub ip: String,
    pub reason: String,
}

/// Resolves the bundle-service base URL for a node.
pub trait NodeUrlBuilder: Send + Sync {
    fn base_url(&self, ip: &str, role: NodeRole) -> Result<String, UrlBuildError>;
}

/// URL builder from a fixed scheme and per-role ports.
pub struct SchemeUrlBuilder {
    scheme: String,
    master_port: u16,
    agent_port: u16,
}

impl SchemeUrlBuilder {
    pub fn new(scheme: impl Into<String>, master_port: u16, agent_port: u16) -> Self {
        Self { scheme: scheme.into(), master_port, agent_port }
    }
}

impl NodeUrlBuilder for SchemeUrlBuilder {
    fn base_url(&self, ip: &str, role: NodeRole) -> Result<String, UrlBuildError> {
        if ip.is_empty() {
            return Err(UrlBuildError { ip: ip.to_string(), reason: "empty address".into() });
        }
        let port = match role {
            NodeRole::Master => self.master_port,
            NodeRole::Agent | NodeRole::PublicAgent => self.agent_port,
        };
        Ok(format!("{}://{}:{}", self.scheme, ip, port))
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
