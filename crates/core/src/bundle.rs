// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle metadata and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Where a bundle was produced.
///
/// `Local` bundles are assembled on a single node from its collectors;
/// `Cluster` bundles are assembled on a master by merging local bundles
/// from many nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleType {
    Local,
    Cluster,
}

crate::simple_display! {
    BundleType {
        Local => "Local",
        Cluster => "Cluster",
    }
}

/// Error for an unrecognized bundle type string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown bundle type {0:?}")]
pub struct TypeParseError(pub String);

impl FromStr for BundleType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Local" => Ok(BundleType::Local),
            "Cluster" => Ok(BundleType::Cluster),
            other => Err(TypeParseError(other.to_string())),
        }
    }
}

/// Lifecycle status of a bundle.
///
/// An unrecognized status string deserializes to `Unknown` so that newer
/// peers can hand us states we do not know about without failing the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum BundleStatus {
    /// State could not be determined (stale or interrupted producer).
    Unknown,
    /// Creation accepted; producer not yet running.
    Started,
    /// Producer is running.
    InProgress,
    /// Producer finished; archive is on disk.
    Done,
    Canceled,
    /// Archive removed; state retained.
    Deleted,
    Failed,
}

impl BundleStatus {
    /// Terminal states never change again, except `Done` → `Deleted` via
    /// an explicit delete.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BundleStatus::Done | BundleStatus::Deleted | BundleStatus::Canceled | BundleStatus::Failed
        )
    }
}

crate::simple_display! {
    BundleStatus {
        Unknown => "Unknown",
        Started => "Started",
        InProgress => "InProgress",
        Done => "Done",
        Canceled => "Canceled",
        Deleted => "Deleted",
        Failed => "Failed",
    }
}

impl From<String> for BundleStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Started" => BundleStatus::Started,
            "InProgress" => BundleStatus::InProgress,
            "Done" => BundleStatus::Done,
            "Canceled" => BundleStatus::Canceled,
            "Deleted" => BundleStatus::Deleted,
            "Failed" => BundleStatus::Failed,
            _ => BundleStatus::Unknown,
        }
    }
}

impl FromStr for BundleStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BundleStatus::from(s.to_string()))
    }
}

/// A bundle: one named diagnostics archive plus its metadata.
///
/// Mutation authority belongs to the task that created the bundle until it
/// reaches a terminal status; everyone else reads through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BundleType,
    /// Archive size in bytes. Zero (and omitted) until the archive exists;
    /// not meaningful for `Deleted`/`Canceled` bundles.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    pub status: BundleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Bundle {
    /// A fresh `Started` snapshot, stamped with the given start time.
    pub fn started(id: impl Into<String>, kind: BundleType, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind,
            size: 0,
            status: BundleStatus::Started,
            started_at: Some(started_at),
            stopped_at: None,
            errors: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

crate::builder! {
    pub struct BundleBuilder => Bundle {
        into {
            id: String = "bundle-test",
        }
        set {
            kind: BundleType = BundleType::Local,
            size: u64 = 0,
            status: BundleStatus = BundleStatus::Started,
            errors: Vec<String> = Vec::new(),
        }
        option {
            started_at: DateTime<Utc> = None,
            stopped_at: DateTime<Utc> = None,
        }
    }
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
