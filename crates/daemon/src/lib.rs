// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx-daemon: the diagnostics bundle service.
//!
//! Every node serves the node-local surface (`/node/diagnostics`), backed
//! by the local bundle engine. Masters additionally serve the cluster
//! surface (`/diagnostics`), backed by the cluster handler which fans
//! external operations out across master peers and drives the coordinator
//! for creation.

pub mod cluster_handler;
pub mod collectors;
pub mod discovery;
pub mod error;
pub mod http;

pub use cluster_handler::{ClusterHandler, CreateOptions};
pub use collectors::{CollectorSet, CollectorsError};
pub use discovery::{Discovery, DiscoveryError, NodeInfo, StaticDiscovery};
pub use error::{ApiError, ErrorBody};
pub use http::{router, AppState, LocalState};
