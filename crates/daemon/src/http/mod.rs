// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface assembly.
//!
//! One router per daemon: `/system/health` everywhere, the node-local
//! bundle API under `/node/diagnostics`, and on masters the cluster API
//! under `/diagnostics`.

mod cluster;
mod local;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::routing::get;
use axum::{Json, Router};
use dx_core::BundleType;
use dx_engine::LocalBundleEngine;
use serde::Deserialize;

use crate::cluster_handler::ClusterHandler;
use crate::collectors::CollectorSet;
use crate::error::ApiError;

/// State behind the node-local surface.
pub struct LocalState {
    pub engine: LocalBundleEngine,
    pub collectors: CollectorSet,
    pub timeout: Duration,
}

/// Shared router state. `cluster` is populated on masters only.
#[derive(Clone)]
pub struct AppState {
    pub local: Arc<LocalState>,
    pub cluster: Option<Arc<ClusterHandler>>,
}

/// Build the daemon's router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/system/health", get(health))
        .nest("/node/diagnostics", local::routes());
    if state.cluster.is_some() {
        app = app.nest("/diagnostics", cluster::routes());
    }
    app.with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Body of a bundle creation request. Absent fields mean defaults.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CreateRequest {
    #[serde(rename = "type")]
    pub kind: Option<BundleType>,
    pub masters: Option<bool>,
    pub agents: Option<bool>,
}

/// An empty body is a valid request with all defaults.
pub(crate) fn parse_create_body(body: &Bytes) -> Result<CreateRequest, ApiError> {
    if body.is_empty() {
        return Ok(CreateRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
}
