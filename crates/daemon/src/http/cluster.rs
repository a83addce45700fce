// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster bundle API, served by masters.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use dx_core::{Bundle, BundleType};

use super::{parse_create_body, AppState};
use crate::cluster_handler::{ClusterHandler, CreateOptions};
use crate::error::ApiError;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", put(create).get(status).delete(delete_bundle))
        .route("/{id}/file", get(download))
}

fn handler(state: &AppState) -> Result<&Arc<ClusterHandler>, ApiError> {
    state
        .cluster
        .as_ref()
        .ok_or_else(|| ApiError::not_found("cluster operations are served by masters"))
}

async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Bundle>, ApiError> {
    let request = parse_create_body(&body)?;
    if !matches!(request.kind, None | Some(BundleType::Cluster)) {
        return Err(ApiError::bad_request("this surface only creates Cluster bundles"));
    }
    let options = CreateOptions {
        masters: request.masters.unwrap_or(true),
        agents: request.agents.unwrap_or(true),
    };
    Ok(Json(handler(&state)?.create(&id, options).await?))
}

async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Bundle>, ApiError> {
    Ok(Json(handler(&state)?.status(&id).await?))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Bundle>>, ApiError> {
    Ok(Json(handler(&state)?.list().await?))
}

async fn delete_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Bundle>, ApiError> {
    Ok(Json(handler(&state)?.delete(&id).await?))
}

async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = handler(&state)?.download(&id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename={id}.zip")),
    ];
    Ok((headers, bytes).into_response())
}
