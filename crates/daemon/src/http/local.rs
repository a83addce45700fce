// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-local bundle API.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use dx_core::{Bundle, BundleStatus, BundleType};
use dx_engine::EngineError;
use tokio_util::io::ReaderStream;

use super::{parse_create_body, AppState};
use crate::error::ApiError;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", put(create).get(status).delete(delete_bundle))
        .route("/{id}/file", get(download))
}

async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Bundle>, ApiError> {
    let request = parse_create_body(&body)?;
    if !matches!(request.kind, None | Some(BundleType::Local)) {
        return Err(ApiError::bad_request("this surface only creates Local bundles"));
    }
    let collectors = state.local.collectors.build();
    let bundle = state.local.engine.create(&id, collectors, state.local.timeout)?;
    Ok(Json(bundle))
}

async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Bundle>, ApiError> {
    Ok(Json(state.local.engine.status(&id)?))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Bundle>>, ApiError> {
    Ok(Json(state.local.engine.list()?))
}

async fn delete_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.local.engine.delete(&id) {
        Ok(bundle) => Ok(Json(bundle).into_response()),
        // Echo the unchanged state alongside the 304.
        Err(EngineError::NotCompleted(current)) => {
            Ok((StatusCode::NOT_MODIFIED, Json(*current)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let bundle = state.local.engine.status(&id)?;
    if bundle.status != BundleStatus::Done {
        return Err(ApiError::not_found(format!("bundle {id} has no downloadable archive")));
    }
    let path = state.local.engine.store().archive_path(&id);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal(format!("could not open archive: {e}")))?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename={id}.zip")),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
