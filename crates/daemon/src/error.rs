// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP error type and status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dx_engine::EngineError;
use dx_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error reply: HTTP status plus a human-readable message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Wire shape of an error reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code.as_u16(), error: self.message };
        (self.code, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        let code = match e {
            StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::Unreadable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::NotADirectory(_) | StoreError::Storage(_) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
        };
        Self::new(code, message)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::AlreadyExists(id) => {
                Self::new(StatusCode::CONFLICT, format!("bundle {id} already exists"))
            }
            EngineError::NotFound(id) => Self::not_found(format!("bundle {id} not found")),
            EngineError::NotCompleted(bundle) => Self::new(
                StatusCode::NOT_MODIFIED,
                format!("bundle {} is not completed", bundle.id),
            ),
            EngineError::Store(e) => e.into(),
            EngineError::Zip(e) => Self::internal(format!("archive failure: {e}")),
            EngineError::Io(e) => Self::internal(format!("I/O error: {e}")),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
