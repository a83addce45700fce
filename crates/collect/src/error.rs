// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collection failure taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while collecting one archive entry.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("canceled")]
    Canceled,

    #[error("collector has an empty command")]
    EmptyCommand,

    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GET {url} returned status {status}: {body}")]
    UnexpectedHttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("journal collection is not supported on this platform")]
    Unsupported,
}
