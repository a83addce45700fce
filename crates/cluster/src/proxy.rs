// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed client for a remote bundle service.
//!
//! The error kinds here are a contract: the cluster handler maps them back
//! to HTTP statuses, so replies must stay distinguishable kinds rather than
//! strings.

use std::path::Path;

use async_trait::async_trait;
use dx_core::Bundle;
use futures_util::TryStreamExt;
use thiserror::Error;
use tokio_util::io::StreamReader;

/// Maximum error-body bytes carried into an `UnexpectedStatus`.
const BODY_PREFIX_LEN: usize = 256;

/// Errors from talking to a remote bundle service.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("bundle not found")]
    NotFound,

    #[error("bundle is not completed")]
    NotCompleted,

    #[error("remote bundle state is unreadable: {0}")]
    Unreadable(String),

    #[error("unexpected status {code} from {url}: {body}")]
    UnexpectedStatus { code: u16, body: String, url: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Verbs of the remote bundle-service protocol.
#[async_trait]
pub trait ProxyClient: Send + Sync {
    /// Ask the node to start producing a bundle with the given id.
    async fn create_bundle(&self, base_url: &str, id: &str) -> Result<Bundle, ProxyError>;

    /// Current state of a bundle on the node.
    async fn status(&self, base_url: &str, id: &str) -> Result<Bundle, ProxyError>;

    /// Download the bundle archive to a local path.
    async fn get_file(&self, base_url: &str, id: &str, dest: &Path) -> Result<(), ProxyError>;

    /// All bundles the node knows about.
    async fn list(&self, base_url: &str) -> Result<Vec<Bundle>, ProxyError>;

    /// Delete the bundle archive, keeping its state.
    async fn delete(&self, base_url: &str, id: &str) -> Result<Bundle, ProxyError>;
}

/// HTTP implementation of [`ProxyClient`].
///
/// `base_path` selects which surface the peer serves: the node-local one
/// for coordinator fan-out, the cluster one for master-to-master calls.
pub struct HttpProxyClient {
    client: reqwest::Client,
    base_path: String,
}

impl HttpProxyClient {
    pub fn new(client: reqwest::Client, base_path: impl Into<String>) -> Self {
        Self { client, base_path: base_path.into() }
    }

    fn url(&self, base_url: &str, tail: &str) -> String {
        format!("{}{}{}", base_url.trim_end_matches('/'), self.base_path, tail)
    }

    /// Map a reply status onto the typed error kinds.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProxyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            404 => Err(ProxyError::NotFound),
            304 => Err(ProxyError::NotCompleted),
            500 => Err(ProxyError::Unreadable(body)),
            code => Err(ProxyError::UnexpectedStatus {
                code,
                body: body.chars().take(BODY_PREFIX_LEN).collect(),
                url,
            }),
        }
    }
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn create_bundle(&self, base_url: &str, id: &str) -> Result<Bundle, ProxyError> {
        let url = self.url(base_url, &format!("/{id}"));
        // An empty body means "defaults" on both surfaces.
        let response = self.client.put(&url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn status(&self, base_url: &str, id: &str) -> Result<Bundle, ProxyError> {
        let url = self.url(base_url, &format!("/{id}"));
        let response = self.client.get(&url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_file(&self, base_url: &str, id: &str, dest: &Path) -> Result<(), ProxyError> {
        let url = self.url(base_url, &format!("/{id}/file"));
        let response = self.client.get(&url).send().await?;
        let response = Self::check(response).await?;

        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let mut reader = StreamReader::new(stream);
        let mut file = tokio::fs::File::create(dest).await?;
        tokio::io::copy(&mut reader, &mut file).await?;
        Ok(())
    }

    async fn list(&self, base_url: &str) -> Result<Vec<Bundle>, ProxyError> {
        let url = self.url(base_url, "");
        let response = self.client.get(&url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, base_url: &str, id: &str) -> Result<Bundle, ProxyError> {
        let url = self.url(base_url, &format!("/{id}"));
        let response = self.client.delete(&url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
