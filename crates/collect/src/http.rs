// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP endpoint collector: captures the body of a GET.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::{CollectError, CollectGuard, Collector, CollectorBody, GuardedReader};

/// Maximum error-body bytes carried into the failure message.
const BODY_PREFIX_LEN: usize = 256;

/// Issues a GET against a URL and streams the response body.
///
/// Any non-2xx status is a failure carrying the status and a body prefix.
pub struct HttpEndpointCollector {
    name: String,
    optional: bool,
    url: String,
    client: reqwest::Client,
}

impl HttpEndpointCollector {
    pub fn new(
        name: impl Into<String>,
        optional: bool,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self { name: name.into(), optional, url: url.into(), client }
    }
}

#[async_trait]
impl Collector for HttpEndpointCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }

    async fn collect(&self, guard: &CollectGuard) -> Result<CollectorBody, CollectError> {
        guard.check()?;

        let response = tokio::select! {
            err = guard.expired() => return Err(err),
            r = self.client.get(&self.url).send() => r.map_err(|source| CollectError::Http {
                url: self.url.clone(),
                source,
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                err = guard.expired() => return Err(err),
                text = response.text() => text.unwrap_or_default(),
            };
            return Err(CollectError::UnexpectedHttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
                body: body.chars().take(BODY_PREFIX_LEN).collect(),
            });
        }

        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        Ok(Box::pin(GuardedReader::new(StreamReader::new(stream), guard.clone())))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
