// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline-bearing collection context.
//!
//! One guard wraps a whole bundle production run: an absolute deadline plus
//! a cancellation token. Collectors check it before starting work; body
//! streams wrapped in [`GuardedReader`] keep checking it on every read.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::CollectError;

/// Shared deadline + cancellation for one bundle production run.
#[derive(Clone)]
pub struct CollectGuard {
    token: CancellationToken,
    deadline: Instant,
}

impl CollectGuard {
    /// A guard expiring `timeout` from now.
    pub fn new(timeout: Duration) -> Self {
        Self::with_token(CancellationToken::new(), timeout)
    }

    /// A guard bound to an external cancellation token.
    pub fn with_token(token: CancellationToken, timeout: Duration) -> Self {
        Self { token, deadline: Instant::now() + timeout }
    }

    /// Cancel the run explicitly (deadline aside).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Fail fast when the guard has already expired.
    pub fn check(&self) -> Result<(), CollectError> {
        if self.token.is_cancelled() {
            return Err(CollectError::Canceled);
        }
        if Instant::now() >= self.deadline {
            return Err(CollectError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the guard expires, with the matching error.
    pub async fn expired(&self) -> CollectError {
        tokio::select! {
            _ = self.token.cancelled() => CollectError::Canceled,
            _ = tokio::time::sleep_until(self.deadline) => CollectError::DeadlineExceeded,
        }
    }
}

/// An `AsyncRead` adapter that fails reads once its guard expires.
pub struct GuardedReader<R> {
    inner: R,
    guard: CollectGuard,
}

impl<R> GuardedReader<R> {
    pub fn new(inner: R, guard: CollectGuard) -> Self {
        Self { inner, guard }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for GuardedReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Err(e) = self.guard.check() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, e.to_string())));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
