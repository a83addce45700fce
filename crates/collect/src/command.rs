// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command collector: runs a process and captures its output.

use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{CollectError, CollectGuard, Collector, CollectorBody};

/// Runs a command and yields stdout followed by stderr as the entry body.
///
/// A non-zero exit status is not a failure: for diagnostics, whatever the
/// command printed is the artifact. Failures are spawn errors and guard
/// expiry; expiry kills the child.
pub struct CommandCollector {
    name: String,
    optional: bool,
    command: Vec<String>,
}

impl CommandCollector {
    pub fn new(name: impl Into<String>, optional: bool, command: Vec<String>) -> Self {
        Self { name: name.into(), optional, command }
    }
}

#[async_trait]
impl Collector for CommandCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn optional(&self) -> bool {
        self.optional
    }

    async fn collect(&self, guard: &CollectGuard) -> Result<CollectorBody, CollectError> {
        guard.check()?;
        let (program, args) = self.command.split_first().ok_or(CollectError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(collector = %self.name, command = ?self.command, "running command");
        let child = cmd.spawn().map_err(|source| CollectError::Spawn {
            command: self.command.join(" "),
            source,
        })?;

        let output = tokio::select! {
            err = guard.expired() => return Err(err),
            out = child.wait_with_output() => out?,
        };

        let mut bytes = output.stdout;
        bytes.extend_from_slice(&output.stderr);
        Ok(Box::pin(Cursor::new(bytes)))
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
