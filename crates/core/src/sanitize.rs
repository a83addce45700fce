// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive entry name sanitization.
//!
//! Collector names become entry paths inside the archive, so they must not
//! be able to escape the archive root or smuggle odd bytes into readers.

/// Sanitize a collector name into a safe archive entry path.
///
/// Interior `/` separators are kept so a node prefix like `10.0.0.1/log`
/// stays a path; a leading `/` is stripped; every other character outside
/// `[A-Za-z0-9_.-]` becomes `_`.
pub fn sanitize_entry_name(name: &str) -> String {
    let trimmed = name.strip_prefix('/').unwrap_or(name);
    trimmed
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '.' | '-' | '/' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
