// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zip assembly for local bundles.

use std::fs;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::engine::EngineError;

/// Write `entries` to a zip archive at `path`, in order, and return the
/// archive's on-disk byte count.
///
/// Entries carry no timestamps so two identical runs produce identical
/// archives.
pub(crate) fn write_archive(
    path: &Path,
    entries: Vec<(String, Vec<u8>)>,
) -> Result<u64, EngineError> {
    let file = fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o600);

    for (name, body) in entries {
        writer.start_file(&name, options)?;
        writer.write_all(&body)?;
    }

    let file = writer.finish()?;
    Ok(file.metadata()?.len())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
