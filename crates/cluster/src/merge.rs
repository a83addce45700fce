// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merging downloaded per-node archives into the cluster archive.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::report::{BundleReport, MERGED_REPORT_ENTRY};

#[derive(Debug, Error)]
enum MergeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Merge the downloaded per-node archives into one archive at `out`.
///
/// Entries are re-archived verbatim under their existing names, in the
/// order the downloads finished; the serialized report goes in last. A
/// per-node failure (or a failed report write) is recorded or logged, never
/// propagated: whatever could be merged is worth keeping.
pub(crate) fn merge_archives(
    out: &Path,
    sources: Vec<(String, PathBuf)>,
    mut report: BundleReport,
) -> BundleReport {
    let file = match fs::File::create(out) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(path = %out.display(), error = %e, "could not create merged archive");
            return report;
        }
    };
    let mut writer = ZipWriter::new(file);

    for (node_key, path) in &sources {
        if let Err(e) = copy_archive(&mut writer, path) {
            tracing::warn!(node = %node_key, error = %e, "could not merge node bundle");
            report.fail(node_key.clone(), format!("could not merge bundle: {e}"));
        }
    }

    if let Err(e) = append_report(&mut writer, &report) {
        tracing::error!(error = %e, "could not append report to merged archive");
    }
    if let Err(e) = writer.finish() {
        tracing::error!(error = %e, "could not finalize merged archive");
    }
    report
}

/// Re-archive every entry of `src` verbatim.
fn copy_archive(writer: &mut ZipWriter<fs::File>, src: &Path) -> Result<(), MergeError> {
    let mut archive = ZipArchive::new(fs::File::open(src)?)?;
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        writer.raw_copy_file(entry)?;
    }
    Ok(())
}

fn append_report(
    writer: &mut ZipWriter<fs::File>,
    report: &BundleReport,
) -> Result<(), MergeError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o600);
    writer.start_file(MERGED_REPORT_ENTRY, options)?;
    let body = serde_json::to_vec_pretty(report).map_err(std::io::Error::other)?;
    writer.write_all(&body)?;
    Ok(())
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
