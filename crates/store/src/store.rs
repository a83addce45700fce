// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle store over the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use dx_core::{Bundle, BundleStatus};
use parking_lot::RwLock;
use thiserror::Error;

/// Per-bundle metadata file name.
pub const STATE_FILE: &str = "state.json";
/// Per-bundle archive file name.
pub const ARCHIVE_FILE: &str = "file.zip";

/// Errors from bundle store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bundle {0} already exists")]
    AlreadyExists(String),

    #[error("bundle {0} not found")]
    NotFound(String),

    #[error("invalid bundle id {0:?}")]
    InvalidId(String),

    #[error("bundle {id} state is unreadable: {reason}")]
    Unreadable { id: String, reason: String },

    #[error("work dir {0:?} exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

/// On-disk bundle store rooted at one work directory.
///
/// State-file access is serialized by a per-store read/write lock so a
/// reader never observes a half-replaced `state.json`. The archive file of
/// an in-progress bundle belongs to its producer and is not read here.
pub struct BundleStore {
    workdir: PathBuf,
    lock: RwLock<()>,
}

impl BundleStore {
    /// Open (creating if needed) a store rooted at `workdir`.
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let workdir = workdir.into();
        match fs::metadata(&workdir) {
            Ok(meta) if !meta.is_dir() => return Err(StoreError::NotADirectory(workdir)),
            Ok(_) => {}
            Err(_) => {
                fs::create_dir_all(&workdir)?;
                set_dir_mode(&workdir)?;
            }
        }
        Ok(Self { workdir, lock: RwLock::new(()) })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Directory that holds (or would hold) the given bundle.
    pub fn bundle_dir(&self, id: &str) -> PathBuf {
        self.workdir.join(id)
    }

    /// Path of the bundle's archive file.
    pub fn archive_path(&self, id: &str) -> PathBuf {
        self.bundle_dir(id).join(ARCHIVE_FILE)
    }

    fn state_path(&self, id: &str) -> PathBuf {
        self.bundle_dir(id).join(STATE_FILE)
    }

    /// True iff the bundle directory exists.
    pub fn exists(&self, id: &str) -> bool {
        valid_id(id) && self.bundle_dir(id).is_dir()
    }

    /// Create the bundle directory. Fails if the id is already present.
    pub fn create(&self, id: &str) -> Result<(), StoreError> {
        check_id(id)?;
        if self.exists(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        let dir = self.bundle_dir(id);
        fs::create_dir(&dir)?;
        set_dir_mode(&dir)?;
        Ok(())
    }

    /// Open the archive file for writing (owner-only, truncating).
    pub fn create_archive(&self, id: &str) -> Result<fs::File, StoreError> {
        check_id(id)?;
        let path = self.archive_path(id);
        let file = open_owner_only(&path)?;
        Ok(file)
    }

    /// Read the persisted bundle, refreshing `size` from the archive.
    ///
    /// A non-terminal state whose archive file is gone means the producer
    /// died before finishing; such bundles read back as `Unknown`.
    pub fn read_state(&self, id: &str) -> Result<Bundle, StoreError> {
        let _guard = self.lock.read();
        self.read_state_locked(id)
    }

    fn read_state_locked(&self, id: &str) -> Result<Bundle, StoreError> {
        check_id(id)?;
        if !self.bundle_dir(id).is_dir() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let raw = fs::read(self.state_path(id)).map_err(|e| StoreError::Unreadable {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        let mut bundle: Bundle =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Unreadable {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        match fs::metadata(self.archive_path(id)) {
            Ok(meta) => bundle.size = meta.len(),
            Err(_) if !bundle.status.is_terminal() => {
                bundle.status = BundleStatus::Unknown;
            }
            // Deleted/Canceled keep their recorded size; it is advisory only.
            Err(_) => {}
        }
        Ok(bundle)
    }

    /// Atomically replace the bundle's state file.
    pub fn write_state(&self, bundle: &Bundle) -> Result<(), StoreError> {
        check_id(&bundle.id)?;
        let _guard = self.lock.write();
        if !self.bundle_dir(&bundle.id).is_dir() {
            return Err(StoreError::NotFound(bundle.id.clone()));
        }
        let bytes = serde_json::to_vec(bundle).map_err(|e| StoreError::Unreadable {
            id: bundle.id.clone(),
            reason: e.to_string(),
        })?;
        let path = self.state_path(&bundle.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        set_file_mode(&tmp)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Remove the archive file; state file and directory remain.
    pub fn delete_archive(&self, id: &str) -> Result<(), StoreError> {
        check_id(id)?;
        let _guard = self.lock.write();
        match fs::remove_file(self.archive_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(e)),
        }
    }

    /// All bundles in the store, by id. Non-directory entries are ignored;
    /// directories with unreadable state are skipped with a warning.
    pub fn list(&self) -> Result<Vec<Bundle>, StoreError> {
        let _guard = self.lock.read();
        let mut bundles = Vec::new();
        for entry in fs::read_dir(&self.workdir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            match self.read_state_locked(&id) {
                Ok(bundle) => bundles.push(bundle),
                Err(e) => {
                    tracing::warn!(bundle = %id, error = %e, "skipping unreadable bundle");
                }
            }
        }
        bundles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(bundles)
    }
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains('/')
        && !id.contains('\\')
}

fn check_id(id: &str) -> Result<(), StoreError> {
    if valid_id(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[cfg(unix)]
fn set_dir_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
