//! JSON file backend.
//!
//! Writes the whole document to a temporary sibling, fsyncs it, then renames
//! it over the target. A crash at any point leaves either the old or the new
//! document on disk, never a torn one.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entry::{Entry, EntryId};
use crate::storage::document::{self, StoreDocument};
use crate::storage::traits::{EntryBackend, StorageError};

use super::file_lock::FileLock;

/// File-backed store document guarded by an exclusive lock.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    sync_on_write: bool,
    lock: FileLock,
}

impl JsonFileBackend {
    /// Open (or prepare to create) the document at `path`.
    ///
    /// Creates the parent directory if needed and takes the store lock.
    ///
    /// # Errors
    /// - `StorageError::Locked` if another process owns the document
    /// - `StorageError::Io` if the directory or lock file cannot be created
    pub fn open(path: impl AsRef<Path>, sync_on_write: bool) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = FileLock::acquire_for(&path)?;

        Ok(Self {
            path,
            sync_on_write,
            lock,
        })
    }

    /// Path of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file held by this backend.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    fn write_atomically(&self, raw: &str) -> Result<(), StorageError> {
        let temp_path = self.path.with_extension(format!("json.tmp.{}", Uuid::new_v4()));

        let result = (|| -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(raw.as_bytes())?;
            file.flush()?;
            if self.sync_on_write {
                file.sync_all()?;
            }
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io(e));
        }
        Ok(())
    }
}

impl EntryBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json-file"
    }

    fn load(&self) -> Result<Option<StoreDocument>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        document::decode(&raw).map(Some)
    }

    fn persist(
        &self,
        entries: &BTreeMap<EntryId, Entry>,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let raw = document::encode(entries, saved_at)?;
        self.write_atomically(&raw)
    }
}
