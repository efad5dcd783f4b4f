//! Backend trait for the durable store document.
//!
//! The store keeps its working state in memory and hands the *whole* entry
//! map to a backend after every mutating call. Backends decide where that
//! document lives:
//! - [`InMemoryBackend`](super::InMemoryBackend) for tests and embedded use
//! - `JsonFileBackend` (feature `persistent`) for a locked file on disk

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::entry::{Entry, EntryId};

use super::document::StoreDocument;

/// Errors that can occur while loading or persisting the store document.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another process holds the store lock.
    #[error("Store is locked by another process: {path}")]
    Locked { path: String },

    /// The persisted document could not be parsed.
    #[error("Corrupt store document: {message}")]
    Corrupt { message: String },

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend-internal failure (poisoned lock, injected fault, ...).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Returns true if the failure is contention for the store lock.
    #[must_use]
    pub const fn is_lock_contention(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Durable home of the store document.
///
/// # Contract
/// - `persist` replaces the whole document; a failed `persist` must leave the
///   previously persisted document readable.
/// - `load` returns `Ok(None)` when nothing was ever persisted, and
///   `StorageError::Corrupt` when something was persisted but cannot be read.
pub trait EntryBackend: Send + Sync + fmt::Debug {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Load the last persisted document, if any.
    fn load(&self) -> Result<Option<StoreDocument>, StorageError>;

    /// Persist the full entry map.
    fn persist(
        &self,
        entries: &BTreeMap<EntryId, Entry>,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}
