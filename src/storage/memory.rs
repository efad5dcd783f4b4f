//! In-memory storage backend.
//!
//! Holds the last persisted document as a JSON string, so every persist and
//! load goes through the same encoding the file backend uses. Intended for
//! embedded usage and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::entry::{Entry, EntryId};

use super::document::{self, StoreDocument};
use super::traits::{EntryBackend, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory backend.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    document: RwLock<Option<String>>,
    persist_count: AtomicU64,
    fail_next_persist: AtomicBool,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that already holds `raw` as its document.
    #[must_use]
    pub fn with_document(raw: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// The last persisted document, verbatim.
    pub fn document(&self) -> Result<Option<String>, StorageError> {
        let guard = self.document.read().map_err(|_| lock_err("memory.document"))?;
        Ok(guard.clone())
    }

    /// Number of successful persists.
    #[must_use]
    pub fn persist_count(&self) -> u64 {
        self.persist_count.load(Ordering::SeqCst)
    }

    /// Make the next `persist` fail without touching the stored document.
    pub fn fail_next_persist(&self) {
        self.fail_next_persist.store(true, Ordering::SeqCst);
    }
}

impl EntryBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<Option<StoreDocument>, StorageError> {
        let guard = self.document.read().map_err(|_| lock_err("memory.load"))?;
        guard.as_deref().map(document::decode).transpose()
    }

    fn persist(
        &self,
        entries: &BTreeMap<EntryId, Entry>,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if self.fail_next_persist.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend("injected persist failure".to_string()));
        }
        let raw = document::encode(entries, saved_at)?;
        let mut guard = self.document.write().map_err(|_| lock_err("memory.persist"))?;
        *guard = Some(raw);
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_backend_loads_nothing() {
        let backend = InMemoryBackend::new();
        assert!(backend.load().unwrap().is_none());
        assert_eq!(backend.persist_count(), 0);
    }

    #[test]
    fn test_persist_then_load() {
        let backend = InMemoryBackend::new();
        let now = Utc::now();
        backend.persist(&BTreeMap::new(), now).unwrap();

        let doc = backend.load().unwrap().unwrap();
        assert_eq!(doc.last_saved, now);
        assert_eq!(backend.persist_count(), 1);
    }

    #[test]
    fn test_injected_failure_keeps_previous_document() {
        let backend = InMemoryBackend::new();
        let first = Utc::now();
        backend.persist(&BTreeMap::new(), first).unwrap();

        backend.fail_next_persist();
        assert!(backend.persist(&BTreeMap::new(), Utc::now()).is_err());
        assert_eq!(backend.load().unwrap().unwrap().last_saved, first);

        // Only one failure is injected.
        backend.persist(&BTreeMap::new(), Utc::now()).unwrap();
        assert_eq!(backend.persist_count(), 2);
    }

    #[test]
    fn test_corrupt_seed_is_reported() {
        let backend = InMemoryBackend::with_document("[]");
        assert!(matches!(backend.load(), Err(StorageError::Corrupt { .. })));
    }
}
