//! The durable store document.
//!
//! ```text
//! { "entries": { <entry_id>: <Entry> }, "last_saved": <rfc3339>, "total_entries": <int> }
//! ```
//!
//! Entries are kept in a `BTreeMap`, so the encoded document is stable for a
//! given entry set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{Entry, EntryId};

use super::traits::StorageError;

/// Owned form of the document, produced by `load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub entries: BTreeMap<EntryId, Entry>,
    pub last_saved: DateTime<Utc>,
    #[serde(default)]
    pub total_entries: usize,
}

#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    entries: &'a BTreeMap<EntryId, Entry>,
    last_saved: DateTime<Utc>,
    total_entries: usize,
}

/// Encodes the entry map as a pretty-printed JSON document.
pub fn encode(
    entries: &BTreeMap<EntryId, Entry>,
    saved_at: DateTime<Utc>,
) -> Result<String, StorageError> {
    let doc = StoreDocumentRef {
        entries,
        last_saved: saved_at,
        total_entries: entries.len(),
    };
    serde_json::to_string_pretty(&doc).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decodes a document, checking that keys match the embedded entry ids.
pub fn decode(raw: &str) -> Result<StoreDocument, StorageError> {
    let doc: StoreDocument = serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
        message: e.to_string(),
    })?;

    if let Some((key, entry)) = doc.entries.iter().find(|(key, entry)| **key != entry.entry_id) {
        return Err(StorageError::Corrupt {
            message: format!("key {key} holds entry {}", entry.entry_id),
        });
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_round_trip() {
        let entries = BTreeMap::new();
        let now = Utc::now();
        let raw = encode(&entries, now).unwrap();
        let doc = decode(&raw).unwrap();
        assert!(doc.entries.is_empty());
        assert_eq!(doc.total_entries, 0);
        assert_eq!(doc.last_saved, now);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode("{ not json").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_decode_rejects_mismatched_key() {
        let raw = r#"{
            "entries": {
                "ZP-aaaaaaaaaaaa": {
                    "entry_id": "ZP-bbbbbbbbbbbb",
                    "memory_type": "FACT",
                    "content": "x",
                    "tags": [],
                    "source": "s",
                    "author_agent": "a",
                    "confidence": "LOW",
                    "evidence_count": 1,
                    "limitations": null,
                    "created_at": "2026-01-01T00:00:00Z",
                    "updated_at": "2026-01-01T00:00:00Z",
                    "version": 1
                }
            },
            "last_saved": "2026-01-01T00:00:00Z",
            "total_entries": 1
        }"#;
        let err = decode(raw).unwrap_err();
        assert!(format!("{err}").contains("ZP-aaaaaaaaaaaa"));
    }
}
