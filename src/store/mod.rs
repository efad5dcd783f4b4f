//! The Zero Point governed entry store.
//!
//! Rules:
//! - Every write passes the governance gates in [`write`]; refusals are data.
//! - Every operation is recorded in the access ledger.
//! - Entries older than the staleness window are flagged when read.
//! - Content is append-only: a changed claim is a new entry.
//!
//! All state sits behind one mutex and each mutating call persists the whole
//! document before returning, so calls on one store are serialized. The file
//! backend additionally holds an OS lock so a second process cannot open the
//! same document.

pub mod search;
pub mod write;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::entry::{Entry, EntryId, MemoryKind, Provenance};
use crate::error::ZeroPointResult;
use crate::ledger::{AccessLedger, LedgerAction, LedgerEntry, MULTI_TARGET};
use crate::storage::{EntryBackend, InMemoryBackend, StorageError};
use crate::time::{system_clock, SharedClock};

pub use search::SearchQuery;
pub use write::{Rejection, RejectionRule, WriteOutcome, WriteRequest, AUTO_CAP_NOTE};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Fresh provenance re-affirming an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaffirmation {
    pub source: String,
    pub author: String,
    pub evidence_count: u32,
}

impl Reaffirmation {
    #[must_use]
    pub fn new(source: impl Into<String>, author: impl Into<String>, evidence_count: u32) -> Self {
        Self {
            source: source.into(),
            author: author.into(),
            evidence_count,
        }
    }
}

/// Result of [`ZeroPoint::reaffirm`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReaffirmOutcome {
    Reaffirmed { entry_id: EntryId, version: u64 },
    Rejected(Rejection),
    NotFound,
}

/// Result of [`ZeroPoint::promote_to_canon`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionOutcome {
    Promoted { entry_id: EntryId },
    Refused { reason: String },
    NotFound,
}

/// Aggregate health counts. Computing them is not logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_entries: usize,
    pub reviewed: usize,
    pub unreviewed: usize,
    pub stale: usize,
    pub promoted: usize,
    pub by_type: BTreeMap<MemoryKind, usize>,
    pub access_log_size: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: BTreeMap<EntryId, Entry>,
    ledger: AccessLedger,
}

/// The governed shared-memory substrate.
#[derive(Debug)]
pub struct ZeroPoint {
    config: StoreConfig,
    clock: SharedClock,
    backend: Arc<dyn EntryBackend>,
    state: Mutex<StoreState>,
}

impl ZeroPoint {
    /// Open a store over `backend`, loading whatever it last persisted.
    ///
    /// # Errors
    /// - invalid `config`
    /// - a corrupt or unreadable document (the store never starts empty
    ///   over data it failed to read)
    pub fn open(backend: Arc<dyn EntryBackend>, config: StoreConfig) -> ZeroPointResult<Self> {
        Self::open_with_clock(backend, config, system_clock())
    }

    /// Like [`ZeroPoint::open`], with an explicit clock.
    pub fn open_with_clock(
        backend: Arc<dyn EntryBackend>,
        config: StoreConfig,
        clock: SharedClock,
    ) -> ZeroPointResult<Self> {
        let config = config.validate()?;
        let entries = backend.load()?.map(|doc| doc.entries).unwrap_or_default();
        info!(backend = backend.name(), entries = entries.len(), "zero point store opened");

        Ok(Self {
            config,
            clock,
            backend,
            state: Mutex::new(StoreState {
                entries,
                ledger: AccessLedger::new(),
            }),
        })
    }

    /// An empty store over a fresh in-memory backend with default config.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            config: StoreConfig::default(),
            clock: system_clock(),
            backend: Arc::new(InMemoryBackend::new()),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Open (or create) a locked JSON document at `path`.
    #[cfg(feature = "persistent")]
    pub fn open_file(path: impl AsRef<std::path::Path>, config: StoreConfig) -> ZeroPointResult<Self> {
        let backend = crate::storage::JsonFileBackend::open(path, config.sync_on_write)?;
        Self::open(Arc::new(backend), config)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn state(&self) -> ZeroPointResult<MutexGuard<'_, StoreState>> {
        Ok(self.state.lock().map_err(|_| lock_err("store.state"))?)
    }

    /// Replace (or insert) one entry and persist; on failure the previous
    /// in-memory value is restored.
    fn commit(&self, state: &mut StoreState, updated: Entry, now: DateTime<Utc>) -> ZeroPointResult<()> {
        let id = updated.entry_id.clone();
        let previous = state.entries.insert(id.clone(), updated);
        if let Err(err) = self.backend.persist(&state.entries, now) {
            warn!(entry_id = %id, error = %err, "persist failed; change rolled back");
            match previous {
                Some(prev) => {
                    state.entries.insert(id, prev);
                }
                None => {
                    state.entries.remove(&id);
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Governed write.
    ///
    /// Gate refusals come back as `Ok(WriteOutcome::Rejected)`; `Err` means
    /// the accepted entry could not be persisted (and was not kept).
    pub fn write(&self, request: WriteRequest) -> ZeroPointResult<WriteOutcome> {
        let now = self.clock.now();

        let admitted = match write::admit(&request) {
            Ok(admitted) => admitted,
            Err(rejection) => {
                warn!(rule = %rejection.rule, author = %request.author, "write rejected");
                return Ok(WriteOutcome::Rejected(rejection));
            }
        };

        let entry_id = EntryId::derive(
            &self.config.id_prefix,
            self.config.id_hash_len,
            &request.content,
            &request.author,
            now,
        );

        let mut state = self.state()?;
        if state.entries.contains_key(&entry_id) {
            let rejection = Rejection::id_collision(&entry_id);
            warn!(rule = %rejection.rule, entry_id = %entry_id, "write rejected");
            return Ok(WriteOutcome::Rejected(rejection));
        }

        let entry = Entry::new(
            entry_id.clone(),
            request.kind,
            request.content,
            request.tags,
            Provenance::new(
                request.source,
                request.author.clone(),
                admitted.confidence,
                request.evidence_count,
                admitted.limitations,
            ),
            now,
        );
        self.commit(&mut state, entry, now)?;

        let mut detail = format!("type={}, confidence={}", request.kind, admitted.confidence);
        if request.emergency {
            detail.push_str(", EMERGENCY=true");
        }
        state
            .ledger
            .record(now, LedgerAction::Write, entry_id.as_str(), &request.author, detail);
        debug!(entry_id = %entry_id, confidence = %admitted.confidence, emergency = request.emergency, "entry written");

        Ok(WriteOutcome::Accepted {
            entry_id,
            effective_confidence: admitted.confidence,
            emergency: request.emergency,
            needs_review: true,
        })
    }

    /// Logged read. Updates read statistics and the staleness flag.
    pub fn read(&self, entry_id: &EntryId, requester: &str) -> ZeroPointResult<Option<Entry>> {
        let now = self.clock.now();
        let mut state = self.state()?;

        let Some(current) = state.entries.get(entry_id) else {
            state
                .ledger
                .record(now, LedgerAction::ReadMiss, entry_id.as_str(), requester, "");
            return Ok(None);
        };

        let was_stale = current.governance.flagged_stale;
        let mut updated = current.clone();
        updated.record_read(requester, now, self.config.stale_after);
        self.commit(&mut state, updated.clone(), now)?;

        if !was_stale && updated.governance.flagged_stale {
            warn!(entry_id = %entry_id, updated_at = %updated.updated_at, "entry flagged stale");
        }
        state
            .ledger
            .record(now, LedgerAction::Read, entry_id.as_str(), requester, "");
        Ok(Some(updated))
    }

    /// Filtered, ranked search. Always logged, even when empty.
    pub fn search(&self, query: &SearchQuery, requester: &str) -> ZeroPointResult<Vec<Entry>> {
        let now = self.clock.now();
        let mut state = self.state()?;

        let mut results: Vec<Entry> = state
            .entries
            .values()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        results.sort_by(search::rank);

        let detail = format!("{}, results={}", query.describe(), results.len());
        state
            .ledger
            .record(now, LedgerAction::Search, MULTI_TARGET, requester, detail);
        Ok(results)
    }

    /// Record a review. Returns `false` for an unknown id.
    pub fn mark_reviewed(&self, entry_id: &EntryId, reviewer: &str) -> ZeroPointResult<bool> {
        let now = self.clock.now();
        let mut state = self.state()?;

        let Some(current) = state.entries.get(entry_id) else {
            return Ok(false);
        };
        let mut updated = current.clone();
        updated.governance.reviewed = true;
        updated.governance.reviewer_agent = Some(reviewer.to_string());
        updated.updated_at = now;
        self.commit(&mut state, updated, now)?;

        state
            .ledger
            .record(now, LedgerAction::Review, entry_id.as_str(), reviewer, "");
        Ok(true)
    }

    /// Re-affirm an existing claim with fresh provenance.
    ///
    /// This is the only path that clears `flagged_stale`. The claim itself
    /// (content, kind, tags, original provenance) is untouched; the version
    /// is bumped and the evidence count grows to the larger of the two.
    pub fn reaffirm(&self, entry_id: &EntryId, reaffirmation: Reaffirmation) -> ZeroPointResult<ReaffirmOutcome> {
        let now = self.clock.now();
        let mut state = self.state()?;

        let Some(current) = state.entries.get(entry_id) else {
            return Ok(ReaffirmOutcome::NotFound);
        };
        if let Err(rejection) = write::check_provenance(
            &reaffirmation.source,
            &reaffirmation.author,
            reaffirmation.evidence_count,
        ) {
            warn!(rule = %rejection.rule, entry_id = %entry_id, "re-affirmation rejected");
            return Ok(ReaffirmOutcome::Rejected(rejection));
        }

        let was_stale = current.governance.flagged_stale;
        let mut updated = current.clone();
        updated.version += 1;
        updated.updated_at = now;
        updated.governance.flagged_stale = false;
        updated.provenance.evidence_count = updated
            .provenance
            .evidence_count
            .max(reaffirmation.evidence_count);
        let version = updated.version;
        self.commit(&mut state, updated, now)?;

        let detail = format!(
            "source={}, evidence={}, was_stale={was_stale}",
            reaffirmation.source, reaffirmation.evidence_count
        );
        state.ledger.record(
            now,
            LedgerAction::Reaffirm,
            entry_id.as_str(),
            &reaffirmation.author,
            detail,
        );
        Ok(ReaffirmOutcome::Reaffirmed {
            entry_id: entry_id.clone(),
            version,
        })
    }

    /// Promote a reviewed, fresh entry into the canon.
    pub fn promote_to_canon(&self, entry_id: &EntryId, promoter: &str) -> ZeroPointResult<PromotionOutcome> {
        let now = self.clock.now();
        let mut state = self.state()?;

        let Some(current) = state.entries.get(entry_id) else {
            return Ok(PromotionOutcome::NotFound);
        };

        let refusal = if !current.governance.reviewed {
            Some("entry has not been reviewed")
        } else if current.governance.flagged_stale {
            Some("entry is flagged stale; re-affirm it first")
        } else {
            None
        };
        if let Some(reason) = refusal {
            state.ledger.record(
                now,
                LedgerAction::Promote,
                entry_id.as_str(),
                promoter,
                format!("refused: {reason}"),
            );
            warn!(entry_id = %entry_id, reason, "promotion refused");
            return Ok(PromotionOutcome::Refused {
                reason: reason.to_string(),
            });
        }

        if current.governance.promoted_to_canon {
            state.ledger.record(
                now,
                LedgerAction::Promote,
                entry_id.as_str(),
                promoter,
                "already promoted",
            );
            return Ok(PromotionOutcome::Promoted {
                entry_id: entry_id.clone(),
            });
        }

        let mut updated = current.clone();
        updated.governance.promoted_to_canon = true;
        self.commit(&mut state, updated, now)?;

        state
            .ledger
            .record(now, LedgerAction::Promote, entry_id.as_str(), promoter, "promoted");
        info!(entry_id = %entry_id, promoter, "entry promoted to canon");
        Ok(PromotionOutcome::Promoted {
            entry_id: entry_id.clone(),
        })
    }

    /// Aggregate counts.
    pub fn stats(&self) -> ZeroPointResult<StoreStats> {
        let state = self.state()?;
        let entries = state.entries.values();

        let mut stats = StoreStats {
            total_entries: state.entries.len(),
            reviewed: 0,
            unreviewed: 0,
            stale: 0,
            promoted: 0,
            by_type: BTreeMap::new(),
            access_log_size: state.ledger.len(),
        };
        for entry in entries {
            if entry.governance.reviewed {
                stats.reviewed += 1;
            }
            if entry.governance.flagged_stale {
                stats.stale += 1;
            }
            if entry.governance.promoted_to_canon {
                stats.promoted += 1;
            }
            *stats.by_type.entry(entry.memory_type).or_default() += 1;
        }
        stats.unreviewed = stats.total_entries - stats.reviewed;
        Ok(stats)
    }

    /// Unlogged snapshot of one entry, for maintenance tooling.
    pub fn get(&self, entry_id: &EntryId) -> ZeroPointResult<Option<Entry>> {
        Ok(self.state()?.entries.get(entry_id).cloned())
    }

    /// Number of entries.
    pub fn len(&self) -> ZeroPointResult<usize> {
        Ok(self.state()?.entries.len())
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> ZeroPointResult<bool> {
        Ok(self.state()?.entries.is_empty())
    }

    /// Snapshot of the access ledger, oldest row first.
    pub fn ledger(&self) -> ZeroPointResult<Vec<LedgerEntry>> {
        Ok(self.state()?.ledger.rows().to_vec())
    }
}
