//! Access ledger.
//!
//! Writes, reads, searches and governance changes each append one row.
//! Rows are never edited or removed; the ledger lives in memory for the
//! lifetime of the store and is not part of the persisted document.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel target for operations that touch many entries (search).
pub const MULTI_TARGET: &str = "MULTI";

/// What kind of access a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerAction {
    Write,
    Read,
    ReadMiss,
    Search,
    Review,
    Reaffirm,
    Promote,
}

impl LedgerAction {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Write => "WRITE",
            Self::Read => "READ",
            Self::ReadMiss => "READ_MISS",
            Self::Search => "SEARCH",
            Self::Review => "REVIEW",
            Self::Reaffirm => "REAFFIRM",
            Self::Promote => "PROMOTE",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the access ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub action: LedgerAction,
    /// Target entry id, or [`MULTI_TARGET`].
    pub entry_id: String,
    pub agent_id: String,
    #[serde(default)]
    pub detail: String,
}

/// Append-only access log.
#[derive(Debug, Clone, Default)]
pub struct AccessLedger {
    rows: Vec<LedgerEntry>,
}

impl AccessLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        action: LedgerAction,
        entry_id: impl Into<String>,
        agent_id: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.rows.push(LedgerEntry {
            timestamp,
            action,
            entry_id: entry_id.into(),
            agent_id: agent_id.into(),
            detail: detail.into(),
        });
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, oldest first.
    #[must_use]
    pub fn rows(&self) -> &[LedgerEntry] {
        &self.rows
    }

    /// Rows of a single action kind.
    pub fn by_action(&self, action: LedgerAction) -> impl Iterator<Item = &LedgerEntry> {
        self.rows.iter().filter(move |row| row.action == action)
    }

    /// Most recent row.
    #[must_use]
    pub fn last(&self) -> Option<&LedgerEntry> {
        self.rows.last()
    }
}
