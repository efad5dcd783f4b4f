//! Substrate entries.
//!
//! An [`Entry`] is a provenance-tagged claim held by the Zero Point store.
//! Entries are only ever created by the store's governed write path, so the
//! struct is `#[non_exhaustive]`: callers can read every field but cannot
//! build one with empty provenance.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::error::ValidationError;

/// Stable identifier of a substrate entry (e.g. `ZP-3fa2c1d09b7e`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wraps an existing identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an identifier from the claim, its author and the write time.
    ///
    /// The id is `prefix` followed by the first `hash_len` hex characters of
    /// the BLAKE3 digest of `content:author:timestamp`. Identical inputs give
    /// identical ids; the store rejects a write whose id already exists.
    #[must_use]
    pub fn derive(
        prefix: &str,
        hash_len: usize,
        content: &str,
        author: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(content.as_bytes());
        hasher.update(b":");
        hasher.update(author.as_bytes());
        hasher.update(b":");
        hasher.update(at.to_rfc3339().as_bytes());
        let hex = hasher.finalize().to_hex();
        let len = hash_len.min(hex.len());
        Self(format!("{prefix}{}", &hex[..len]))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What kind of knowledge an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryKind {
    /// Reusable learned pattern.
    Pattern,
    /// Transferable capability.
    Skill,
    /// Verified information.
    Fact,
    /// Documented failure mode.
    Failure,
    /// Cross-domain connection.
    Insight,
    /// Pending idea awaiting review.
    Proposal,
}

impl MemoryKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Pattern,
        Self::Skill,
        Self::Fact,
        Self::Failure,
        Self::Insight,
        Self::Proposal,
    ];

    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "PATTERN",
            Self::Skill => "SKILL",
            Self::Fact => "FACT",
            Self::Failure => "FAILURE",
            Self::Insight => "INSIGHT",
            Self::Proposal => "PROPOSAL",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "memory kind",
                value: s.to_string(),
            })
    }
}

/// Mandatory provenance attached to every accepted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Provenance {
    /// Where the claim came from (document, run, URL, ...).
    pub source: String,
    /// Agent that wrote the claim.
    pub author_agent: String,
    /// Effective confidence after governance capping.
    pub confidence: ConfidenceLevel,
    /// Number of independent pieces of evidence.
    pub evidence_count: u32,
    /// Known limitations, including automatic cap notes.
    #[serde(default)]
    pub limitations: Option<String>,
}

/// Read statistics, updated on every successful read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ReadStats {
    /// Number of logged reads.
    #[serde(default)]
    pub read_count: u64,
    /// Last agent to read the entry.
    #[serde(default)]
    pub last_read_by: Option<String>,
    /// Time of the last read.
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Governance flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct GovernanceFlags {
    /// A reviewer has looked at this entry.
    #[serde(default)]
    pub reviewed: bool,
    /// Who reviewed it.
    #[serde(default)]
    pub reviewer_agent: Option<String>,
    /// Promoted into the canon after review.
    #[serde(default)]
    pub promoted_to_canon: bool,
    /// A read found the entry older than the staleness window.
    #[serde(default)]
    pub flagged_stale: bool,
}

/// A single entry in the Zero Point substrate.
///
/// Serialized flat, so the durable document reads
/// `{"entry_id": ..., "memory_type": ..., "source": ..., "read_count": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Entry {
    /// Unique identifier.
    pub entry_id: EntryId,
    /// Memory kind.
    pub memory_type: MemoryKind,
    /// Free-text claim. Never rewritten after creation.
    pub content: String,
    /// Tags used by search.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Provenance triple plus evidence.
    #[serde(flatten)]
    pub provenance: Provenance,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last governed update (write, review, re-affirmation).
    pub updated_at: DateTime<Utc>,
    /// Starts at 1; bumped by re-affirmation only.
    pub version: u64,
    /// Read statistics.
    #[serde(flatten)]
    pub reads: ReadStats,
    /// Governance flags.
    #[serde(flatten)]
    pub governance: GovernanceFlags,
}

impl Entry {
    pub(crate) fn new(
        entry_id: EntryId,
        memory_type: MemoryKind,
        content: String,
        tags: Vec<String>,
        provenance: Provenance,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id,
            memory_type,
            content,
            tags,
            provenance,
            created_at: now,
            updated_at: now,
            version: 1,
            reads: ReadStats::default(),
            governance: GovernanceFlags::default(),
        }
    }

    /// Effective confidence tier.
    #[must_use]
    pub const fn confidence(&self) -> ConfidenceLevel {
        self.provenance.confidence
    }

    /// Returns true if the entry carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true if more than `window` has passed since the last update.
    #[must_use]
    pub fn is_older_than(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.updated_at > window
    }

    pub(crate) fn record_read(&mut self, reader: &str, now: DateTime<Utc>, stale_after: Duration) {
        self.reads.read_count += 1;
        self.reads.last_read_by = Some(reader.to_string());
        self.reads.last_read_at = Some(now);
        if self.is_older_than(now, stale_after) {
            self.governance.flagged_stale = true;
        }
    }
}

impl Provenance {
    pub(crate) fn new(
        source: String,
        author_agent: String,
        confidence: ConfidenceLevel,
        evidence_count: u32,
        limitations: Option<String>,
    ) -> Self {
        Self {
            source,
            author_agent,
            confidence,
            evidence_count,
            limitations,
        }
    }
}
