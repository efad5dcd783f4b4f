//! Governed write requests and their gates.
//!
//! Gates run in a fixed order and the first failure wins:
//! 1. provenance: `source` and `author` must be non-blank
//! 2. evidence: `evidence_count >= 1`
//! 3. single-source cap: one piece of evidence caps HIGH/MEDIUM to LOW
//! 4. id collision (checked by the store against its current entries)
//!
//! Emergency writes run every gate. The only difference is a ledger flag;
//! the entry still lands unreviewed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::entry::{EntryId, MemoryKind};

/// Note appended to `limitations` when the single-source cap fires.
pub const AUTO_CAP_NOTE: &str = "[AUTO-CAPPED: single source]";

/// A request to add a claim to the substrate.
///
/// # Example
/// ```
/// use zeropoint::{ConfidenceLevel, MemoryKind, WriteRequest};
///
/// let request = WriteRequest::new("Governance before intelligence", MemoryKind::Pattern)
///     .tags(["governance", "principle"])
///     .source("Canon v0.3")
///     .author("RESEARCHER")
///     .confidence(ConfidenceLevel::High)
///     .evidence(3);
/// assert_eq!(request.evidence_count, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub content: String,
    pub kind: MemoryKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub author: String,
    pub confidence: ConfidenceLevel,
    pub evidence_count: u32,
    #[serde(default)]
    pub limitations: Option<String>,
    #[serde(default)]
    pub emergency: bool,
}

impl WriteRequest {
    /// Starts a request with no provenance, `UNVERIFIED` confidence and one
    /// piece of evidence.
    #[must_use]
    pub fn new(content: impl Into<String>, kind: MemoryKind) -> Self {
        Self {
            content: content.into(),
            kind,
            tags: Vec::new(),
            source: String::new(),
            author: String::new(),
            confidence: ConfidenceLevel::Unverified,
            evidence_count: 1,
            limitations: None,
            emergency: false,
        }
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    #[must_use]
    pub fn confidence(mut self, confidence: ConfidenceLevel) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn evidence(mut self, count: u32) -> Self {
        self.evidence_count = count;
        self
    }

    #[must_use]
    pub fn limitations(mut self, note: impl Into<String>) -> Self {
        self.limitations = Some(note.into());
        self
    }

    /// Flag the write as an emergency broadcast.
    #[must_use]
    pub fn emergency(mut self, emergency: bool) -> Self {
        self.emergency = emergency;
        self
    }
}

/// Which governance gate refused a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionRule {
    /// Missing source or author.
    NoProvenance,
    /// Evidence count below one.
    NoEvidence,
    /// The derived id already names an entry.
    IdCollision,
}

impl RejectionRule {
    /// Stable rule identifier.
    #[must_use]
    pub const fn rule_id(self) -> &'static str {
        match self {
            Self::NoProvenance => "no_provenance",
            Self::NoEvidence => "no_evidence",
            Self::IdCollision => "id_collision",
        }
    }
}

impl fmt::Display for RejectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_id())
    }
}

/// A structured refusal. Never an error: the caller decides whether to fix
/// the provenance and retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub rule: RejectionRule,
    pub reason: String,
}

impl Rejection {
    pub(crate) fn no_provenance() -> Self {
        Self {
            rule: RejectionRule::NoProvenance,
            reason: "No provenance: a claim needs both a source and an author agent.".to_string(),
        }
    }

    pub(crate) fn no_evidence() -> Self {
        Self {
            rule: RejectionRule::NoEvidence,
            reason: "No evidence: unsubstantiated claims cannot be written.".to_string(),
        }
    }

    pub(crate) fn id_collision(id: &EntryId) -> Self {
        Self {
            rule: RejectionRule::IdCollision,
            reason: format!("Entry {id} already exists for this claim, author and instant."),
        }
    }
}

/// Result of a governed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteOutcome {
    Accepted {
        entry_id: EntryId,
        /// Confidence after the single-source cap.
        effective_confidence: ConfidenceLevel,
        emergency: bool,
        /// Always true: accepted entries start unreviewed.
        needs_review: bool,
    },
    Rejected(Rejection),
}

impl WriteOutcome {
    /// Returns true for `Accepted`.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The new entry id, if accepted.
    #[must_use]
    pub fn entry_id(&self) -> Option<&EntryId> {
        match self {
            Self::Accepted { entry_id, .. } => Some(entry_id),
            Self::Rejected(_) => None,
        }
    }

    /// The rejection, if refused.
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Provenance that passed gates 1–3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Admitted {
    pub confidence: ConfidenceLevel,
    pub limitations: Option<String>,
}

/// Gates 1 and 2, shared by writes and re-affirmations.
pub(crate) fn check_provenance(source: &str, author: &str, evidence_count: u32) -> Result<(), Rejection> {
    if source.trim().is_empty() || author.trim().is_empty() {
        return Err(Rejection::no_provenance());
    }
    if evidence_count < 1 {
        return Err(Rejection::no_evidence());
    }
    Ok(())
}

/// Gates 1–3 for a write request.
pub(crate) fn admit(request: &WriteRequest) -> Result<Admitted, Rejection> {
    check_provenance(&request.source, &request.author, request.evidence_count)?;

    let capped = request.evidence_count == 1
        && matches!(request.confidence, ConfidenceLevel::High | ConfidenceLevel::Medium);
    if !capped {
        return Ok(Admitted {
            confidence: request.confidence,
            limitations: request.limitations.clone(),
        });
    }

    let limitations = match request.limitations.as_deref() {
        Some(note) if !note.trim().is_empty() => format!("{note} {AUTO_CAP_NOTE}"),
        _ => AUTO_CAP_NOTE.to_string(),
    };
    Ok(Admitted {
        confidence: ConfidenceLevel::Low,
        limitations: Some(limitations),
    })
}
