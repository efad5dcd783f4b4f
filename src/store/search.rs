//! Search filters and result ranking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::entry::{Entry, MemoryKind};

/// Filters for a substrate search. Every supplied filter must match.
///
/// Tags match on *any* of the listed tags; an empty tag list does not
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub kind: Option<MemoryKind>,
    #[serde(default)]
    pub min_confidence: Option<ConfidenceLevel>,
}

impl SearchQuery {
    /// A query that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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
    pub fn kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn min_confidence(mut self, min: ConfidenceLevel) -> Self {
        self.min_confidence = Some(min);
        self
    }

    /// Returns true if `entry` passes every supplied filter.
    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| entry.has_tag(t)) {
            return false;
        }
        if self.kind.is_some_and(|kind| entry.memory_type != kind) {
            return false;
        }
        if self
            .min_confidence
            .is_some_and(|min| !entry.confidence().at_least(min))
        {
            return false;
        }
        true
    }

    /// One-line summary recorded in the ledger.
    #[must_use]
    pub fn describe(&self) -> String {
        let kind = self.kind.map_or_else(|| "any".to_string(), |k| k.to_string());
        let min = self
            .min_confidence
            .map_or_else(|| "any".to_string(), |c| c.to_string());
        format!("tags={:?}, type={kind}, min_confidence={min}", self.tags)
    }
}

/// Ranking: confidence tier descending, then `updated_at` descending.
pub(crate) fn rank(a: &Entry, b: &Entry) -> Ordering {
    b.confidence()
        .cmp(&a.confidence())
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}
