//! Reversibility classification.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::request::{ActionContext, MODIFIES_DATA};
use crate::error::ValidationError;

/// Whether an action's effects can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reversibility {
    FullyReversible,
    PartiallyReversible,
    Irreversible,
}

impl Reversibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullyReversible => "fully_reversible",
            Self::PartiallyReversible => "partially_reversible",
            Self::Irreversible => "irreversible",
        }
    }
}

impl fmt::Display for Reversibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive substring matcher over the irreversible-marker
/// vocabulary, compiled once per twin.
#[derive(Debug, Clone)]
pub(crate) struct MarkerMatcher {
    pattern: Regex,
}

impl MarkerMatcher {
    pub(crate) fn new(markers: &[String]) -> Result<Self, ValidationError> {
        let alternatives: Vec<String> = markers
            .iter()
            .map(|marker| regex::escape(marker.trim()))
            .collect();
        let pattern = Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))).map_err(|e| {
            ValidationError::InvalidMarkers {
                reason: e.to_string(),
            }
        })?;
        Ok(Self { pattern })
    }

    pub(crate) fn is_match(&self, action: &str) -> bool {
        self.pattern.is_match(action)
    }

    /// A marker match outranks the data-modification flag.
    pub(crate) fn classify(&self, action: &str, context: &ActionContext) -> Reversibility {
        if self.is_match(action) {
            Reversibility::Irreversible
        } else if context.is_set(MODIFIES_DATA) {
            Reversibility::PartiallyReversible
        } else {
            Reversibility::FullyReversible
        }
    }
}
