//! Confidence tiers for substrate entries and simulations.
//!
//! Confidence in Zero Point is a coarse, ordered tier rather than a float.
//! The ordinal (`HIGH=3, MEDIUM=2, LOW=1, UNVERIFIED=0`) is fixed: search
//! ranking and `min_confidence` filtering both compare on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How strongly a claim (or a simulation) is backed by evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    /// Multiple diverse sources, tested.
    High,
    /// Multiple sources, or a single high-quality one.
    Medium,
    /// Single source, untested.
    Low,
    /// No source validation at all.
    Unverified,
}

impl ConfidenceLevel {
    /// All tiers, strongest first.
    pub const ALL: [Self; 4] = [Self::High, Self::Medium, Self::Low, Self::Unverified];

    /// Fixed ranking ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::Unverified => 0,
        }
    }

    /// Returns true if this tier is at least `other`.
    #[must_use]
    pub const fn at_least(self, other: Self) -> bool {
        self.ordinal() >= other.ordinal()
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unverified => "UNVERIFIED",
        }
    }
}

impl PartialOrd for ConfidenceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfidenceLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "UNVERIFIED" => Ok(Self::Unverified),
            _ => Err(ValidationError::UnknownVariant {
                kind: "confidence level",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_are_fixed() {
        assert_eq!(ConfidenceLevel::High.ordinal(), 3);
        assert_eq!(ConfidenceLevel::Medium.ordinal(), 2);
        assert_eq!(ConfidenceLevel::Low.ordinal(), 1);
        assert_eq!(ConfidenceLevel::Unverified.ordinal(), 0);
    }

    #[test]
    fn test_ordering_follows_ordinal() {
        let mut tiers = vec![
            ConfidenceLevel::Low,
            ConfidenceLevel::High,
            ConfidenceLevel::Unverified,
            ConfidenceLevel::Medium,
        ];
        tiers.sort();
        assert_eq!(
            tiers,
            vec![
                ConfidenceLevel::Unverified,
                ConfidenceLevel::Low,
                ConfidenceLevel::Medium,
                ConfidenceLevel::High,
            ]
        );
        assert!(ConfidenceLevel::Medium.at_least(ConfidenceLevel::Low));
        assert!(!ConfidenceLevel::Low.at_least(ConfidenceLevel::Medium));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("high".parse::<ConfidenceLevel>().unwrap(), ConfidenceLevel::High);
        assert_eq!(" Medium ".parse::<ConfidenceLevel>().unwrap(), ConfidenceLevel::Medium);
        assert!("certain".parse::<ConfidenceLevel>().is_err());
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&ConfidenceLevel::Unverified).unwrap();
        assert_eq!(json, "\"UNVERIFIED\"");
        let back: ConfidenceLevel = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(back, ConfidenceLevel::Low);
    }
}
