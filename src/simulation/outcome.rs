//! Outcome prediction from episodic precedent.

use serde::{Deserialize, Serialize};

use super::request::EpisodeRecord;

/// Justification used when no episode mentions the action.
pub const NO_PRECEDENT: &str = "no historical precedent";

/// Predicted outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// Whether an outcome is good or bad for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Positive,
    Negative,
}

/// One predicted outcome and its probability in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedOutcome {
    pub outcome: OutcomeKind,
    pub probability: f64,
    pub impact: Impact,
    pub based_on: String,
}

impl PredictedOutcome {
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        matches!(self.impact, Impact::Negative)
    }
}

/// Round to two decimals.
pub(crate) fn round2(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}

/// Predict success and failure probabilities for `action`.
///
/// Precedents are episodes whose serialized form mentions the action,
/// case-insensitively. The success rate over the precedents sets both
/// probabilities; with no precedent both are 0.5.
pub(crate) fn predict(action: &str, history: &[EpisodeRecord]) -> Vec<PredictedOutcome> {
    let needle = action.to_lowercase();
    let (total, successes) = history
        .iter()
        .filter(|episode| episode.mentions(&needle))
        .fold((0usize, 0usize), |(total, ok), episode| {
            (total + 1, ok + usize::from(episode.is_success()))
        });

    let (success_rate, based_on) = if total == 0 {
        (0.5, NO_PRECEDENT.to_string())
    } else {
        #[allow(clippy::cast_precision_loss)]
        let rate = successes as f64 / total as f64;
        (rate, format!("{total} similar historical actions"))
    };

    vec![
        PredictedOutcome {
            outcome: OutcomeKind::Success,
            probability: round2(success_rate),
            impact: Impact::Positive,
            based_on: based_on.clone(),
        },
        PredictedOutcome {
            outcome: OutcomeKind::Failure,
            probability: round2(1.0 - success_rate),
            impact: Impact::Negative,
            based_on,
        },
    ]
}
