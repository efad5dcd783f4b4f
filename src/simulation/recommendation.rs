//! Simulation confidence and the final recommendation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::request::RiskTier;
use super::reversibility::Reversibility;
use super::stress::STRESS_BATTERY;
use crate::confidence::ConfidenceLevel;

/// Overall verdict on the simulated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationResult {
    Safe,
    Caution,
    Dangerous,
    /// Reserved for callers that cannot simulate at all; the pipeline never
    /// produces it.
    Unknown,
}

impl SimulationResult {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Caution => "CAUTION",
            Self::Dangerous => "DANGEROUS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Proceed,
    ProceedWithMonitoring,
    Escalate,
    Block,
}

impl Recommendation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proceed => "PROCEED",
            Self::ProceedWithMonitoring => "PROCEED_WITH_MONITORING",
            Self::Escalate => "ESCALATE",
            Self::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much evidence backs the simulation itself.
///
/// Only `HIGH`, `MEDIUM` and `LOW` are produced.
pub(crate) fn score_confidence(history_len: usize, substrate_len: usize, outcome_count: usize) -> ConfidenceLevel {
    let history_score = match history_len {
        0 => 0,
        1..=3 => 1,
        4..=10 => 2,
        _ => 3,
    };
    let substrate_score = match substrate_len {
        0 => 0,
        1..=5 => 1,
        _ => 2,
    };
    let breadth_score = u8::from(outcome_count >= 3);

    match history_score + substrate_score + breadth_score {
        5.. => ConfidenceLevel::High,
        3..=4 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::Low,
    }
}

/// Inputs to the decision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Evidence<'a> {
    pub stress_failures: usize,
    pub reversibility: Reversibility,
    pub confidence: ConfidenceLevel,
    pub risk_tier: &'a RiskTier,
    pub dangerous_effects: usize,
}

/// Result, recommendation and (when not proceeding cleanly) the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub result: SimulationResult,
    pub recommendation: Recommendation,
    pub escalation_reason: Option<String>,
}

/// First matching rule wins:
/// 1. three or more stress failures, or irreversible with LOW confidence: BLOCK
/// 2. two stress failures, or irreversible at HIGH risk: ESCALATE
/// 3. any stress failure or dangerous side effect: PROCEED_WITH_MONITORING
/// 4. otherwise PROCEED
pub(crate) fn decide(evidence: &Evidence<'_>) -> Verdict {
    let total = STRESS_BATTERY.len();
    let failures = evidence.stress_failures;
    let irreversible = match evidence.reversibility {
        Reversibility::Irreversible => true,
        Reversibility::PartiallyReversible | Reversibility::FullyReversible => false,
    };
    let low_confidence = match evidence.confidence {
        ConfidenceLevel::Low | ConfidenceLevel::Unverified => true,
        ConfidenceLevel::High | ConfidenceLevel::Medium => false,
    };
    let high_risk = match evidence.risk_tier {
        RiskTier::High => true,
        RiskTier::Low | RiskTier::Medium | RiskTier::Other(_) => false,
    };

    if failures >= 3 || (irreversible && low_confidence) {
        return Verdict {
            result: SimulationResult::Dangerous,
            recommendation: Recommendation::Block,
            escalation_reason: Some(format!(
                "Failed {failures}/{total} stress tests. Irreversible={irreversible}. Confidence={}.",
                evidence.confidence
            )),
        };
    }
    if failures >= 2 || (irreversible && high_risk) {
        return Verdict {
            result: SimulationResult::Caution,
            recommendation: Recommendation::Escalate,
            escalation_reason: Some(format!(
                "Failed {failures}/{total} stress tests. Risk={}. Requires human review.",
                evidence.risk_tier
            )),
        };
    }
    if failures >= 1 || evidence.dangerous_effects > 0 {
        return Verdict {
            result: SimulationResult::Caution,
            recommendation: Recommendation::ProceedWithMonitoring,
            escalation_reason: Some(format!(
                "Minor concerns: {failures} stress failures, {} side effects.",
                evidence.dangerous_effects
            )),
        };
    }
    Verdict {
        result: SimulationResult::Safe,
        recommendation: Recommendation::Proceed,
        escalation_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(failures: usize, reversibility: Reversibility, confidence: ConfidenceLevel, risk: &RiskTier) -> Evidence<'_> {
        Evidence {
            stress_failures: failures,
            reversibility,
            confidence,
            risk_tier: risk,
            dangerous_effects: 0,
        }
    }

    #[test]
    fn test_confidence_score_thresholds() {
        assert_eq!(score_confidence(0, 0, 2), ConfidenceLevel::Low);
        assert_eq!(score_confidence(10, 0, 2), ConfidenceLevel::Low);
        assert_eq!(score_confidence(11, 0, 2), ConfidenceLevel::Medium);
        assert_eq!(score_confidence(4, 1, 2), ConfidenceLevel::Medium);
        assert_eq!(score_confidence(11, 6, 2), ConfidenceLevel::High);
        assert_eq!(score_confidence(11, 1, 3), ConfidenceLevel::High);
        assert_eq!(score_confidence(1, 6, 3), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_three_failures_always_block() {
        for rev in [Reversibility::FullyReversible, Reversibility::Irreversible] {
            for conf in [ConfidenceLevel::High, ConfidenceLevel::Low] {
                let v = decide(&evidence(3, rev, conf, &RiskTier::Low));
                assert_eq!(v.recommendation, Recommendation::Block);
                assert_eq!(v.result, SimulationResult::Dangerous);
            }
        }
    }

    #[test]
    fn test_irreversible_low_confidence_blocks() {
        let v = decide(&evidence(0, Reversibility::Irreversible, ConfidenceLevel::Low, &RiskTier::Low));
        assert_eq!(v.recommendation, Recommendation::Block);
    }

    #[test]
    fn test_two_failures_escalate() {
        let v = decide(&evidence(2, Reversibility::FullyReversible, ConfidenceLevel::Medium, &RiskTier::Medium));
        assert_eq!(v.recommendation, Recommendation::Escalate);
        assert_eq!(v.result, SimulationResult::Caution);
        assert!(v.escalation_reason.unwrap().contains("Risk=MEDIUM"));
    }

    #[test]
    fn test_irreversible_high_risk_escalates() {
        let v = decide(&evidence(0, Reversibility::Irreversible, ConfidenceLevel::High, &RiskTier::High));
        assert_eq!(v.recommendation, Recommendation::Escalate);

        let other = RiskTier::Other("CRITICAL".into());
        let v = decide(&evidence(0, Reversibility::Irreversible, ConfidenceLevel::High, &other));
        assert_eq!(v.recommendation, Recommendation::Proceed);
    }

    #[test]
    fn test_one_failure_or_dangerous_effect_monitors() {
        let v = decide(&evidence(1, Reversibility::PartiallyReversible, ConfidenceLevel::High, &RiskTier::High));
        assert_eq!(v.recommendation, Recommendation::ProceedWithMonitoring);

        let mut e = evidence(0, Reversibility::FullyReversible, ConfidenceLevel::High, &RiskTier::Low);
        e.dangerous_effects = 1;
        assert_eq!(decide(&e).recommendation, Recommendation::ProceedWithMonitoring);
    }

    #[test]
    fn test_clean_run_proceeds_without_reason() {
        let v = decide(&evidence(0, Reversibility::FullyReversible, ConfidenceLevel::Low, &RiskTier::High));
        assert_eq!(v.result, SimulationResult::Safe);
        assert_eq!(v.recommendation, Recommendation::Proceed);
        assert!(v.escalation_reason.is_none());
    }

    #[test]
    fn test_names_serialize_screaming() {
        assert_eq!(
            serde_json::to_value(Recommendation::ProceedWithMonitoring).unwrap(),
            serde_json::json!("PROCEED_WITH_MONITORING")
        );
        assert_eq!(SimulationResult::Dangerous.to_string(), "DANGEROUS");
    }
}
