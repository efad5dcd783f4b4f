//! The stress test battery.
//!
//! Stress is a uniform probability shift: each scenario pushes every negative
//! outcome up and every positive outcome down by its modifier. Nothing is
//! resampled, so identical inputs always give identical results.

use serde::{Deserialize, Serialize};

use super::outcome::{round2, PredictedOutcome};

/// A named adversarial shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressScenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub modifier: f64,
}

/// The fixed battery, in report order.
pub const STRESS_BATTERY: [StressScenario; 5] = [
    StressScenario {
        id: "WORST_CASE",
        name: "Worst Case",
        description: "Everything that can go wrong does go wrong",
        modifier: 0.1,
    },
    StressScenario {
        id: "2AM_TEST",
        name: "2 AM Test",
        description: "Execute during lowest energy/willpower state",
        modifier: 0.6,
    },
    StressScenario {
        id: "CASCADE_FAILURE",
        name: "Cascade Failure",
        description: "This failure triggers downstream failures",
        modifier: 0.3,
    },
    StressScenario {
        id: "ADVERSARIAL",
        name: "Adversarial Input",
        description: "Malicious or corrupted input data",
        modifier: 0.2,
    },
    StressScenario {
        id: "RESOURCE_EXHAUSTION",
        name: "Resource Exhaustion",
        description: "Budget/time/API limits hit mid-execution",
        modifier: 0.4,
    },
];

/// How the action fared under one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: String,
    pub description: String,
    pub survives: bool,
    pub max_failure_probability: f64,
    /// `PASSES`, or `FAILS: review required`.
    pub note: String,
}

const PASSES: &str = "PASSES";
const FAILS: &str = "FAILS: review required";

fn stressed_probability(outcome: &PredictedOutcome, modifier: f64) -> f64 {
    let shifted = if outcome.is_negative() {
        (outcome.probability + modifier).min(1.0)
    } else {
        (outcome.probability - modifier).max(0.0)
    };
    round2(shifted)
}

pub(crate) fn run_battery(outcomes: &[PredictedOutcome], survival_threshold: f64) -> Vec<StressResult> {
    STRESS_BATTERY
        .iter()
        .map(|scenario| {
            let max_failure_probability = outcomes
                .iter()
                .filter(|o| o.is_negative())
                .map(|o| stressed_probability(o, scenario.modifier))
                .fold(0.0_f64, f64::max);
            let survives = max_failure_probability < survival_threshold;
            StressResult {
                scenario: scenario.id.to_string(),
                description: scenario.description.to_string(),
                survives,
                max_failure_probability,
                note: if survives { PASSES } else { FAILS }.to_string(),
            }
        })
        .collect()
}
