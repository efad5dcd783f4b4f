//! Simulation reports and run-history aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::PredictedOutcome;
use super::recommendation::{Recommendation, SimulationResult};
use super::request::{ActionContext, RiskTier};
use super::reversibility::Reversibility;
use super::stress::StressResult;
use crate::confidence::ConfidenceLevel;

/// Immutable record of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// `SIM-YYYYMMDD-NNNN`, numbered within the twin's lifetime.
    pub simulation_id: String,
    pub task_id: String,
    pub agent_id: String,
    pub simulated_at: DateTime<Utc>,
    pub action: String,
    /// The caller's context, owned by the report.
    pub context: ActionContext,
    pub risk_tier: RiskTier,
    pub result: SimulationResult,
    pub predicted_outcomes: Vec<PredictedOutcome>,
    pub side_effects: Vec<String>,
    pub reversibility: Reversibility,
    pub confidence_in_simulation: ConfidenceLevel,
    pub stress_scenarios: Vec<StressResult>,
    pub recommendation: Recommendation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
}

impl SimulationReport {
    /// Scenarios the action did not survive.
    #[must_use]
    pub fn stress_failures(&self) -> usize {
        self.stress_scenarios.iter().filter(|s| !s.survives).count()
    }
}

/// Aggregate over the run history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total_simulations: usize,
    pub results: BTreeMap<SimulationResult, usize>,
    pub recommendations: BTreeMap<Recommendation, usize>,
    /// Percentage of runs recommended `BLOCK`, one decimal.
    pub block_rate: f64,
}

impl SimulationSummary {
    pub(crate) fn from_reports(reports: &[SimulationReport]) -> Self {
        let mut summary = Self {
            total_simulations: reports.len(),
            ..Self::default()
        };
        for report in reports {
            *summary.results.entry(report.result).or_default() += 1;
            *summary.recommendations.entry(report.recommendation).or_default() += 1;
        }
        if summary.total_simulations > 0 {
            let blocked = summary
                .recommendations
                .get(&Recommendation::Block)
                .copied()
                .unwrap_or(0);
            #[allow(clippy::cast_precision_loss)]
            let rate = blocked as f64 / summary.total_simulations as f64 * 100.0;
            summary.block_rate = (rate * 10.0).round() / 10.0;
        }
        summary
    }
}
