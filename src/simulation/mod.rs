//! Digital Twin: advisory pre-flight simulation of a proposed action.
//!
//! Each call is a one-shot pipeline over an owned request:
//!
//! ```text
//! request ─► predict ─► side effects ─► reversibility ─► stress battery
//!                                                            │
//!        report ◄── recommendation ◄── simulation confidence ◄┘
//! ```
//!
//! The twin never executes the action and never touches the entry store.
//! The only state it keeps is a run counter and the in-memory history.

pub mod outcome;
pub mod recommendation;
pub mod report;
pub mod request;
pub mod reversibility;
pub mod side_effects;
pub mod stress;

pub use outcome::{Impact, OutcomeKind, PredictedOutcome};
pub use recommendation::{Recommendation, SimulationResult};
pub use report::{SimulationReport, SimulationSummary};
pub use request::{ActionContext, EpisodeRecord, RiskTier, SimulationRequest, SimulationRequestBuilder};
pub use reversibility::Reversibility;
pub use stress::{StressResult, StressScenario, STRESS_BATTERY};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::config::TwinConfig;
use crate::error::{ValidationError, ZeroPointError, ZeroPointResult};
use crate::time::{system_clock, SharedClock};

use recommendation::{decide, score_confidence, Evidence};
use reversibility::MarkerMatcher;

/// The shadow execution engine.
#[derive(Debug)]
pub struct DigitalTwin {
    config: TwinConfig,
    markers: MarkerMatcher,
    clock: SharedClock,
    runs: AtomicU64,
    history: RwLock<Vec<SimulationReport>>,
}

impl DigitalTwin {
    /// Create a twin with the system clock.
    ///
    /// # Errors
    /// Returns `ValidationError` for an invalid `config`.
    pub fn new(config: TwinConfig) -> Result<Self, ValidationError> {
        Self::with_clock(config, system_clock())
    }

    /// Create a twin with an explicit clock.
    pub fn with_clock(config: TwinConfig, clock: SharedClock) -> Result<Self, ValidationError> {
        let config = config.validate()?;
        let markers = MarkerMatcher::new(&config.irreversible_markers)?;
        Ok(Self {
            config,
            markers,
            clock,
            runs: AtomicU64::new(0),
            history: RwLock::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    fn next_simulation_id(&self) -> (String, chrono::DateTime<chrono::Utc>) {
        let seq = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let now = self.clock.now();
        (format!("SIM-{}-{seq:04}", now.format("%Y%m%d")), now)
    }

    /// Run the full pipeline and record the report in the history.
    ///
    /// The pipeline itself cannot fail; the only error is a poisoned
    /// history lock.
    pub fn simulate(&self, request: SimulationRequest) -> ZeroPointResult<SimulationReport> {
        let (simulation_id, simulated_at) = self.next_simulation_id();

        let predicted_outcomes = outcome::predict(&request.action, &request.history);
        let side_effects = side_effects::identify(&request.context);
        let reversibility = self.markers.classify(&request.action, &request.context);
        let stress_scenarios = stress::run_battery(&predicted_outcomes, self.config.survival_threshold);
        let confidence_in_simulation = score_confidence(
            request.history.len(),
            request.substrate.len(),
            predicted_outcomes.len(),
        );

        let stress_failures = stress_scenarios.iter().filter(|s| !s.survives).count();
        let verdict = decide(&Evidence {
            stress_failures,
            reversibility,
            confidence: confidence_in_simulation,
            risk_tier: &request.risk_tier,
            dangerous_effects: side_effects::dangerous(&side_effects),
        });

        let report = SimulationReport {
            simulation_id,
            task_id: request.task_id,
            agent_id: request.agent_id,
            simulated_at,
            action: request.action,
            context: request.context,
            risk_tier: request.risk_tier,
            result: verdict.result,
            predicted_outcomes,
            side_effects,
            reversibility,
            confidence_in_simulation,
            stress_scenarios,
            recommendation: verdict.recommendation,
            escalation_reason: verdict.escalation_reason,
        };

        debug!(
            simulation_id = %report.simulation_id,
            task_id = %report.task_id,
            result = %report.result,
            recommendation = %report.recommendation,
            stress_failures,
            "simulation complete"
        );

        self.history
            .write()
            .map_err(|_| ZeroPointError::internal("twin history lock poisoned"))?
            .push(report.clone());
        Ok(report)
    }

    /// Counts by result and recommendation over every run so far.
    pub fn summary(&self) -> ZeroPointResult<SimulationSummary> {
        let history = self
            .history
            .read()
            .map_err(|_| ZeroPointError::internal("twin history lock poisoned"))?;
        Ok(SimulationSummary::from_reports(&history))
    }

    /// Snapshot of past reports, oldest first.
    pub fn history(&self) -> ZeroPointResult<Vec<SimulationReport>> {
        Ok(self
            .history
            .read()
            .map_err(|_| ZeroPointError::internal("twin history lock poisoned"))?
            .clone())
    }

    /// Number of runs started.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}
