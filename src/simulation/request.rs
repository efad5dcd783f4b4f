//! Simulation inputs.
//!
//! The request is taken by value: the twin sandboxes nothing by copying, it
//! simply owns everything it reads and hands the context back inside the
//! report.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::entry::Entry;
use crate::error::ValidationError;

/// Context flag: the action talks to the outside world.
pub const SENDS_EXTERNAL: &str = "sends_external";
/// Context flag: the action modifies stored data.
pub const MODIFIES_DATA: &str = "modifies_data";
/// Context flag: the action moves money.
pub const FINANCIAL_IMPACT: &str = "financial_impact";
/// Context flag: the action is visible to the public.
pub const REPUTATION_IMPACT: &str = "reputation_impact";

/// String-keyed map of JSON primitives describing the action's surroundings.
///
/// Flags are read strictly: only a JSON `true` counts as set. Missing keys,
/// `"true"` strings and numbers all read as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionContext(BTreeMap<String, JsonValue>);

impl ActionContext {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Shorthand for `with(key, true)`.
    #[must_use]
    pub fn flag(self, key: impl Into<String>) -> Self {
        self.with(key, true)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns true only when `key` holds JSON `true`.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(JsonValue::Bool(true)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for ActionContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Outcome strings that count as a successful episode.
const SUCCESS_OUTCOMES: [&str; 3] = ["success", "pass", "completed"];

/// One past episode, as recorded by the episodic log.
///
/// Only the `outcome` field is interpreted; the rest of the record is matched
/// as text when looking for precedents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeRecord(JsonValue);

impl EpisodeRecord {
    #[must_use]
    pub fn new(record: JsonValue) -> Self {
        Self(record)
    }

    /// A minimal `{action, outcome}` record.
    #[must_use]
    pub fn with_outcome(action: &str, outcome: &str) -> Self {
        Self(serde_json::json!({ "action": action, "outcome": outcome }))
    }

    /// The recorded outcome, when it is a string.
    #[must_use]
    pub fn outcome(&self) -> Option<&str> {
        self.0.get("outcome").and_then(JsonValue::as_str)
    }

    /// A missing or unrecognised outcome is a failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome().is_some_and(|outcome| {
            SUCCESS_OUTCOMES
                .iter()
                .any(|s| outcome.eq_ignore_ascii_case(s))
        })
    }

    /// Case-insensitive substring match of `needle_lower` (already
    /// lowercased) against any key or scalar in the record. Strings are
    /// compared unescaped, so quotes and backslashes in an action match.
    pub(crate) fn mentions(&self, needle_lower: &str) -> bool {
        value_mentions(&self.0, needle_lower)
    }

    #[must_use]
    pub fn as_json(&self) -> &JsonValue {
        &self.0
    }
}

fn value_mentions(value: &JsonValue, needle_lower: &str) -> bool {
    let hit = |text: &str| text.to_lowercase().contains(needle_lower);
    match value {
        JsonValue::String(text) => hit(text),
        JsonValue::Array(items) => items.iter().any(|item| value_mentions(item, needle_lower)),
        JsonValue::Object(fields) => fields
            .iter()
            .any(|(key, field)| hit(key) || value_mentions(field, needle_lower)),
        JsonValue::Number(_) | JsonValue::Bool(_) | JsonValue::Null => hit(&value.to_string()),
    }
}

impl From<JsonValue> for EpisodeRecord {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

/// Risk tier assigned by the caller. Unknown tiers are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Other(String),
}

impl RiskTier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for RiskTier {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" => Self::Low,
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl From<String> for RiskTier {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<RiskTier> for String {
    fn from(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the twin needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub task_id: String,
    pub action: String,
    pub context: ActionContext,
    pub risk_tier: RiskTier,
    pub agent_id: String,
    pub history: Vec<EpisodeRecord>,
    pub substrate: Vec<Entry>,
}

impl SimulationRequest {
    /// Start building a request.
    #[must_use]
    pub fn builder() -> SimulationRequestBuilder {
        SimulationRequestBuilder::default()
    }
}

/// Builder for [`SimulationRequest`].
///
/// `task_id`, `action` and `agent_id` are required. Risk defaults to
/// `MEDIUM`; history and substrate default to empty.
#[derive(Debug, Clone, Default)]
pub struct SimulationRequestBuilder {
    task_id: Option<String>,
    action: Option<String>,
    context: ActionContext,
    risk_tier: Option<RiskTier>,
    agent_id: Option<String>,
    history: Vec<EpisodeRecord>,
    substrate: Vec<Entry>,
}

impl SimulationRequestBuilder {
    #[must_use]
    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    #[must_use]
    pub fn context(mut self, context: ActionContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn risk_tier(mut self, tier: impl Into<RiskTier>) -> Self {
        self.risk_tier = Some(tier.into());
        self
    }

    #[must_use]
    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    #[must_use]
    pub fn history(mut self, history: impl IntoIterator<Item = EpisodeRecord>) -> Self {
        self.history = history.into_iter().collect();
        self
    }

    /// Substrate search results backing the simulation.
    #[must_use]
    pub fn substrate(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.substrate = entries.into_iter().collect();
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    /// `ValidationError::MissingField` when a required field is absent or
    /// blank.
    pub fn build(self) -> Result<SimulationRequest, ValidationError> {
        fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(ValidationError::MissingField {
                    field: field.to_string(),
                }),
            }
        }

        Ok(SimulationRequest {
            task_id: required(self.task_id, "task_id")?,
            action: required(self.action, "action")?,
            agent_id: required(self.agent_id, "agent_id")?,
            context: self.context,
            risk_tier: self.risk_tier.unwrap_or(RiskTier::Medium),
            history: self.history,
            substrate: self.substrate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_json_true_sets_a_flag() {
        let ctx = ActionContext::new()
            .with("a", true)
            .with("b", "true")
            .with("c", 1)
            .with("d", false);
        assert!(ctx.is_set("a"));
        assert!(!ctx.is_set("b"));
        assert!(!ctx.is_set("c"));
        assert!(!ctx.is_set("d"));
        assert!(!ctx.is_set("missing"));
    }

    #[test]
    fn test_episode_success_is_case_insensitive() {
        assert!(EpisodeRecord::with_outcome("x", "SUCCESS").is_success());
        assert!(EpisodeRecord::with_outcome("x", "Pass").is_success());
        assert!(EpisodeRecord::with_outcome("x", "completed").is_success());
        assert!(!EpisodeRecord::with_outcome("x", "failed").is_success());
        assert!(!EpisodeRecord::new(json!({"action": "x"})).is_success());
        assert!(!EpisodeRecord::new(json!({"outcome": true})).is_success());
    }

    #[test]
    fn test_episode_mentions_matches_any_field() {
        let record = EpisodeRecord::new(json!({"task": "Send Weekly Report", "outcome": "success"}));
        assert!(record.mentions("send weekly"));
        assert!(!record.mentions("delete"));
    }

    #[test]
    fn test_episode_mentions_sees_quotes_and_backslashes_unescaped() {
        let quoted = EpisodeRecord::with_outcome(r#"draft "weekly" memo"#, "success");
        assert!(quoted.mentions(r#"draft "weekly" memo"#));

        let nested = EpisodeRecord::new(json!({"steps": [{"cmd": r"copy C:\reports\q3"}]}));
        assert!(nested.mentions(r"c:\reports"));
        assert!(nested.mentions("cmd"));
        assert!(!nested.mentions(r#"\""#));
    }

    #[test]
    fn test_risk_tier_preserves_unknown_values() {
        assert_eq!(RiskTier::from("high"), RiskTier::High);
        assert_eq!(RiskTier::from("CRITICAL"), RiskTier::Other("CRITICAL".into()));

        let json = serde_json::to_value(RiskTier::Other("CRITICAL".into())).unwrap();
        assert_eq!(json, json!("CRITICAL"));
        let back: RiskTier = serde_json::from_value(json!("LOW")).unwrap();
        assert_eq!(back, RiskTier::Low);
    }

    #[test]
    fn test_builder_requires_action() {
        let err = SimulationRequest::builder()
            .task_id("T-1")
            .agent_id("EXECUTOR")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field } if field == "action"));
    }

    #[test]
    fn test_builder_defaults() {
        let req = SimulationRequest::builder()
            .task_id("T-1")
            .action("draft note")
            .agent_id("EXECUTOR")
            .build()
            .unwrap();
        assert_eq!(req.risk_tier, RiskTier::Medium);
        assert!(req.context.is_empty());
        assert!(req.history.is_empty());
        assert!(req.substrate.is_empty());
    }
}
