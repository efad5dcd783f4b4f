//! Side-effect identification from context flags.

use super::request::{ActionContext, FINANCIAL_IMPACT, MODIFIES_DATA, REPUTATION_IMPACT, SENDS_EXTERNAL};

/// Emitted when no flag is set. Absence of a flag is not evidence of safety.
pub const NO_SIDE_EFFECTS: &str = "No identified side effects (review manually)";

/// Flag → description, in report order.
const FLAG_EFFECTS: [(&str, &str); 4] = [
    (SENDS_EXTERNAL, "External communication: cannot be unsent"),
    (MODIFIES_DATA, "Data modification: may affect downstream processes"),
    (FINANCIAL_IMPACT, "Financial transaction: real money at risk"),
    (REPUTATION_IMPACT, "Public-facing: reputation consequences"),
];

/// Phrases that mark a side effect as dangerous on their own.
const DANGER_PHRASES: [&str; 2] = ["cannot", "real money"];

pub(crate) fn identify(context: &ActionContext) -> Vec<String> {
    let mut effects: Vec<String> = FLAG_EFFECTS
        .iter()
        .filter(|(flag, _)| context.is_set(flag))
        .map(|(_, effect)| (*effect).to_string())
        .collect();
    if effects.is_empty() {
        effects.push(NO_SIDE_EFFECTS.to_string());
    }
    effects
}

/// Side effects that cannot be undone or that put money at risk.
pub(crate) fn dangerous(effects: &[String]) -> usize {
    effects
        .iter()
        .filter(|effect| {
            let lower = effect.to_lowercase();
            DANGER_PHRASES.iter().any(|phrase| lower.contains(phrase))
        })
        .count()
}
