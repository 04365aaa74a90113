//! Canonical triage rule
//!
//! Applied identically regardless of output language:
//! 1. any red flag forces `Red`;
//! 2. otherwise the more urgent of the probability rule (top candidate above
//!    0.7 → `Yellow`, else `Green`) and the model's own suggestion, capped at
//!    `Yellow`. Without a red flag the model cannot escalate to `Red` alone.

use super::{CandidateCondition, Probability, TriageLevel};

/// Top-candidate probability above which the case is urgent
pub const ELEVATED_PROBABILITY: Probability = Probability::from_basis_points(7_000);

pub fn decide_triage(
    red_flags: &[String],
    differential: &[CandidateCondition],
    suggested: Option<TriageLevel>,
) -> TriageLevel {
    if !red_flags.is_empty() {
        return TriageLevel::Red;
    }

    let top = differential.iter().map(|c| c.probability).max();
    let by_probability = match top {
        Some(p) if p > ELEVATED_PROBABILITY => TriageLevel::Yellow,
        _ => TriageLevel::Green,
    };

    let suggested = suggested.map_or(TriageLevel::Green, |level| level.min(TriageLevel::Yellow));
    by_probability.max(suggested)
}
