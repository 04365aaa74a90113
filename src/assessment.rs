//! Final assessment: triage, differential, bilingual rendering
//!
//! Probabilities are held as fixed-point fractions internally; percentage
//! scaling only happens when text is rendered for the patient.

mod red_flags;
mod translate;
mod triage;

pub use red_flags::detect_red_flags;
pub use translate::to_arabic;
pub use triage::{decide_triage, ELEVATED_PROBABILITY};

use crate::state_machine::{ConversationState, Language};
use serde::{Serialize, Serializer};
use std::fmt;

// ============================================================================
// Triage level
// ============================================================================

/// Coarse urgency classification, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageLevel {
    Green,
    Yellow,
    Red,
}

impl TriageLevel {
    /// Parse a model-supplied level, accepting the synonyms seen in practice
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "green" | "routine" | "low" | "non-urgent" | "nonurgent" => Some(Self::Green),
            "yellow" | "urgent" | "medium" | "moderate" | "amber" => Some(Self::Yellow),
            "red" | "emergency" | "high" | "critical" => Some(Self::Red),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }

    fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Green, Language::En) => "Routine",
            (Self::Yellow, Language::En) => "Urgent",
            (Self::Red, Language::En) => "Emergency",
            (Self::Green, Language::Ar) => "روتيني",
            (Self::Yellow, Language::Ar) => "عاجل",
            (Self::Red, Language::Ar) => "طارئ",
        }
    }

    fn advice(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Green, Language::En) => {
                "Self-care and a routine appointment are appropriate."
            }
            (Self::Yellow, Language::En) => "Please arrange to see a clinician within 24 hours.",
            (Self::Red, Language::En) => {
                "Seek emergency care now or call your local emergency number."
            }
            (Self::Green, Language::Ar) => "الرعاية الذاتية وموعد روتيني مناسبان.",
            (Self::Yellow, Language::Ar) => "يرجى مراجعة الطبيب خلال 24 ساعة.",
            (Self::Red, Language::Ar) => "اطلب الرعاية الطارئة فوراً أو اتصل برقم الطوارئ المحلي.",
        }
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Probability
// ============================================================================

/// Probability in basis points (0..=10000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Probability(u16);

impl Probability {
    pub const ZERO: Self = Self(0);
    pub const CERTAIN: Self = Self(10_000);

    pub const fn from_basis_points(bp: u16) -> Self {
        if bp > 10_000 {
            Self::CERTAIN
        } else {
            Self(bp)
        }
    }

    /// Normalize a model-reported value.
    ///
    /// Values above 1 are read as percentages. This is lossy at the boundary:
    /// a reported `1.0` always means certainty, never one percent.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=10000
    pub fn from_model(raw: f64) -> Self {
        if !raw.is_finite() || raw <= 0.0 {
            return Self::ZERO;
        }
        let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
        Self((fraction.min(1.0) * 10_000.0).round() as u16)
    }

    pub fn basis_points(self) -> u16 {
        self.0
    }

    pub fn as_fraction(self) -> f64 {
        f64::from(self.0) / 10_000.0
    }

    /// Display scaling, capped at 100
    pub fn as_percent(self) -> u16 {
        (self.0 + 50) / 100
    }
}

impl Serialize for Probability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_fraction())
    }
}

// ============================================================================
// Drafts and results
// ============================================================================

/// One ranked candidate condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCondition {
    pub name: String,
    pub probability: Probability,
    pub rationale: String,
}

/// What the model proposed, before the triage rule and rendering are applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssessmentDraft {
    pub suggested_triage: Option<TriageLevel>,
    pub differential: Vec<CandidateCondition>,
    pub recommendations: Vec<String>,
    pub red_flags: Vec<String>,
}

/// One language rendering of an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub summary: String,
    pub differential: Vec<CandidateCondition>,
    pub recommendations: Vec<String>,
    pub red_flags: Vec<String>,
}

/// Final structured assessment, rendered in both languages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub triage_level: TriageLevel,
    pub red_flags: Vec<String>,
    /// Built without a model answer
    pub degraded: bool,
    pub en: AssessmentReport,
    pub ar: AssessmentReport,
}

impl Assessment {
    pub fn report(&self, language: Language) -> &AssessmentReport {
        match language {
            Language::En => &self.en,
            Language::Ar => &self.ar,
        }
    }
}

/// Apply the triage rule to a model draft and render it in both languages.
///
/// Red flags are the union of what the model reported and what the local
/// pattern table finds in the accumulated state and final utterance.
pub fn finalize(draft: AssessmentDraft, state: &ConversationState, utterance: &str) -> Assessment {
    let mut differential = draft.differential;
    differential.sort_by(|a, b| b.probability.cmp(&a.probability));

    let red_flags = merge_red_flags(&draft.red_flags, detect_red_flags(state, utterance));
    let triage_level = decide_triage(&red_flags, &differential, draft.suggested_triage);

    let recommendations = if draft.recommendations.is_empty() {
        default_recommendations()
    } else {
        draft.recommendations
    };

    build(triage_level, red_flags, differential, &recommendations, false)
}

/// Assessment used when the model could not produce one
pub fn fallback_assessment(state: &ConversationState, utterance: &str) -> Assessment {
    let red_flags = detect_red_flags(state, utterance);
    let triage_level = decide_triage(&red_flags, &[], None);
    build(triage_level, red_flags, Vec::new(), &default_recommendations(), true)
}

fn default_recommendations() -> Vec<String> {
    vec![
        "Consult a doctor to review your symptoms.".to_string(),
        "Monitor your symptoms and seek care if they get worse.".to_string(),
    ]
}

fn merge_red_flags(reported: &[String], detected: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for flag in reported.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
        if !merged.iter().any(|m| m.eq_ignore_ascii_case(flag)) {
            merged.push(flag.to_string());
        }
    }
    for flag in detected {
        if !merged.iter().any(|m| m.eq_ignore_ascii_case(&flag)) {
            merged.push(flag);
        }
    }
    merged
}

fn build(
    triage_level: TriageLevel,
    red_flags: Vec<String>,
    differential: Vec<CandidateCondition>,
    recommendations: &[String],
    degraded: bool,
) -> Assessment {
    let ar_differential = differential
        .iter()
        .map(|c| CandidateCondition {
            name: to_arabic(&c.name),
            probability: c.probability,
            rationale: to_arabic(&c.rationale),
        })
        .collect::<Vec<_>>();

    let en = AssessmentReport {
        summary: summary(triage_level, differential.first(), Language::En),
        differential,
        recommendations: recommendations.to_vec(),
        red_flags: red_flags.clone(),
    };

    let ar = AssessmentReport {
        summary: summary(triage_level, ar_differential.first(), Language::Ar),
        differential: ar_differential,
        recommendations: recommendations.iter().map(|r| to_arabic(r)).collect(),
        red_flags: red_flags.iter().map(|f| to_arabic(f)).collect(),
    };

    Assessment {
        triage_level,
        red_flags,
        degraded,
        en,
        ar,
    }
}

fn summary(level: TriageLevel, top: Option<&CandidateCondition>, language: Language) -> String {
    let mut text = match language {
        Language::En => format!("Assessment complete. Triage level: {}.", level.label(language)),
        Language::Ar => format!("اكتمل التقييم. مستوى الفرز: {}.", level.label(language)),
    };

    if let Some(top) = top {
        let line = match language {
            Language::En => format!(
                " Most likely: {} ({}%).",
                top.name,
                top.probability.as_percent()
            ),
            Language::Ar => format!(
                " الاحتمال الأرجح: {} ({}٪).",
                top.name,
                top.probability.as_percent()
            ),
        };
        text.push_str(&line);
    }

    text.push(' ');
    text.push_str(level.advice(language));
    text
}
