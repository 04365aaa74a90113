//! Lenient parsing of model replies
//!
//! Models wrap JSON in code fences, rename keys between prompt revisions and
//! sometimes answer in plain prose. Everything here tolerates that.

use super::{Extraction, ReasonerError};
use crate::assessment::{AssessmentDraft, CandidateCondition, Probability, TriageLevel};
use crate::state_machine::ExtractedFields;
use serde_json::{Map, Value};

const SYMPTOMS: &[&str] = &[
    "symptoms",
    "addSymptoms",
    "updateSymptoms",
    "newSymptoms",
    "add_symptoms",
    "update_symptoms",
    "new_symptoms",
];
const FOLLOW_UP: &[&str] = &[
    "followUpQuestion",
    "follow_up_question",
    "question",
    "nextQuestion",
    "next_question",
];
const NESTED_FACTS: &[&str] = &["extracted", "extractedData", "updates", "state"];

/// The JSON payload inside a reply: a fenced block if present, otherwise the
/// outermost `{...}` span.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some((_, after)) = trimmed.split_once("```") {
        // Skip the info string (`json`, `JSON`, ...) up to the first newline
        let body = match after.split_once('\n') {
            Some((info, rest)) if !info.trim_start().starts_with('{') => rest,
            _ => after,
        };
        if let Some((block, _)) = body.split_once("```") {
            let block = block.trim();
            if block.starts_with('{') || block.starts_with('[') {
                return Some(block);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if start < end {
        trimmed.get(start..=end)
    } else {
        None
    }
}

fn looks_like_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with("```")
}

fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let block = extract_json_block(raw)?;
    match serde_json::from_str::<Value>(block).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

// ============================================================================
// Field helpers
// ============================================================================

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn scalar(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(text)
}

/// A list of strings; a lone string counts as a one-item list and objects
/// contribute their `name`.
fn strings(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match field(obj, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(o) => scalar(o, &["name", "term", "symptom"]),
                other => text(other),
            })
            .collect(),
        Some(other) => text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn probability(value: &Value) -> Option<Probability> {
    match value {
        Value::Number(n) => n.as_f64().map(Probability::from_model),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => pct
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .map(|p| Probability::from_model(p / 100.0)),
                None => s.parse::<f64>().ok().map(Probability::from_model),
            }
        }
        _ => None,
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Parse an extraction reply.
///
/// Prose that is not JSON at all is taken as the follow-up question with
/// nothing extracted. A reply that starts out as JSON but does not parse is
/// malformed.
pub fn parse_extraction(raw: &str) -> Result<Extraction, ReasonerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ReasonerError::EmptyResponse);
    }

    let Some(obj) = parse_object(trimmed) else {
        if looks_like_json(trimmed) {
            return Err(ReasonerError::Malformed(
                "extraction reply is not a JSON object".to_string(),
            ));
        }
        return Ok(Extraction {
            fields: ExtractedFields::default(),
            follow_up: trimmed.to_string(),
        });
    };

    let follow_up = scalar(&obj, FOLLOW_UP).unwrap_or_default();
    let facts = match field(&obj, NESTED_FACTS) {
        Some(Value::Object(nested)) => nested,
        _ => &obj,
    };

    let fields = ExtractedFields {
        symptoms: strings(facts, SYMPTOMS),
        duration: scalar(facts, &["duration", "onset"]),
        severity: scalar(facts, &["severity", "intensity"]),
        location: scalar(facts, &["location", "site"]),
        aggravating_factors: strings(facts, &["aggravatingFactors", "aggravating_factors"]),
        relieving_factors: strings(facts, &["relievingFactors", "relieving_factors"]),
        associated_symptoms: strings(facts, &["associatedSymptoms", "associated_symptoms"]),
        medical_history: strings(facts, &["medicalHistory", "medical_history", "history"]),
        medications: strings(
            facts,
            &["medications", "currentMedications", "current_medications"],
        ),
        confirmed_symptoms: strings(facts, &["confirmedSymptoms", "confirmed_symptoms"]),
        ruled_out: strings(
            facts,
            &["ruledOut", "ruled_out", "deniedSymptoms", "denied_symptoms"],
        ),
    };

    Ok(Extraction { fields, follow_up })
}

// ============================================================================
// Assessment
// ============================================================================

fn candidate(value: &Value) -> Option<CandidateCondition> {
    match value {
        Value::Object(o) => Some(CandidateCondition {
            name: scalar(o, &["name", "condition", "diagnosis"])?,
            probability: field(o, &["probability", "likelihood", "confidence"])
                .and_then(probability)
                .unwrap_or(Probability::ZERO),
            rationale: scalar(o, &["rationale", "reasoning", "explanation"]).unwrap_or_default(),
        }),
        Value::String(name) if !name.trim().is_empty() => Some(CandidateCondition {
            name: name.trim().to_string(),
            probability: Probability::ZERO,
            rationale: String::new(),
        }),
        _ => None,
    }
}

/// Parse a final-assessment reply; anything unusable is malformed.
pub fn parse_assessment(raw: &str) -> Result<AssessmentDraft, ReasonerError> {
    if raw.trim().is_empty() {
        return Err(ReasonerError::EmptyResponse);
    }
    let obj = parse_object(raw).ok_or_else(|| {
        ReasonerError::Malformed("assessment reply is not a JSON object".to_string())
    })?;

    let suggested_triage = scalar(&obj, &["triageLevel", "triage_level", "triage", "urgency"])
        .and_then(|s| TriageLevel::parse(&s));

    let differential: Vec<CandidateCondition> = match field(
        &obj,
        &["differential", "differentialDiagnosis", "conditions", "candidates"],
    ) {
        Some(Value::Array(items)) => items.iter().filter_map(candidate).collect(),
        _ => Vec::new(),
    };

    if suggested_triage.is_none() && differential.is_empty() {
        return Err(ReasonerError::Malformed(
            "assessment has neither a triage level nor a differential".to_string(),
        ));
    }

    Ok(AssessmentDraft {
        suggested_triage,
        differential,
        recommendations: strings(&obj, &["recommendations", "nextSteps", "next_steps"]),
        red_flags: strings(&obj, &["redFlags", "red_flags", "warnings"]),
    })
}
