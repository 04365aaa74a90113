//! Conversation state types
//!
//! The accumulator is a caller-held value: it is rehydrated from JSON at the
//! start of every turn and handed back, updated, at the end.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Language
// ============================================================================

/// Patient-facing language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    /// Strict parse of a language code or name
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "eng" | "english" => Some(Language::En),
            "ar" | "ara" | "arabic" => Some(Language::Ar),
            _ => None,
        }
    }

    /// Lenient parse: anything unrecognised is English
    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Numbers, nulls, unknown codes: all normalize to English
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map_or(Language::En, Language::parse_or_default))
    }
}

// ============================================================================
// Stage and turn phase
// ============================================================================

/// Conversation stage reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Greeting,
    Gathering,
    Complete,
}

/// Where a single turn is while it executes.
///
/// Lives only for the duration of one `advance` call; it is never serialized
/// back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// Waiting for the patient's utterance
    #[default]
    Idle,
    /// Extraction request in flight; `turn` is the step count before this turn
    Extracting { turn: u32 },
    /// Final assessment request in flight; the utterance is kept for local
    /// red-flag detection
    Assessing { turn: u32, utterance: String },
}

impl TurnPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Extracting { .. } => "extracting",
            TurnPhase::Assessing { .. } => "assessing",
        }
    }
}

// ============================================================================
// TermSet - case-insensitive string set
// ============================================================================

/// Set of free-text terms, deduplicated case-insensitively.
///
/// The first spelling seen is kept for display. Serializes as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermSet {
    entries: BTreeMap<String, String>,
}

fn fold(term: &str) -> String {
    term.trim().to_lowercase()
}

impl TermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a term; returns false for blanks and duplicates
    pub fn insert(&mut self, term: &str) -> bool {
        let key = fold(term);
        if key.is_empty() || self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, term.trim().to_string());
        true
    }

    pub fn remove(&mut self, term: &str) -> bool {
        self.entries.remove(&fold(term)).is_some()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.contains_key(&fold(term))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Terms in their original spelling, ordered by folded key
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for TermSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TermSet::new();
        for term in iter {
            set.insert(term.as_ref());
        }
        set
    }
}

impl Serialize for TermSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Accepted wire shapes for a term set: a list, a lone term, or null
#[derive(Deserialize)]
#[serde(untagged)]
enum TermInput {
    Many(Vec<String>),
    One(String),
}

impl<'de> Deserialize<'de> for TermSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<TermInput>::deserialize(deserializer)? {
            Some(TermInput::Many(terms)) => terms.into_iter().collect(),
            Some(TermInput::One(term)) => std::iter::once(term).collect(),
            None => TermSet::new(),
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Extracted facts from one utterance
// ============================================================================

/// Facts pulled out of a single patient utterance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub symptoms: Vec<String>,
    pub duration: Option<String>,
    pub severity: Option<String>,
    pub location: Option<String>,
    pub aggravating_factors: Vec<String>,
    pub relieving_factors: Vec<String>,
    pub associated_symptoms: Vec<String>,
    pub medical_history: Vec<String>,
    pub medications: Vec<String>,
    pub confirmed_symptoms: Vec<String>,
    pub ruled_out: Vec<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Cumulative patient state carried across intake turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationState {
    pub symptoms: TermSet,
    pub duration: Option<String>,
    pub severity: Option<String>,
    pub location: Option<String>,
    pub aggravating_factors: TermSet,
    pub relieving_factors: TermSet,
    pub associated_symptoms: TermSet,
    pub medical_history: TermSet,
    pub medications: TermSet,
    pub confirmed_symptoms: TermSet,
    pub ruled_out: TermSet,
    #[serde(deserialize_with = "null_as_default")]
    pub step_count: u32,
    pub language: Language,
}

impl ConversationState {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    /// Rehydrate from the caller's serialized copy
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a string, set, integer or enum; this cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn advance_step(&mut self) {
        self.step_count = self.step_count.saturating_add(1);
    }

    /// Merge extracted facts into the accumulator.
    ///
    /// Sets union, scalars are last-write-wins (blank never overwrites), and
    /// denials are applied last so a term is never both reported and ruled out.
    pub fn merge(&mut self, fields: &ExtractedFields) {
        for (target, incoming) in [
            (&mut self.symptoms, &fields.symptoms),
            (&mut self.confirmed_symptoms, &fields.confirmed_symptoms),
            (&mut self.associated_symptoms, &fields.associated_symptoms),
        ] {
            for term in incoming {
                target.insert(term);
                if target.contains(term) {
                    self.ruled_out.remove(term);
                }
            }
        }

        for (target, incoming) in [
            (&mut self.aggravating_factors, &fields.aggravating_factors),
            (&mut self.relieving_factors, &fields.relieving_factors),
            (&mut self.medical_history, &fields.medical_history),
            (&mut self.medications, &fields.medications),
        ] {
            for term in incoming {
                target.insert(term);
            }
        }

        overwrite(&mut self.duration, fields.duration.as_deref());
        overwrite(&mut self.severity, fields.severity.as_deref());
        overwrite(&mut self.location, fields.location.as_deref());

        for term in &fields.ruled_out {
            self.ruled_out.insert(term);
            if self.ruled_out.contains(term) {
                self.symptoms.remove(term);
                self.confirmed_symptoms.remove(term);
                self.associated_symptoms.remove(term);
            }
        }
    }

    /// Every symptom-like term the patient reported, across all sets
    pub fn reported_terms(&self) -> impl Iterator<Item = &str> {
        self.symptoms
            .iter()
            .chain(self.confirmed_symptoms.iter())
            .chain(self.associated_symptoms.iter())
    }
}

fn overwrite(slot: &mut Option<String>, incoming: Option<&str>) {
    if let Some(value) = incoming.map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(value.to_string());
    }
}
