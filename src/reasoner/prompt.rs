//! Prompts sent to the hosted model

use crate::state_machine::{ConversationState, Language};

pub(super) const EXTRACTION_SYSTEM: &str = "\
You are a careful clinical intake assistant. You never diagnose during intake.

Read the patient's latest message together with the facts gathered so far. \
Extract only facts the patient actually stated in the latest message, then \
ask exactly one short follow-up question that fills the most important gap \
(onset and duration, severity, location, aggravating or relieving factors, \
associated symptoms, medical history, medications).

Reply with a single JSON object and nothing else:
{
  \"symptoms\": [string],
  \"duration\": string | null,
  \"severity\": string | null,
  \"location\": string | null,
  \"aggravatingFactors\": [string],
  \"relievingFactors\": [string],
  \"associatedSymptoms\": [string],
  \"medicalHistory\": [string],
  \"medications\": [string],
  \"confirmedSymptoms\": [string],
  \"ruledOut\": [string],
  \"followUpQuestion\": string
}

Use English for every extracted term. Write followUpQuestion in the \
patient's language. Put symptoms the patient denies in ruledOut.";

pub(super) const ASSESSMENT_SYSTEM: &str = "\
You are a careful clinical triage assistant. The intake conversation is \
finished. Using the gathered facts and the patient's final message, propose \
a short differential and a triage level.

Triage levels: \"green\" (self-care or routine appointment), \"yellow\" \
(see a clinician within 24 hours), \"red\" (emergency care now).

Reply with a single JSON object and nothing else:
{
  \"triageLevel\": \"green\" | \"yellow\" | \"red\",
  \"differential\": [
    {\"name\": string, \"probability\": number between 0 and 1, \"rationale\": string}
  ],
  \"recommendations\": [string],
  \"redFlags\": [string]
}

List at most five conditions, most likely first. Write every value in \
English; it is translated for the patient afterwards.";

/// The single user turn: gathered facts, patient language, latest message
pub(super) fn user_turn(state: &ConversationState, utterance: &str) -> String {
    let facts = serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string());
    let language = match state.language {
        Language::En => "English",
        Language::Ar => "Arabic",
    };
    format!(
        "Facts gathered so far:\n{facts}\n\nPatient language: {language}\n\n\
         Patient's latest message:\n{}",
        utterance.trim()
    )
}
