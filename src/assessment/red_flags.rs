//! Local red-flag detection
//!
//! Scans what the patient actually said for findings that must escalate to the
//! highest triage level, independently of what the model reports.

use crate::state_machine::ConversationState;
use regex::Regex;
use std::sync::LazyLock;

/// A compiled pattern with the canonical (English) label it reports
struct RedFlagPattern {
    regex: Regex,
    label: &'static str,
}

fn pattern(source: &str, label: &'static str) -> RedFlagPattern {
    RedFlagPattern {
        regex: Regex::new(source).expect("red-flag patterns are static and valid"),
        label,
    }
}

// Arabic alternatives avoid \b: Arabic letters are word characters, and the
// clitic prefixes (ال, و, ب) would defeat a boundary anchor.
static RED_FLAG_PATTERNS: LazyLock<Vec<RedFlagPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\bchest\s+(?:pain|pressure|tightness)\b|ألم\s*(?:في\s*)?الصدر",
            "chest pain",
        ),
        pattern(
            r"(?i)\b(?:shortness\s+of\s+breath|(?:difficulty|trouble)\s+breathing|can(?:no|')?t\s+breathe)\b|(?:ضيق|صعوبة)\s*(?:في\s*)?التنفس",
            "difficulty breathing",
        ),
        pattern(
            r"(?i)\b(?:faint(?:ed|ing)?|passed\s+out|unconscious|loss\s+of\s+consciousness)\b|إغماء|فقدان\s*الوعي",
            "loss of consciousness",
        ),
        pattern(
            r"(?i)\b(?:slurred\s+speech|face\s+droop(?:ing)?|facial\s+droop|one[-\s]sided\s+weakness|sudden\s+numbness)\b|شلل\s*(?:في\s*)?الوجه",
            "stroke symptoms",
        ),
        pattern(
            r"(?i)\b(?:(?:coughing|vomiting)\s+(?:up\s+)?blood|severe\s+bleeding|bleeding\s+heavily)\b|نزيف\s*حاد|سعال\s*دموي",
            "severe bleeding",
        ),
        pattern(
            r"(?i)\bsuicid(?:e|al)\b|\b(?:kill|hurt)\s+myself\b|انتحار",
            "suicidal thoughts",
        ),
        pattern(
            r"(?i)\b(?:worst\s+headache|thunderclap)\b|أسوأ\s*صداع",
            "worst headache of life",
        ),
        pattern(r"(?i)\b(?:seizures?|convulsions?)\b|تشنج", "seizure"),
        pattern(
            r"(?i)\b(?:10\s*/\s*10|unbearable|excruciating)\b|لا\s*يطاق",
            "severe pain",
        ),
    ]
});

/// Words that deny what follows them within the same clause
const NEGATION_CUES: &[&str] = &[
    "no", "not", "never", "without", "deny", "denies", "don't", "dont", "doesn't", "didn't",
    "haven't", "hasn't", "isn't", "wasn't", "لا", "ليس", "ليست", "لم", "بدون",
];

/// How many words before a match are searched for a negation cue
const NEGATION_WINDOW: usize = 4;

fn is_negated(prefix: &str) -> bool {
    let clause = prefix
        .rsplit(|c: char| matches!(c, '.' | ',' | ';' | '!' | '?' | '،' | '؛'))
        .next()
        .unwrap_or(prefix);
    clause
        .split_whitespace()
        .rev()
        .take(NEGATION_WINDOW)
        .any(|word| {
            let word = word.replace('\u{2019}', "'");
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            NEGATION_CUES.contains(&word.as_str())
        })
}

impl RedFlagPattern {
    /// True when some match in `text` is not preceded by a negation cue
    fn affirmed_in(&self, text: &str) -> bool {
        self.regex
            .find_iter(text)
            .any(|m| !is_negated(text.get(..m.start()).unwrap_or_default()))
    }

    fn ruled_out(&self, state: &ConversationState) -> bool {
        state.ruled_out.contains(self.label)
            || state.ruled_out.iter().any(|term| self.regex.is_match(term))
    }
}

/// Labels of every red flag found in the state and the latest utterance,
/// in table order, each at most once.
///
/// A flag the patient has ruled out, or only mentions in a negated phrase
/// ("no chest pain"), is not reported.
pub fn detect_red_flags(state: &ConversationState, utterance: &str) -> Vec<String> {
    let texts: Vec<&str> = state
        .reported_terms()
        .chain(state.severity.as_deref())
        .chain(std::iter::once(utterance))
        .collect();

    RED_FLAG_PATTERNS
        .iter()
        .filter(|p| !p.ruled_out(state))
        .filter(|p| texts.iter().any(|t| p.affirmed_in(t)))
        .map(|p| p.label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(utterance: &str) -> Vec<String> {
        detect_red_flags(&ConversationState::default(), utterance)
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(RED_FLAG_PATTERNS.len(), 9);
    }

    #[test]
    fn test_english_phrases() {
        assert_eq!(detect("I have chest tightness"), vec!["chest pain"]);
        assert_eq!(detect("I can't breathe properly"), vec!["difficulty breathing"]);
        assert_eq!(detect("I passed out this morning"), vec!["loss of consciousness"]);
        assert_eq!(detect("this is the worst headache ever"), vec!["worst headache of life"]);
        assert_eq!(detect("pain is 10/10"), vec!["severe pain"]);
    }

    #[test]
    fn test_arabic_phrases() {
        assert_eq!(detect("عندي ألم في الصدر"), vec!["chest pain"]);
        assert_eq!(detect("أعاني من ضيق في التنفس"), vec!["difficulty breathing"]);
        assert_eq!(detect("حدث لي إغماء"), vec!["loss of consciousness"]);
    }

    #[test]
    fn test_benign_text_has_no_flags() {
        assert!(detect("I have a mild headache and a runny nose").is_empty());
        assert!(detect("my chest of drawers fell on my toe").is_empty());
    }

    #[test]
    fn test_scans_accumulated_state() {
        let mut state = ConversationState::default();
        state.associated_symptoms.insert("Coughing up blood");
        state.severity = Some("excruciating".to_string());
        let flags = detect_red_flags(&state, "nothing new");
        assert_eq!(flags, vec!["severe bleeding", "severe pain"]);
    }

    #[test]
    fn test_negated_mentions_are_ignored() {
        assert!(detect("No, I do not have any chest pain").is_empty());
        assert!(detect("I don\u{2019}t have trouble breathing").is_empty());
        assert!(detect("ليس عندي ألم في الصدر").is_empty());
        // Negation stops at the clause boundary
        assert_eq!(detect("no fever, but chest pain since noon"), vec!["chest pain"]);
    }

    #[test]
    fn test_ruled_out_flags_are_skipped() {
        let mut state = ConversationState::default();
        state.ruled_out.insert("chest pain");
        assert!(detect_red_flags(&state, "my chest pain is worse").is_empty());

        let mut state = ConversationState::default();
        state.ruled_out.insert("shortness of breath");
        assert!(detect_red_flags(&state, "shortness of breath").is_empty());
    }

    #[test]
    fn test_each_flag_reported_once() {
        let mut state = ConversationState::default();
        state.symptoms.insert("chest pain");
        assert_eq!(detect_red_flags(&state, "chest pressure too"), vec!["chest pain"]);
    }
}
