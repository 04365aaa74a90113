//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::assessment::{AssessmentDraft, CandidateCondition, Probability, TriageLevel};
use crate::config::IntakeConfig;
use crate::reasoner::{Extraction, FailureKind};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_language() -> impl Strategy<Value = Language> {
    prop_oneof![Just(Language::En), Just(Language::Ar)]
}

fn arb_terms() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z ]{1,16}", 0..4)
}

fn arb_scalar() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z0-9 ]{0,12}")
}

fn arb_fields() -> impl Strategy<Value = ExtractedFields> {
    (
        (arb_terms(), arb_scalar(), arb_scalar(), arb_scalar()),
        (arb_terms(), arb_terms(), arb_terms(), arb_terms()),
        (arb_terms(), arb_terms(), arb_terms()),
    )
        .prop_map(
            |(
                (symptoms, duration, severity, location),
                (aggravating_factors, relieving_factors, associated_symptoms, medical_history),
                (medications, confirmed_symptoms, ruled_out),
            )| ExtractedFields {
                symptoms,
                duration,
                severity,
                location,
                aggravating_factors,
                relieving_factors,
                associated_symptoms,
                medical_history,
                medications,
                confirmed_symptoms,
                ruled_out,
            },
        )
}

fn arb_state() -> impl Strategy<Value = ConversationState> {
    (arb_fields(), 0u32..20, arb_language()).prop_map(|(fields, step_count, language)| {
        let mut state = ConversationState::new(language);
        state.merge(&fields);
        state.step_count = step_count;
        state
    })
}

fn arb_failure() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Upstream),
        Just(FailureKind::Timeout),
        Just(FailureKind::EmptyResponse),
        Just(FailureKind::Malformed),
    ]
}

fn arb_draft() -> impl Strategy<Value = AssessmentDraft> {
    (
        proptest::option::of(prop_oneof![
            Just(TriageLevel::Green),
            Just(TriageLevel::Yellow),
            Just(TriageLevel::Red),
        ]),
        proptest::collection::vec(("[A-Za-z ]{1,12}", 0u16..=10_000), 0..4),
        proptest::collection::vec("[a-z ]{1,12}", 0..2),
    )
        .prop_map(|(suggested_triage, candidates, red_flags)| AssessmentDraft {
            suggested_triage,
            differential: candidates
                .into_iter()
                .map(|(name, bp)| CandidateCondition {
                    name,
                    probability: Probability::from_basis_points(bp),
                    rationale: String::new(),
                })
                .collect(),
            recommendations: vec![],
            red_flags,
        })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::UserUtterance { text }),
        (arb_fields(), "[a-zA-Z ?]{0,20}").prop_map(|(fields, follow_up)| {
            Event::ExtractionComplete {
                extraction: Extraction { fields, follow_up },
            }
        }),
        arb_failure().prop_map(|failure| Event::ExtractionFailed {
            failure,
            message: "failed".to_string(),
        }),
        arb_draft().prop_map(|draft| Event::AssessmentComplete { draft }),
        arb_failure().prop_map(|failure| Event::AssessmentFailed {
            failure,
            message: "failed".to_string(),
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Step count never decreases, whatever the event sequence
    #[test]
    fn prop_step_count_never_decreases(
        start in arb_state(),
        events in proptest::collection::vec(arb_event(), 0..20),
    ) {
        let config = IntakeConfig::default();
        let mut phase = TurnPhase::Idle;
        let mut conversation = start;

        for event in events {
            if let Ok(result) = transition(&phase, &conversation, &config, event) {
                prop_assert!(result.conversation.step_count >= conversation.step_count);
                prop_assert!(
                    result.conversation.step_count <= conversation.step_count + 1,
                    "a single transition advanced more than one step"
                );
                phase = result.phase;
                conversation = result.conversation;
            }
        }
    }

    // Nothing the patient denies is ever also reported
    #[test]
    fn prop_ruled_out_disjoint_from_symptoms(
        batches in proptest::collection::vec(arb_fields(), 1..6),
    ) {
        let mut state = ConversationState::default();
        for fields in &batches {
            state.merge(fields);
        }
        for term in state.ruled_out.iter() {
            prop_assert!(!state.symptoms.contains(term), "{term} in symptoms");
            prop_assert!(!state.confirmed_symptoms.contains(term), "{term} in confirmed");
            prop_assert!(!state.associated_symptoms.contains(term), "{term} in associated");
        }
    }

    // Serialization round-trip is lossless, language included
    #[test]
    fn prop_round_trip_lossless(state in arb_state()) {
        let json = state.to_json();
        let back = ConversationState::from_json(json).unwrap();
        prop_assert_eq!(back, state);
    }

    // A failed extraction replies with the fallback for the prior step, clamped
    #[test]
    fn prop_failed_extraction_uses_indexed_fallback(
        state in arb_state(),
        failure in arb_failure(),
    ) {
        let config = IntakeConfig { step_threshold: 100, ..IntakeConfig::default() };
        let turn = state.step_count;
        let result = transition(
            &TurnPhase::Extracting { turn },
            &state,
            &config,
            Event::ExtractionFailed { failure, message: String::new() },
        ).unwrap();

        let questions = &config.fallback.bank(state.language).questions;
        let index = (turn as usize).min(questions.len() - 1);
        let replied = result.effects.iter().any(|e| matches!(
            e,
            Effect::Reply { text, stage: Stage::Gathering } if *text == questions[index]
        ));
        prop_assert!(replied);
        prop_assert_eq!(result.conversation.step_count, turn + 1);
    }

    // Reaching the threshold always completes with an assessment
    #[test]
    fn prop_threshold_completes(
        state in arb_state(),
        draft in proptest::option::of(arb_draft()),
        threshold in 1u32..10,
    ) {
        let config = IntakeConfig { step_threshold: threshold, ..IntakeConfig::default() };
        let mut state = state;
        state.step_count = threshold - 1;

        let started = transition(&TurnPhase::Idle, &state, &config, Event::UserUtterance {
            text: "still here".to_string(),
        }).unwrap();
        let assessing = matches!(started.phase, TurnPhase::Assessing { .. });
        prop_assert!(assessing, "expected Assessing, got {}", started.phase.name());

        let answer = match draft {
            Some(draft) => Event::AssessmentComplete { draft },
            None => Event::AssessmentFailed {
                failure: FailureKind::Timeout,
                message: String::new(),
            },
        };
        let result = transition(&started.phase, &started.conversation, &config, answer).unwrap();

        prop_assert!(result.conversation.step_count >= threshold);
        let published = result.effects.iter().find_map(|e| match e {
            Effect::PublishAssessment { assessment } => Some(assessment),
            _ => None,
        });
        prop_assert!(published.is_some());
        if let Some(assessment) = published {
            if !assessment.red_flags.is_empty() {
                prop_assert_eq!(assessment.triage_level, TriageLevel::Red);
            }
        }
        let completed = result.effects.iter().any(|e| matches!(
            e,
            Effect::Reply { stage: Stage::Complete, .. }
        ));
        prop_assert!(completed, "expected a complete-stage reply");
    }
}
