//! Pure state transition function
//!
//! Given the same phase, conversation, config and event this always produces
//! the same result. All I/O happens in the runtime, driven by the effects.

use super::{ConversationState, Effect, Event, Language, Stage, TurnPhase};
use crate::assessment::{fallback_assessment, finalize, Assessment};
use crate::config::IntakeConfig;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub phase: TurnPhase,
    pub conversation: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(phase: TurnPhase, conversation: ConversationState) -> Self {
        Self {
            phase,
            conversation,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Utterance is empty")]
    EmptyUtterance,
    #[error("A turn is already in progress")]
    TurnInProgress,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Opening message for a new conversation. Does not touch any state.
pub fn greeting(config: &IntakeConfig, language: Language) -> TransitionResult {
    TransitionResult::new(TurnPhase::Idle, ConversationState::new(language)).with_effect(
        Effect::reply(config.fallback.greeting(language), Stage::Greeting),
    )
}

/// Pure transition function
pub fn transition(
    phase: &TurnPhase,
    conversation: &ConversationState,
    config: &IntakeConfig,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (phase, event) {
        // ============================================================
        // Patient utterance
        // ============================================================
        (TurnPhase::Idle, Event::UserUtterance { text }) => {
            let utterance = text.trim();
            if utterance.is_empty() {
                return Err(TransitionError::EmptyUtterance);
            }

            let turn = conversation.step_count;
            // The step this turn will land on decides whether we are done
            if turn.saturating_add(1) >= config.step_threshold {
                Ok(TransitionResult::new(
                    TurnPhase::Assessing {
                        turn,
                        utterance: utterance.to_string(),
                    },
                    conversation.clone(),
                )
                .with_effect(Effect::RequestAssessment {
                    utterance: utterance.to_string(),
                }))
            } else {
                Ok(
                    TransitionResult::new(TurnPhase::Extracting { turn }, conversation.clone())
                        .with_effect(Effect::RequestExtraction {
                            utterance: utterance.to_string(),
                        }),
                )
            }
        }

        (TurnPhase::Extracting { .. } | TurnPhase::Assessing { .. }, Event::UserUtterance { .. }) => {
            Err(TransitionError::TurnInProgress)
        }

        // ============================================================
        // Gathering
        // ============================================================
        (TurnPhase::Extracting { turn }, Event::ExtractionComplete { extraction }) => {
            let mut next = conversation.clone();
            next.merge(&extraction.fields);
            next.advance_step();

            let question = extraction.follow_up.trim();
            let text = if question.is_empty() {
                config.fallback.question(next.language, *turn)
            } else {
                question
            };
            let reply = Effect::reply(text, Stage::Gathering);
            Ok(TransitionResult::new(TurnPhase::Idle, next).with_effect(reply))
        }

        (TurnPhase::Extracting { turn }, Event::ExtractionFailed { .. }) => {
            let mut next = conversation.clone();
            next.advance_step();
            let reply = Effect::reply(
                config.fallback.question(next.language, *turn),
                Stage::Gathering,
            );
            Ok(TransitionResult::new(TurnPhase::Idle, next).with_effect(reply))
        }

        // ============================================================
        // Final assessment
        // ============================================================
        (TurnPhase::Assessing { utterance, .. }, Event::AssessmentComplete { draft }) => {
            let mut next = conversation.clone();
            next.advance_step();
            let assessment = finalize(draft, &next, utterance);
            Ok(complete(next, assessment))
        }

        (TurnPhase::Assessing { utterance, .. }, Event::AssessmentFailed { .. }) => {
            let mut next = conversation.clone();
            next.advance_step();
            let assessment = fallback_assessment(&next, utterance);
            Ok(complete(next, assessment))
        }

        // ============================================================
        // Invalid
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {}",
            event.name(),
            phase.name()
        ))),
    }
}

fn complete(conversation: ConversationState, assessment: Assessment) -> TransitionResult {
    let text = assessment.report(conversation.language).summary.clone();
    TransitionResult::new(TurnPhase::Idle, conversation)
        .with_effect(Effect::PublishAssessment { assessment })
        .with_effect(Effect::reply(text, Stage::Complete))
}
