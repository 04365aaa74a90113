//! Runtime for executing intake turns
//!
//! Drives the pure transition function and carries out its effects against a
//! [`Reasoner`]. Holds no per-conversation state: every call gets the
//! caller's state and returns the updated one.

#[cfg(test)]
pub mod testing;

use crate::assessment::Assessment;
use crate::config::IntakeConfig;
use crate::reasoner::{LlmReasoner, Reasoner, ReasonerError};
use crate::state_machine::{
    greeting, transition, ConversationState, Effect, Event, Language, Stage, TransitionError,
    TurnPhase,
};
use std::collections::VecDeque;
use std::future::Future;

/// Everything the caller gets back from one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub state: ConversationState,
    pub stage: Stage,
    pub assessment: Option<Assessment>,
}

/// Executes intake turns; cheap to share behind an `Arc`
pub struct IntakeController<R = LlmReasoner> {
    reasoner: R,
    config: IntakeConfig,
}

impl<R: Reasoner> IntakeController<R> {
    pub fn new(reasoner: R, config: IntakeConfig) -> Self {
        Self { reasoner, config }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn reasoner(&self) -> &R {
        &self.reasoner
    }

    /// Greeting for a fresh conversation
    pub fn start(&self, language: Language) -> TurnOutcome {
        let result = greeting(&self.config, language);
        let (reply, stage) = result
            .effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::Reply { text, stage } => Some((text, stage)),
                _ => None,
            })
            .unwrap_or_else(|| {
                (
                    self.config.fallback.greeting(language).to_string(),
                    Stage::Greeting,
                )
            });

        TurnOutcome {
            reply,
            state: result.conversation,
            stage,
            assessment: None,
        }
    }

    /// Run one patient turn to completion
    pub async fn advance(
        &self,
        state: ConversationState,
        utterance: &str,
    ) -> Result<TurnOutcome, TransitionError> {
        let mut phase = TurnPhase::Idle;
        let mut conversation = state;
        let mut pending = VecDeque::from([Event::UserUtterance {
            text: utterance.to_string(),
        }]);
        let mut reply: Option<(String, Stage)> = None;
        let mut assessment: Option<Assessment> = None;

        while let Some(event) = pending.pop_front() {
            let event_name = event.name();
            let result = transition(&phase, &conversation, &self.config, event)?;
            tracing::debug!(
                event = event_name,
                from = phase.name(),
                to = result.phase.name(),
                step = result.conversation.step_count,
                effects = result.effects.len(),
                "Transition"
            );
            phase = result.phase;
            conversation = result.conversation;

            for effect in result.effects {
                match effect {
                    Effect::RequestExtraction { utterance } => {
                        let event = self.request_extraction(&conversation, &utterance).await;
                        pending.push_back(event);
                    }
                    Effect::RequestAssessment { utterance } => {
                        let event = self.request_assessment(&conversation, &utterance).await;
                        pending.push_back(event);
                    }
                    Effect::PublishAssessment { assessment: published } => {
                        tracing::info!(
                            triage = %published.triage_level,
                            red_flags = published.red_flags.len(),
                            candidates = published.en.differential.len(),
                            degraded = published.degraded,
                            step = conversation.step_count,
                            "Assessment published"
                        );
                        assessment = Some(published);
                    }
                    Effect::Reply { text, stage } => {
                        reply = Some((text, stage));
                    }
                }
            }
        }

        let (reply, stage) = reply.ok_or_else(|| {
            TransitionError::InvalidTransition(format!("turn ended {} without a reply", phase.name()))
        })?;

        Ok(TurnOutcome {
            reply,
            state: conversation,
            stage,
            assessment,
        })
    }

    async fn request_extraction(&self, state: &ConversationState, utterance: &str) -> Event {
        match self.bounded(self.reasoner.extract(state, utterance)).await {
            Ok(extraction) => {
                if extraction.follow_up.trim().is_empty() {
                    tracing::warn!(
                        failure = "blank_question",
                        step = state.step_count,
                        "Reasoner gave no follow-up question, using fallback"
                    );
                }
                if extraction.fields.is_empty() {
                    tracing::debug!(step = state.step_count, "Extraction found no new facts");
                }
                Event::ExtractionComplete { extraction }
            }
            Err(e) => {
                tracing::warn!(
                    failure = %e.kind(),
                    error = %e,
                    step = state.step_count,
                    "Extraction failed, using fallback question"
                );
                Event::ExtractionFailed {
                    failure: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    async fn request_assessment(&self, state: &ConversationState, utterance: &str) -> Event {
        match self.bounded(self.reasoner.finalize(state, utterance)).await {
            Ok(draft) => Event::AssessmentComplete { draft },
            Err(e) => {
                tracing::warn!(
                    failure = %e.kind(),
                    error = %e,
                    step = state.step_count,
                    "Assessment failed, using fallback assessment"
                );
                Event::AssessmentFailed {
                    failure: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// A call that outlives the configured timeout counts as a failed call
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ReasonerError>>,
    ) -> Result<T, ReasonerError> {
        let limit = self.config.reasoner_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(ReasonerError::Timeout(limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{DelayedMockLlmService, MockLlmService};
    use super::*;
    use crate::assessment::TriageLevel;
    use crate::llm::{LlmError, LlmResponse, LlmService};
    use std::sync::Arc;
    use std::time::Duration;

    fn controller(llm: Arc<dyn LlmService>) -> IntakeController {
        IntakeController::new(LlmReasoner::new(llm, 512), IntakeConfig::default())
    }

    fn state_at(step_count: u32, language: Language) -> ConversationState {
        let mut state = ConversationState::new(language);
        state.step_count = step_count;
        state
    }

    #[tokio::test]
    async fn test_first_turn_gathers_headache() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_response(LlmResponse::from_text(
            r#"{"symptoms": ["headache"], "followUpQuestion": "When did the headache start?"}"#,
        ));
        let controller = controller(llm);

        let outcome = controller
            .advance(ConversationState::default(), "I have a headache")
            .await
            .unwrap();

        assert_eq!(outcome.stage, Stage::Gathering);
        assert_eq!(outcome.state.step_count, 1);
        assert!(outcome.state.symptoms.iter().any(|s| s.contains("headache")));
        assert_eq!(outcome.reply, "When did the headache start?");
        assert!(outcome.assessment.is_none());
    }

    #[tokio::test]
    async fn test_threshold_minus_one_completes() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_response(LlmResponse::from_text(
            r#"{"triageLevel": "green", "differential": [{"name": "Tension headache", "probability": 0.5}]}"#,
        ));
        let controller = controller(llm);
        let threshold = controller.config().step_threshold;

        let outcome = controller
            .advance(state_at(threshold - 1, Language::En), "nothing else")
            .await
            .unwrap();

        assert_eq!(outcome.stage, Stage::Complete);
        assert_eq!(outcome.state.step_count, threshold);
        let assessment = outcome.assessment.unwrap();
        assert_eq!(assessment.triage_level, TriageLevel::Green);
        assert_eq!(outcome.reply, assessment.en.summary);
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back_to_indexed_question() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_error(LlmError::rate_limit("slow down"));
        let controller = controller(llm);

        let outcome = controller
            .advance(state_at(2, Language::Ar), "الألم مستمر")
            .await
            .unwrap();

        assert_eq!(outcome.stage, Stage::Gathering);
        assert_eq!(outcome.state.step_count, 3);
        assert_eq!(outcome.reply, controller.config().fallback.ar.questions[2]);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_response(LlmResponse::from_text("{\"symptoms\": [\"cough\""));
        let controller = controller(llm);

        let outcome = controller
            .advance(state_at(0, Language::En), "I keep coughing")
            .await
            .unwrap();
        assert_eq!(outcome.reply, controller.config().fallback.en.questions[0]);
        assert!(outcome.state.symptoms.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let llm = Arc::new(DelayedMockLlmService::new("slow", Duration::from_secs(10)));
        llm.queue_response(LlmResponse::from_text(
            r#"{"symptoms": ["rash"], "followUpQuestion": "Does it itch?"}"#,
        ));
        let config = IntakeConfig {
            reasoner_timeout: Duration::from_millis(50),
            ..IntakeConfig::default()
        };
        let controller = IntakeController::new(LlmReasoner::new(llm, 512), config);

        let outcome = controller
            .advance(state_at(1, Language::En), "I have a rash")
            .await
            .unwrap();

        assert_eq!(outcome.state.step_count, 2);
        assert_eq!(outcome.reply, controller.config().fallback.en.questions[1]);
        assert!(outcome.state.symptoms.is_empty());
    }

    #[tokio::test]
    async fn test_red_flag_forces_red_even_if_model_says_green() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_response(LlmResponse::from_text(
            r#"{"triageLevel": "green", "differential": [{"name": "Muscle strain", "probability": 0.4}], "redFlags": []}"#,
        ));
        let controller = controller(llm);
        let threshold = controller.config().step_threshold;

        let mut state = state_at(threshold - 1, Language::En);
        state.symptoms.insert("chest pain");
        let outcome = controller.advance(state, "it spreads to my arm").await.unwrap();

        let assessment = outcome.assessment.unwrap();
        assert_eq!(assessment.triage_level, TriageLevel::Red);
        assert!(assessment.red_flags.iter().any(|f| f == "chest pain"));
    }

    #[tokio::test]
    async fn test_assessment_failure_publishes_fallback() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_error(LlmError::network("connection reset"));
        let controller = controller(llm);
        let threshold = controller.config().step_threshold;

        let outcome = controller
            .advance(state_at(threshold + 3, Language::Ar), "شكراً")
            .await
            .unwrap();

        assert_eq!(outcome.stage, Stage::Complete);
        assert_eq!(outcome.state.step_count, threshold + 4);
        let assessment = outcome.assessment.unwrap();
        assert!(assessment.degraded);
        assert_eq!(outcome.reply, assessment.ar.summary);
    }

    #[tokio::test]
    async fn test_blank_utterance_rejected_without_calling_reasoner() {
        let llm = Arc::new(MockLlmService::new("mock"));
        let controller = controller(llm.clone());

        let err = controller
            .advance(ConversationState::default(), "   ")
            .await
            .unwrap_err();
        assert_eq!(err, TransitionError::EmptyUtterance);
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_full_conversation_reaches_complete() {
        let llm = Arc::new(MockLlmService::new("mock"));
        let controller = controller(llm.clone());
        let threshold = controller.config().step_threshold;

        for _ in 1..threshold {
            llm.queue_response(LlmResponse::from_text(
                r#"{"symptoms": ["sore throat"], "followUpQuestion": "Anything else?"}"#,
            ));
        }
        llm.queue_response(LlmResponse::from_text(
            r#"{"triageLevel": "green", "differential": [{"name": "Common cold", "probability": 0.6}]}"#,
        ));

        let mut outcome = controller.start(Language::En);
        assert_eq!(outcome.stage, Stage::Greeting);
        assert_eq!(outcome.state.step_count, 0);

        for turn in 1..=threshold {
            let previous = outcome.state.step_count;
            outcome = controller
                .advance(outcome.state, "my throat hurts")
                .await
                .unwrap();
            assert_eq!(outcome.state.step_count, previous + 1);
            if turn < threshold {
                assert_eq!(outcome.stage, Stage::Gathering);
            }
        }

        assert_eq!(outcome.stage, Stage::Complete);
        let assessment = outcome.assessment.unwrap();
        assert_eq!(assessment.en.differential[0].name, "Common cold");
        assert_eq!(assessment.ar.differential[0].name, "نزلة برد");
        assert_eq!(llm.recorded_requests().len(), threshold as usize);
    }
}
