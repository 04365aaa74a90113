//! External reasoner adapter
//!
//! Turns one patient utterance plus the accumulated state into structured
//! facts and a follow-up question, or into a draft assessment. The hosted
//! model is reached through [`LlmService`]; there are no retries here, a
//! failed call is reported and the controller falls back.

mod parse;
mod prompt;

pub use parse::{extract_json_block, parse_assessment, parse_extraction};

use crate::assessment::AssessmentDraft;
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use crate::state_machine::{ConversationState, ExtractedFields};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Facts pulled from one utterance plus the model's next question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub fields: ExtractedFields,
    /// May be blank; the controller substitutes a fallback question
    pub follow_up: String,
}

#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("upstream error: {0}")]
    Upstream(#[from] LlmError),
    #[error("reasoner timed out after {0:?}")]
    Timeout(Duration),
    #[error("reasoner returned an empty response")]
    EmptyResponse,
    #[error("malformed reasoner output: {0}")]
    Malformed(String),
}

impl ReasonerError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReasonerError::Upstream(_) => FailureKind::Upstream,
            ReasonerError::Timeout(_) => FailureKind::Timeout,
            ReasonerError::EmptyResponse => FailureKind::EmptyResponse,
            ReasonerError::Malformed(_) => FailureKind::Malformed,
        }
    }
}

/// Why a reasoner call produced no usable answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Upstream,
    Timeout,
    EmptyResponse,
    Malformed,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Upstream => "upstream",
            FailureKind::Timeout => "timeout",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::Malformed => "malformed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of extraction and assessment answers
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn extract(
        &self,
        state: &ConversationState,
        utterance: &str,
    ) -> Result<Extraction, ReasonerError>;

    async fn finalize(
        &self,
        state: &ConversationState,
        utterance: &str,
    ) -> Result<AssessmentDraft, ReasonerError>;
}

/// [`Reasoner`] backed by a hosted LLM
pub struct LlmReasoner {
    llm: Arc<dyn LlmService>,
    max_tokens: u32,
}

impl LlmReasoner {
    pub fn new(llm: Arc<dyn LlmService>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    async fn ask(
        &self,
        system: &str,
        state: &ConversationState,
        utterance: &str,
    ) -> Result<String, ReasonerError> {
        let request = LlmRequest {
            system: system.to_string(),
            messages: vec![LlmMessage::user(prompt::user_turn(state, utterance))],
            max_tokens: Some(self.max_tokens),
            json_output: true,
        };
        let response = self.llm.complete(&request).await?;
        Ok(response.text)
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn extract(
        &self,
        state: &ConversationState,
        utterance: &str,
    ) -> Result<Extraction, ReasonerError> {
        let raw = self.ask(prompt::EXTRACTION_SYSTEM, state, utterance).await?;
        parse_extraction(&raw)
    }

    async fn finalize(
        &self,
        state: &ConversationState,
        utterance: &str,
    ) -> Result<AssessmentDraft, ReasonerError> {
        let raw = self.ask(prompt::ASSESSMENT_SYSTEM, state, utterance).await?;
        parse_assessment(&raw)
    }
}
