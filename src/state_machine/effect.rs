//! Effects produced by state transitions

use super::Stage;
use crate::assessment::Assessment;

/// Effects to be executed after a state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Ask the reasoner for facts and a follow-up question
    RequestExtraction { utterance: String },

    /// Ask the reasoner for the final assessment
    RequestAssessment { utterance: String },

    /// Hand the finished assessment to the caller
    PublishAssessment { assessment: Assessment },

    /// Text shown to the patient for this turn
    Reply { text: String, stage: Stage },
}

impl Effect {
    pub fn reply(text: impl Into<String>, stage: Stage) -> Self {
        Effect::Reply {
            text: text.into(),
            stage,
        }
    }
}
