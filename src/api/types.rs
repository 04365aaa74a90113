//! API request and response types

use crate::assessment::Assessment;
use crate::runtime::TurnOutcome;
use crate::state_machine::{ConversationState, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to open a conversation
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub language: Option<String>,
}

/// Request to run one intake turn
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[serde(default)]
    pub utterance: String,
    /// State returned by the previous turn; absent for a fresh conversation
    #[serde(default)]
    pub prior_state: Option<Value>,
    /// Overrides the state's language when it names a supported one
    pub language: Option<String>,
}

/// Response for start and turn
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub reply: String,
    pub new_state: ConversationState,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            reply: outcome.reply,
            new_state: outcome.state,
            stage: outcome.stage,
            assessment: outcome.assessment,
        }
    }
}

/// Response for health checks
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
