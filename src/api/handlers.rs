//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, StartRequest, TurnRequest, TurnResponse};
use super::AppState;
use crate::state_machine::{ConversationState, Language, TransitionError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/intake/start", post(start_intake))
        .route("/api/intake/turn", post(intake_turn))
        .route("/api/health", get(health))
        .with_state(state)
}

// ============================================================
// Intake
// ============================================================

async fn start_intake(
    State(state): State<AppState>,
    body: Option<Json<StartRequest>>,
) -> Json<TurnResponse> {
    let language = body
        .and_then(|Json(req)| req.language)
        .as_deref()
        .map_or(Language::En, Language::parse_or_default);
    Json(state.controller.start(language).into())
}

async fn intake_turn(
    State(state): State<AppState>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let mut conversation = match req.prior_state {
        Some(value) => ConversationState::from_json(value)
            .map_err(|e| AppError::BadRequest(format!("Invalid priorState: {e}")))?,
        None => ConversationState::default(),
    };
    if let Some(language) = req.language.as_deref().and_then(Language::parse) {
        conversation.language = language;
    }

    let outcome = state.controller.advance(conversation, &req.utterance).await?;
    Ok(Json(outcome.into()))
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model: state.model_id.clone(),
    })
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::EmptyUtterance => AppError::BadRequest(err.to_string()),
            // Each request drives its own turn from idle, so this only fires
            // if the controller ever starts sharing turns across requests.
            TransitionError::TurnInProgress => AppError::Conflict(err.to_string()),
            TransitionError::InvalidTransition(_) => {
                tracing::error!(error = %err, "Turn ended in an invalid transition");
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
