//! Symptom intake server
//!
//! Serves the intake engine over HTTP. Conversation state lives with the
//! caller; the server keeps none between requests.

use std::net::SocketAddr;
use std::time::Duration;
use symptom_intake::api::{create_router, AppState};
use symptom_intake::config::IntakeConfig;
use symptom_intake::llm::{LlmConfig, ModelRegistry};
use symptom_intake::reasoner::LlmReasoner;
use symptom_intake::runtime::IntakeController;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Slack between the per-turn timeout and the HTTP client's own timeout
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "symptom_intake=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("INTAKE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let intake_config = IntakeConfig::from_env()?;
    tracing::info!(
        step_threshold = intake_config.step_threshold,
        timeout_secs = intake_config.reasoner_timeout.as_secs(),
        max_tokens = intake_config.max_tokens,
        "Intake configuration loaded"
    );

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let registry = ModelRegistry::new(
        &llm_config,
        intake_config.reasoner_timeout + CLIENT_TIMEOUT_SLACK,
    )?;

    let Some(llm) = registry.default_service() else {
        tracing::error!(
            default = %registry.default_model_id(),
            available = ?registry.available_models(),
            "Default model is not available. Set ANTHROPIC_API_KEY, OPENAI_API_KEY or LLM_GATEWAY."
        );
        return Err("no LLM model configured".into());
    };
    tracing::info!(
        models = ?registry.available_models(),
        default = %registry.default_model_id(),
        "LLM registry initialized"
    );

    // Create application state
    let max_tokens = intake_config.max_tokens;
    let controller = IntakeController::new(LlmReasoner::new(llm, max_tokens), intake_config);
    let state = AppState::new(controller);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Symptom intake server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
