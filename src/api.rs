//! HTTP API for the intake engine
//!
//! Stateless: the caller holds the conversation state and sends it back with
//! every turn.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::IntakeController;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<IntakeController>,
    pub model_id: String,
}

impl AppState {
    pub fn new(controller: IntakeController) -> Self {
        let model_id = controller.reasoner().model_id().to_string();
        Self {
            controller: Arc::new(controller),
            model_id,
        }
    }
}
