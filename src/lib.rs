//! Symptom intake engine
//!
//! A multi-turn conversational intake: each patient turn updates a
//! caller-held state, one clarifying question is asked per turn, and once the
//! step threshold is reached a triaged, bilingual assessment is produced.

pub mod api;
pub mod assessment;
pub mod config;
pub mod llm;
pub mod reasoner;
pub mod runtime;
pub mod state_machine;
