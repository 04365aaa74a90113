//! Centralized model definitions for all LLM providers

use super::anthropic::AnthropicModel;
use super::openai::OpenAIModel;
use super::{AnthropicService, LlmService, OpenAIService};
use reqwest::Client;
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "claude-4.5-haiku")
    pub id: &'static str,
    /// Provider for this model
    pub provider: Provider,
    /// Factory function to create the service
    pub factory: fn(Client, &str, Option<&str>) -> Arc<dyn LlmService>,
}

/// Get all available model definitions
///
/// Intake turns are short and latency-sensitive, so the list favours the
/// fast tiers.
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "claude-4.5-haiku",
            provider: Provider::Anthropic,
            factory: |client, api_key, gateway| {
                Arc::new(AnthropicService::new(
                    client,
                    api_key.to_string(),
                    AnthropicModel::Claude45Haiku,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "claude-4.5-sonnet",
            provider: Provider::Anthropic,
            factory: |client, api_key, gateway| {
                Arc::new(AnthropicService::new(
                    client,
                    api_key.to_string(),
                    AnthropicModel::Claude45Sonnet,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            factory: |client, api_key, gateway| {
                Arc::new(OpenAIService::new(
                    client,
                    api_key.to_string(),
                    OpenAIModel::GPT4oMini,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            factory: |client, api_key, gateway| {
                Arc::new(OpenAIService::new(
                    client,
                    api_key.to_string(),
                    OpenAIModel::GPT4o,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "gpt-5-mini",
            provider: Provider::OpenAI,
            factory: |client, api_key, gateway| {
                Arc::new(OpenAIService::new(
                    client,
                    api_key.to_string(),
                    OpenAIModel::GPT5Mini,
                    gateway,
                ))
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_model_ids_are_unique() {
        let ids: HashSet<_> = all_models().iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), all_models().len());
    }

    #[test]
    fn test_factory_model_id_matches_definition() {
        for def in all_models() {
            let service = (def.factory)(Client::new(), "key", None);
            assert_eq!(service.model_id(), def.id, "{} factory", def.id);
        }
    }
}
