//! Anthropic Claude tokenizer implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::Provider;
use crate::config::ProviderConfig;
use crate::tokenizer::error::{TokenizerError, TokenizerResult};
use crate::tokenizer::model::{ModelProvider, ModelSpec};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude tokenizer implementation, backed by the token counting endpoint
pub struct ClaudeProvider {
    model: ModelSpec,
    settings: ProviderConfig,
    client: Client,
}

impl ClaudeProvider {
    /// Create a new Claude tokenizer
    pub fn new(model: ModelSpec, settings: ProviderConfig) -> Self {
        Self {
            model,
            settings,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    async fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        let api_key = self.settings.require_key(ModelProvider::Anthropic)?;

        let response = self
            .client
            .post(format!("{}/v1/messages/count_tokens", self.settings.base_url))
            .header("x-api-key", api_key)
            .header("content-type", "application/json")
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model.name,
                "messages": [{
                    "role": "user",
                    "content": text
                }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error message".to_string());

            return Err(TokenizerError::ApiError(format!(
                "Claude API returned error status {}: {}",
                status, error_text
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            input_tokens: usize,
        }

        let token_response: TokenResponse = response.json().await?;

        Ok(token_response.input_tokens)
    }

    fn model(&self) -> &ModelSpec {
        &self.model
    }
}
