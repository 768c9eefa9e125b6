//! Google Gemini tokenizer implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::Provider;
use crate::config::ProviderConfig;
use crate::tokenizer::error::{TokenizerError, TokenizerResult};
use crate::tokenizer::model::{ModelProvider, ModelSpec};

/// Gemini tokenizer implementation, backed by the countTokens endpoint
pub struct GoogleProvider {
    model: ModelSpec,
    settings: ProviderConfig,
    client: Client,
}

impl GoogleProvider {
    /// Create a new Gemini tokenizer
    pub fn new(model: ModelSpec, settings: ProviderConfig) -> Self {
        Self {
            model,
            settings,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        let api_key = self.settings.require_key(ModelProvider::Google)?;

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:countTokens",
                self.settings.base_url, self.model.name
            ))
            .query(&[("key", api_key)])
            .json(&json!({
                "contents": [{
                    "parts": [{ "text": text }]
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
                "Gemini API returned error status {}: {}",
                status, error_text
            )));
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TokenResponse {
            #[serde(default)]
            total_tokens: usize,
        }

        let token_response: TokenResponse = response.json().await?;

        Ok(token_response.total_tokens)
    }

    fn model(&self) -> &ModelSpec {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let provider = GoogleProvider::new(
            ModelSpec::new(ModelProvider::Google, "gemini-2.0-flash"),
            Config::default().google,
        );
        let err = provider.count_tokens("Hello, Gemini!").await.unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }
}
