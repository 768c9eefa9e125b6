//! Google Gemini embedding endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{Embedder, Embedding};
use crate::config::ProviderConfig;
use crate::tokenizer::{ModelProvider, ModelSpec, TokenizerError, TokenizerResult};

/// Embedder backed by `models/{model}:batchEmbedContents`
pub struct GoogleEmbedder {
    model: ModelSpec,
    settings: ProviderConfig,
    client: Client,
}

impl GoogleEmbedder {
    /// Create a new Gemini embedder
    pub fn new(model: ModelSpec, settings: ProviderConfig) -> Self {
        Self {
            model,
            settings,
            client: Client::new(),
        }
    }

    fn request_body(&self, texts: &[String]) -> serde_json::Value {
        let model_path = format!("models/{}", self.model.name);
        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": model_path,
                    "content": { "parts": [{ "text": text }] }
                })
            })
            .collect();
        json!({ "requests": requests })
    }
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Embedding,
}

#[async_trait]
impl Embedder for GoogleEmbedder {
    async fn embed_many(&self, texts: &[String]) -> TokenizerResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.settings.require_key(ModelProvider::Google)?;

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:batchEmbedContents",
                self.settings.base_url, self.model.name
            ))
            .query(&[("key", api_key)])
            .json(&self.request_body(texts))
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

        let body: BatchEmbedResponse = response.json().await?;
        if body.embeddings.len() != texts.len() {
            return Err(TokenizerError::ApiError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn model(&self) -> &ModelSpec {
        &self.model
    }
}
