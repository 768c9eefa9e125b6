//! OpenAI embeddings endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{Embedder, Embedding};
use crate::config::ProviderConfig;
use crate::tokenizer::{ModelProvider, ModelSpec, TokenizerError, TokenizerResult};

/// Embedder backed by `POST /v1/embeddings`
pub struct OpenAIEmbedder {
    model: ModelSpec,
    settings: ProviderConfig,
    client: Client,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(model: ModelSpec, settings: ProviderConfig) -> Self {
        Self {
            model,
            settings,
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Embedding,
}

/// Reorder response items by their `index` field
fn into_ordered(mut data: Vec<EmbeddingData>, expected: usize) -> TokenizerResult<Vec<Embedding>> {
    if data.len() != expected {
        return Err(TokenizerError::ApiError(format!(
            "expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_many(&self, texts: &[String]) -> TokenizerResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.settings.require_key(ModelProvider::OpenAI)?;

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.settings.base_url))
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.model.name,
                "input": texts,
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
                "OpenAI API returned error status {}: {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response.json().await?;
        into_ordered(body.data, texts.len())
    }

    fn model(&self) -> &ModelSpec {
        &self.model
    }
}
