//! Embedding providers
//!
//! Produces embedding vectors through the vendor APIs that offer them.

mod google;
mod openai;

use async_trait::async_trait;

use crate::config::Config;
use crate::tokenizer::{ModelProvider, ModelSpec, TokenizerError, TokenizerResult};

pub use google::GoogleEmbedder;
pub use openai::OpenAIEmbedder;

/// A dense embedding vector
pub type Embedding = Vec<f32>;

/// Asynchronous embedding capability bound to one model
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each input text; output order matches input order
    async fn embed_many(&self, texts: &[String]) -> TokenizerResult<Vec<Embedding>>;

    /// Model this embedder uses
    fn model(&self) -> &ModelSpec;

    /// Embed a single text
    async fn embed(&self, text: &str) -> TokenizerResult<Embedding> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            TokenizerError::ApiError(format!("{} returned no embedding", self.model()))
        })
    }
}

/// Create an embedder for the specified model
pub fn create_embedder(model: &ModelSpec, config: &Config) -> TokenizerResult<Box<dyn Embedder>> {
    match model.provider {
        ModelProvider::OpenAI => Ok(Box::new(OpenAIEmbedder::new(
            model.clone(),
            config.openai.clone(),
        ))),
        ModelProvider::Google => Ok(Box::new(GoogleEmbedder::new(
            model.clone(),
            config.google.clone(),
        ))),
        ModelProvider::Anthropic | ModelProvider::HuggingFace => {
            Err(TokenizerError::UnsupportedModel(format!(
                "{} does not provide embeddings",
                model
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_providers() {
        let config = Config::default();
        for model in ["claude-3-7-sonnet-latest", "meta-llama/Llama-3-8b-hf"] {
            let spec = ModelSpec::parse(model).unwrap();
            assert!(matches!(
                create_embedder(&spec, &config),
                Err(TokenizerError::UnsupportedModel(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_empty_batch_needs_no_request() {
        // No API key configured: an empty batch must still succeed
        let config = Config::default();
        for model in ["openai:text-embedding-3-small", "google:text-embedding-004"] {
            let embedder = create_embedder(&ModelSpec::parse(model).unwrap(), &config).unwrap();
            assert!(embedder.embed_many(&[]).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let embedder = create_embedder(
            &ModelSpec::parse("text-embedding-3-small").unwrap(),
            &Config::default(),
        )
        .unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, TokenizerError::EnvVarError(_)));
    }
}
