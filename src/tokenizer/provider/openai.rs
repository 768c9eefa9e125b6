//! OpenAI tokenizer implementation using tiktoken

use async_trait::async_trait;
use tiktoken_rs::CoreBPE;

use super::Provider;
use crate::tokenizer::error::{TokenizerError, TokenizerResult};
use crate::tokenizer::model::ModelSpec;

/// OpenAI tokenizer implementation
pub struct OpenAIProvider {
    model: ModelSpec,
    encoding: CoreBPE,
}

impl OpenAIProvider {
    /// Create a new OpenAI tokenizer.
    ///
    /// Models unknown to tiktoken fall back to the `o200k_base` encoding.
    pub fn new(model: ModelSpec) -> TokenizerResult<Self> {
        let encoding = match tiktoken_rs::get_bpe_from_model(&model.name) {
            Ok(encoding) => encoding,
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "unknown OpenAI model, using o200k_base");
                tiktoken_rs::o200k_base()
                    .map_err(|e| TokenizerError::TokenizerError(e.to_string()))?
            }
        };

        Ok(Self { model, encoding })
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        let tokens = self.encoding.encode_ordinary(text);
        Ok(tokens.len())
    }

    fn model(&self) -> &ModelSpec {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::model::ModelProvider;

    #[tokio::test]
    async fn test_counts_locally() {
        let provider = OpenAIProvider::new(ModelSpec::new(ModelProvider::OpenAI, "gpt-4o")).unwrap();

        assert_eq!(provider.count_tokens("").await.unwrap(), 0);
        let count = provider.count_tokens("Hello, world!").await.unwrap();
        assert!(count > 0);
        assert!(count < "Hello, world!".len());
    }

    #[tokio::test]
    async fn test_unknown_model_falls_back() {
        let provider =
            OpenAIProvider::new(ModelSpec::new(ModelProvider::OpenAI, "gpt-nonexistent-9")).unwrap();
        assert!(provider.count_tokens("fallback encoding").await.unwrap() > 0);
    }
}
