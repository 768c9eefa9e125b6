//! Provider implementations for different tokenizer backends

pub mod anthropic;
pub mod google;
pub mod huggingface;
pub mod openai;

use async_trait::async_trait;

use crate::tokenizer::error::TokenizerResult;
use crate::tokenizer::model::ModelSpec;

/// Trait for tokenizer provider implementations
#[async_trait]
pub trait Provider: Send + Sync {
    /// Count tokens in the given text
    async fn count_tokens(&self, text: &str) -> TokenizerResult<usize>;

    /// Model this provider counts for
    fn model(&self) -> &ModelSpec;
}
