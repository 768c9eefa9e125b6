/*!
 * tokenkit - Provider-agnostic token counting for LLMs
 *
 * This library counts tokens and produces embeddings through OpenAI,
 * Anthropic, Google and HuggingFace backends, and builds two utilities on top
 * of token counting: token-bounded text splitting and budget-aware chat
 * message trimming.
 */

pub mod config;
pub mod embedding;
pub mod error;
pub mod message;
pub mod report;
pub mod splitter;
pub mod tokenizer;
pub mod trimmer;

#[cfg(test)]
mod tests;

// Re-export main components for easier access
pub use config::Config;
pub use embedding::{create_embedder, Embedder, Embedding};
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use splitter::{split_max_tokens, Delimiter, SplitOptions};
pub use tokenizer::{
    create_tokenizer, CachingTokenizer, ModelProvider, ModelSpec, TokenCounter, TokenizerError,
};
pub use trimmer::{trim_messages, RetentionPolicy, TrimOptions, TrimStrategy};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
