//! HuggingFace tokenizer implementation

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tokenizers::Tokenizer as HfTokenizer;

use super::Provider;
use crate::tokenizer::error::{TokenizerError, TokenizerResult};
use crate::tokenizer::model::ModelSpec;

/// HuggingFace tokenizer implementation.
///
/// The tokenizer is fetched from the hub on first use; loading and encoding run
/// on the blocking thread pool.
pub struct HuggingFaceProvider {
    model: ModelSpec,
    tokenizer: Arc<OnceCell<Mutex<HfTokenizer>>>,
}

impl HuggingFaceProvider {
    /// Create a new HuggingFace tokenizer
    pub fn new(model: ModelSpec) -> Self {
        Self {
            model,
            tokenizer: Arc::new(OnceCell::new()),
        }
    }

    /// Create a provider around an already loaded tokenizer
    pub fn with_tokenizer(model: ModelSpec, tokenizer: HfTokenizer) -> Self {
        Self {
            model,
            tokenizer: Arc::new(OnceCell::with_value(Mutex::new(tokenizer))),
        }
    }
}

fn load_tokenizer(repo_id: &str) -> TokenizerResult<Mutex<HfTokenizer>> {
    tracing::debug!(repo_id, "loading HuggingFace tokenizer");
    let tokenizer = HfTokenizer::from_pretrained(repo_id, None).map_err(|e| {
        TokenizerError::TokenizerError(format!(
            "Failed to load tokenizer '{}': {}",
            repo_id, e
        ))
    })?;
    Ok(Mutex::new(tokenizer))
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    async fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        if text.is_empty() {
            return Ok(0);
        }

        let cell = Arc::clone(&self.tokenizer);
        let repo_id = self.model.name.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let tokenizer_mutex = cell.get_or_try_init(|| load_tokenizer(&repo_id))?;

            let tokenizer = tokenizer_mutex.lock().map_err(|_| {
                TokenizerError::TokenizerError("Failed to lock tokenizer".to_string())
            })?;

            let encoding = tokenizer.encode(text.as_str(), false).map_err(|e| {
                TokenizerError::TokenizerError(format!("Failed to encode text: {}", e))
            })?;

            Ok(encoding.get_ids().len())
        })
        .await?
    }

    fn model(&self) -> &ModelSpec {
        &self.model
    }
}
