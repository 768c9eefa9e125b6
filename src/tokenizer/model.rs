//! Model identifiers and provider resolution

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumProperty, EnumString, IntoEnumIterator};

use crate::tokenizer::error::{TokenizerError, TokenizerResult};

/// Model providers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    EnumIter,
    Display,
    EnumProperty,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI (GPT and text-embedding models)
    #[strum(props(api_key_env = "OPENAI_API_KEY", base_url = "https://api.openai.com"))]
    OpenAI,

    /// Anthropic (Claude models)
    #[strum(props(
        api_key_env = "ANTHROPIC_API_KEY",
        base_url = "https://api.anthropic.com"
    ))]
    Anthropic,

    /// Google (Gemini and text-embedding models)
    #[strum(
        to_string = "google",
        serialize = "gemini",
        props(
            api_key_env = "GOOGLE_API_KEY",
            base_url = "https://generativelanguage.googleapis.com"
        )
    )]
    Google,

    /// HuggingFace hub tokenizers, counted locally
    HuggingFace,
}

impl ModelProvider {
    /// Environment variable holding this provider's API key, if it needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        self.get_str("api_key_env")
    }

    /// Default API endpoint, if this provider is remote
    pub fn default_base_url(&self) -> Option<&'static str> {
        self.get_str("base_url")
    }
}

/// A parsed `provider:name` model identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Vendor serving the model
    pub provider: ModelProvider,
    /// Model name as used by the vendor's API
    pub name: String,
}

impl ModelSpec {
    /// Create a model spec from its parts
    pub fn new(provider: ModelProvider, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }

    /// Parse a model string.
    ///
    /// Accepts `provider:name`, `provider/name` (except HuggingFace repo ids,
    /// which keep their slash) or a bare name whose provider is inferred.
    pub fn parse(input: &str) -> TokenizerResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TokenizerError::InvalidModel(
                "model identifier is empty".to_string(),
            ));
        }

        if let Some((prefix, name)) = input.split_once(':') {
            let provider = ModelProvider::from_str(prefix).map_err(|_| {
                TokenizerError::InvalidModel(format!(
                    "unknown provider '{}' (expected one of: {})",
                    prefix,
                    known_providers()
                ))
            })?;
            return Self::with_name(provider, name);
        }

        if let Some((prefix, name)) = input.split_once('/') {
            if let Ok(provider) = ModelProvider::from_str(prefix) {
                if provider != ModelProvider::HuggingFace {
                    return Self::with_name(provider, name);
                }
            }
        }

        let provider = infer_provider(input).ok_or_else(|| {
            TokenizerError::UnsupportedModel(format!(
                "cannot infer provider for '{}', use provider:name",
                input
            ))
        })?;

        Self::with_name(provider, input)
    }

    fn with_name(provider: ModelProvider, name: &str) -> TokenizerResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TokenizerError::InvalidModel(format!(
                "missing model name for provider '{}'",
                provider
            )));
        }
        Ok(Self::new(provider, name))
    }

    /// Stable identifier used as cache key
    pub fn model_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.name)
    }
}

impl FromStr for ModelSpec {
    type Err = TokenizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn infer_provider(name: &str) -> Option<ModelProvider> {
    const OPENAI: &[&str] = &[
        "gpt-",
        "o1",
        "o3",
        "o4",
        "chatgpt-",
        "text-embedding-3",
        "text-embedding-ada",
    ];
    const GOOGLE: &[&str] = &["gemini-", "text-embedding-004", "embedding-"];

    let lower = name.to_ascii_lowercase();
    if OPENAI.iter().any(|p| lower.starts_with(p)) {
        Some(ModelProvider::OpenAI)
    } else if lower.starts_with("claude-") {
        Some(ModelProvider::Anthropic)
    } else if GOOGLE.iter().any(|p| lower.starts_with(p)) {
        Some(ModelProvider::Google)
    } else if name.contains('/') {
        Some(ModelProvider::HuggingFace)
    } else {
        None
    }
}

fn known_providers() -> String {
    ModelProvider::iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
