/*!
 * Configuration handling for tokenkit
 */

use std::env;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::error::Result;
use crate::tokenizer::{ModelProvider, TokenizerError, TokenizerResult};
use crate::trimmer::TrimStrategy;

/// Default model used when none is given on the command line
pub const DEFAULT_MODEL: &str = "openai:gpt-4o";

/// Command-line arguments for tokenkit
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "tokenkit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Count tokens, split text and trim chat histories for LLM models",
    long_about = "Provider-agnostic token counting and embeddings for OpenAI, Anthropic, Google and HuggingFace models, with token-bounded text splitting and budget-aware message trimming."
)]
pub struct Args {
    /// Model to use, as provider:name or a well-known model name
    #[clap(long, short, global = true, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Disable the on-disk token count cache
    #[clap(long, global = true)]
    pub no_cache: bool,

    /// Directory for the token count cache
    #[clap(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[clap(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Count the tokens of a file or stdin
    Count(InputArgs),

    /// Split text into chunks that fit a token ceiling
    Split {
        #[clap(flatten)]
        input: InputArgs,

        /// Maximum tokens per chunk
        #[clap(long)]
        max_tokens: usize,

        /// Do not prefer sentence boundaries
        #[clap(long)]
        no_sentences: bool,

        /// Do not split on word boundaries
        #[clap(long)]
        no_words: bool,

        /// Print chunks as a JSON array instead of a table
        #[clap(long)]
        json: bool,
    },

    /// Trim a JSON array of chat messages to a token budget
    Trim {
        #[clap(flatten)]
        input: InputArgs,

        /// Total token budget
        #[clap(long)]
        max_tokens: usize,

        /// Which end of the conversation is evicted first
        #[clap(long, value_enum, default_value_t = StrategyArg::Early)]
        strategy: StrategyArg,

        /// Allow system messages to be evicted
        #[clap(long)]
        no_preserve_system: bool,

        /// Tokens added per message for chat formatting
        #[clap(long, default_value = "4")]
        per_message_overhead: usize,

        /// Tokens added once per conversation
        #[clap(long, default_value = "2")]
        total_overhead: usize,
    },

    /// Produce an embedding for a file or stdin
    Embed {
        #[clap(flatten)]
        input: InputArgs,

        /// Print the full vector as JSON
        #[clap(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[clap(value_enum)]
        shell: Shell,
    },
}

/// Input source shared by subcommands
#[derive(ClapArgs, Debug, Clone)]
pub struct InputArgs {
    /// Input file (reads stdin when omitted or "-")
    pub file: Option<PathBuf>,
}

/// Eviction direction as exposed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Drop the oldest messages first
    Early,
    /// Drop the newest messages first
    Late,
}

impl From<StrategyArg> for TrimStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Early => TrimStrategy::Early,
            StrategyArg::Late => TrimStrategy::Late,
        }
    }
}

/// Credentials and endpoint for a remote provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    /// API key, if configured
    pub api_key: Option<String>,
    /// Base URL of the API, without trailing slash
    pub base_url: String,
}

impl ProviderConfig {
    fn from_env(provider: ModelProvider, key_vars: &[&str], url_var: &str) -> Self {
        let api_key = key_vars
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()));
        let base_url = env::var(url_var)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| provider.default_base_url().unwrap_or_default().to_string());

        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Return the API key or an error naming the variable that should hold it
    pub fn require_key(&self, provider: ModelProvider) -> TokenizerResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            TokenizerError::EnvVarError(format!(
                "{} environment variable not set",
                provider.api_key_env().unwrap_or("API key")
            ))
        })
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// OpenAI credentials and endpoint
    pub openai: ProviderConfig,

    /// Anthropic credentials and endpoint
    pub anthropic: ProviderConfig,

    /// Google credentials and endpoint
    pub google: ProviderConfig,

    /// Whether token counts are cached
    pub cache_enabled: bool,

    /// Whether the cache is persisted to disk
    pub cache_persist: bool,

    /// Directory of the persisted cache (defaults to ~/.cache/tokenkit)
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let remote = |provider: ModelProvider| ProviderConfig {
            api_key: None,
            base_url: provider.default_base_url().unwrap_or_default().to_string(),
        };

        Self {
            openai: remote(ModelProvider::OpenAI),
            anthropic: remote(ModelProvider::Anthropic),
            google: remote(ModelProvider::Google),
            cache_enabled: true,
            cache_persist: false,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Read credentials and endpoints from the environment
    pub fn from_env() -> Self {
        Self {
            openai: ProviderConfig::from_env(
                ModelProvider::OpenAI,
                &["OPENAI_API_KEY"],
                "OPENAI_BASE_URL",
            ),
            anthropic: ProviderConfig::from_env(
                ModelProvider::Anthropic,
                &["ANTHROPIC_API_KEY"],
                "ANTHROPIC_BASE_URL",
            ),
            google: ProviderConfig::from_env(
                ModelProvider::Google,
                &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
                "GOOGLE_BASE_URL",
            ),
            cache_enabled: true,
            cache_persist: true,
            cache_dir: env::var_os("TOKENKIT_CACHE_DIR").map(PathBuf::from),
        }
    }

    /// Create configuration from the environment overlaid with command-line arguments
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self::from_env();
        if args.no_cache {
            config.cache_enabled = false;
            config.cache_persist = false;
        }
        if let Some(dir) = &args.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        config
    }

    /// Settings for a remote provider; `None` for locally counted providers
    pub fn provider(&self, provider: ModelProvider) -> Option<&ProviderConfig> {
        match provider {
            ModelProvider::OpenAI => Some(&self.openai),
            ModelProvider::Anthropic => Some(&self.anthropic),
            ModelProvider::Google => Some(&self.google),
            ModelProvider::HuggingFace => None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            crate::ensure!(
                !dir.exists() || dir.is_dir(),
                Config,
                "Cache path is not a directory: {}",
                dir.display()
            );
        }

        for provider in [
            ModelProvider::OpenAI,
            ModelProvider::Anthropic,
            ModelProvider::Google,
        ] {
            if let Some(settings) = self.provider(provider) {
                crate::ensure!(
                    settings.base_url.starts_with("http://")
                        || settings.base_url.starts_with("https://"),
                    Config,
                    "Invalid base URL for {}: '{}'",
                    provider,
                    settings.base_url
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.provider(ModelProvider::HuggingFace).is_none());
        assert_eq!(config.openai.base_url, "https://api.openai.com");
    }

    #[test]
    fn test_cache_dir_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let config = Config {
            cache_dir: Some(file),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let mut config = Config::default();
        config.google.base_url = "generativelanguage.googleapis.com".to_string();
        match config.validate() {
            Err(Error::Config(msg)) => {
                assert_eq!(
                    msg,
                    "Invalid base URL for google: 'generativelanguage.googleapis.com'"
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_require_key_names_variable() {
        let config = Config::default();
        let err = config
            .anthropic
            .require_key(ModelProvider::Anthropic)
            .unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_args_parse_split() {
        let args = Args::parse_from([
            "tokenkit",
            "--model",
            "claude-3-7-sonnet-latest",
            "split",
            "--max-tokens",
            "128",
            "--no-words",
            "input.txt",
        ]);
        assert_eq!(args.model, "claude-3-7-sonnet-latest");
        match args.command {
            Command::Split {
                input,
                max_tokens,
                no_words,
                no_sentences,
                ..
            } => {
                assert_eq!(max_tokens, 128);
                assert!(no_words);
                assert!(!no_sentences);
                assert_eq!(input.file, Some(PathBuf::from("input.txt")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_parse_trim_defaults() {
        let args = Args::parse_from(["tokenkit", "trim", "--max-tokens", "50"]);
        match args.command {
            Command::Trim {
                strategy,
                per_message_overhead,
                total_overhead,
                no_preserve_system,
                ..
            } => {
                assert_eq!(strategy, StrategyArg::Early);
                assert_eq!(per_message_overhead, 4);
                assert_eq!(total_overhead, 2);
                assert!(!no_preserve_system);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.model, DEFAULT_MODEL);
    }
}
