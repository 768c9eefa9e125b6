/*!
 * Command-line interface for tokenkit
 */

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use tokenkit::config::{Args, Command, Config, InputArgs};
use tokenkit::report::{ChunkInfo, ReportFormat, Reporter, SplitReport};
use tokenkit::{
    create_embedder, create_tokenizer, split_max_tokens, trim_messages, Message, ModelSpec,
    SplitOptions, TokenCounter, TrimOptions,
};

const PREVIEW_CHARS: usize = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_args(&args);

    match args.command {
        Command::Completions { shell } => {
            let mut cmd = Args::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
        }
        Command::Count(input) => {
            let model = resolve_model(&args.model, &config)?;
            let text = read_input(&input)?;
            let tokenizer = create_tokenizer(&model, &config)?;
            let count = tokenizer.count(&text).await?;
            println!("{}", count.tokens);
            tokenizer.persist()?;
        }
        Command::Split {
            input,
            max_tokens,
            no_sentences,
            no_words,
            json,
        } => {
            let model = resolve_model(&args.model, &config)?;
            let text = read_input(&input)?;
            let tokenizer = create_tokenizer(&model, &config)?;
            let options = SplitOptions {
                preserve_sentences: !no_sentences,
                preserve_words: !no_words,
            };

            let start_time = Instant::now();
            let chunks = split_max_tokens(&text, &tokenizer, max_tokens, options).await?;
            let duration = start_time.elapsed();

            if json {
                println!("{}", serde_json::to_string_pretty(&chunks)?);
            } else {
                let mut infos = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    let tokens = tokenizer.count_tokens(chunk).await?;
                    infos.push(ChunkInfo::new(chunk, tokens, PREVIEW_CHARS));
                }

                let report = SplitReport {
                    model: model.to_string(),
                    max_tokens,
                    input_tokens: tokenizer.count_tokens(&text).await?,
                    duration,
                    chunks: infos,
                    cache: config.cache_enabled.then(|| tokenizer.get_cache_stats()),
                };
                Reporter::new(ReportFormat::ConsoleTable).print_report(&report);
            }
            tokenizer.persist()?;
        }
        Command::Trim {
            input,
            max_tokens,
            strategy,
            no_preserve_system,
            per_message_overhead,
            total_overhead,
        } => {
            let model = resolve_model(&args.model, &config)?;
            let raw = read_input(&input)?;
            let messages: Vec<Message> =
                serde_json::from_str(&raw).context("input must be a JSON array of messages")?;
            let tokenizer = create_tokenizer(&model, &config)?;
            let options = TrimOptions::default()
                .strategy(strategy.into())
                .preserve_system(!no_preserve_system)
                .overheads(per_message_overhead, total_overhead);

            let trimmed = trim_messages(&messages, &tokenizer, max_tokens, &options).await?;
            tracing::info!(
                input = messages.len(),
                kept = trimmed.len(),
                "trimmed conversation"
            );
            println!("{}", serde_json::to_string_pretty(&trimmed)?);
            tokenizer.persist()?;
        }
        Command::Embed { input, json } => {
            let model = resolve_model(&args.model, &config)?;
            let text = read_input(&input)?;
            let embedder = create_embedder(&model, &config)?;
            let vector = embedder.embed(&text).await?;
            if json {
                println!("{}", serde_json::to_string(&vector)?);
            } else {
                println!("{} dimensions", vector.len());
            }
        }
    }

    Ok(())
}

/// Validate the configuration and parse the requested model
fn resolve_model(model: &str, config: &Config) -> anyhow::Result<ModelSpec> {
    config.validate()?;
    let model = ModelSpec::parse(model)?;
    tracing::debug!(%model, "resolved model");
    Ok(model)
}

/// Install a stderr subscriber; `TOKENKIT_LOG` or `RUST_LOG` override `-v`
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("TOKENKIT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("tokenkit={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read the input file, or stdin when no file (or "-") is given
fn read_input(input: &InputArgs) -> anyhow::Result<String> {
    match input.file.as_deref() {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}
