/*!
 * Tests for splitting and trimming across components
 */

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Error;
use crate::message::{Message, Role};
use crate::splitter::{split_max_tokens, SplitOptions};
use crate::tokenizer::{create_tokenizer, ModelSpec, TokenCounter, TokenizerResult};
use crate::trimmer::{trim_messages, TrimOptions, TrimStrategy};

// One token per whitespace-separated word
struct WordCounter;

#[async_trait]
impl TokenCounter for WordCounter {
    async fn count_tokens(&self, text: &str) -> TokenizerResult<usize> {
        Ok(text.split_whitespace().count())
    }
}

const ARTICLE: &str = "Rust is a general-purpose programming language. It emphasizes \
performance, type safety, and concurrency! Does it enforce memory safety? Yes.\n\n\
The borrow checker tracks object lifetimes at compile time. Software written in \
Rust avoids data races.\nMany companies now ship Rust in production systems.";

fn conversation(turns: usize) -> Vec<Message> {
    let mut messages = vec![Message::system("You are a terse assistant")];
    for i in 0..turns {
        messages.push(Message::user(format!("question number {}", i)));
        messages.push(Message::assistant(format!("answer number {} here", i)));
    }
    messages
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[tokio::test]
async fn test_split_respects_ceiling_and_keeps_words_in_order() {
    for max_tokens in 1..=40 {
        let chunks = split_max_tokens(ARTICLE, &WordCounter, max_tokens, SplitOptions::default())
            .await
            .unwrap();

        for chunk in &chunks {
            let tokens = WordCounter.count_tokens(chunk).await.unwrap();
            assert!(tokens <= max_tokens, "{} > {}", tokens, max_tokens);
        }

        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| words(c)).collect();
        assert_eq!(rejoined, words(ARTICLE), "max_tokens = {}", max_tokens);
    }
}

#[tokio::test]
async fn test_split_fast_path_returns_exact_text() {
    let chunks = split_max_tokens(ARTICLE, &WordCounter, 1_000, SplitOptions::default())
        .await
        .unwrap();
    assert_eq!(chunks, vec![ARTICLE.to_string()]);
}

#[tokio::test]
async fn test_split_without_words_fails_on_long_sentence() {
    let options = SplitOptions {
        preserve_sentences: true,
        preserve_words: false,
    };
    let result = split_max_tokens(ARTICLE, &WordCounter, 5, options).await;
    assert!(matches!(result, Err(Error::SegmentationImpossible { .. })));
}

#[tokio::test]
async fn test_trim_invariants_hold_for_all_budgets() {
    let messages = conversation(6);
    // system message costs 5 + 4 = 9, plus 2 for the conversation
    let mandatory = 11;

    for strategy in [TrimStrategy::Early, TrimStrategy::Late] {
        let options = TrimOptions::default().strategy(strategy);
        for max_tokens in 1..=120 {
            let trimmed = trim_messages(&messages, &WordCounter, max_tokens, &options)
                .await
                .unwrap();

            // every system message survives
            assert_eq!(trimmed.first().map(|m| m.role), Some(Role::System));

            // retained messages keep their input order
            let positions: Vec<usize> = trimmed
                .iter()
                .map(|m| messages.iter().position(|orig| orig == m).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));

            if max_tokens > mandatory {
                let cost: usize = trimmed
                    .iter()
                    .map(|m| words(&m.content).len() + options.per_message_overhead)
                    .sum::<usize>()
                    + options.total_overhead;
                assert!(cost <= max_tokens, "{:?}: {} > {}", strategy, cost, max_tokens);
            } else {
                assert_eq!(trimmed.len(), 1);
            }
        }
    }
}

#[tokio::test]
async fn test_trim_strategies_pick_opposite_ends() {
    let messages = conversation(3);
    // system 9 + two exchanges of 7 + 8
    let budget = 9 + 2 + 7 + 8;

    let early = trim_messages(&messages, &WordCounter, budget, &TrimOptions::default())
        .await
        .unwrap();
    assert_eq!(early, vec![messages[0].clone(), messages[5].clone(), messages[6].clone()]);

    let late = trim_messages(
        &messages,
        &WordCounter,
        budget,
        &TrimOptions::default().strategy(TrimStrategy::Late),
    )
    .await
    .unwrap();
    assert_eq!(late, vec![messages[0].clone(), messages[1].clone(), messages[2].clone()]);
}

#[tokio::test]
async fn test_tiktoken_backed_split_and_trim() {
    let config = Config {
        cache_persist: false,
        ..Config::default()
    };
    let tokenizer = create_tokenizer(&ModelSpec::parse("gpt-4o").unwrap(), &config).unwrap();

    let chunks = split_max_tokens(ARTICLE, &tokenizer, 16, SplitOptions::default())
        .await
        .unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(tokenizer.count_tokens(chunk).await.unwrap() <= 16);
    }
    let rejoined: Vec<&str> = chunks.iter().flat_map(|c| words(c)).collect();
    assert_eq!(rejoined, words(ARTICLE));

    let messages = conversation(10);
    let options = TrimOptions::default();
    let trimmed = trim_messages(&messages, &tokenizer, 60, &options)
        .await
        .unwrap();
    let mut cost = options.total_overhead;
    for message in &trimmed {
        cost += tokenizer.count_tokens(&message.content).await.unwrap() + options.per_message_overhead;
    }
    assert!(cost <= 60);
    assert_eq!(trimmed[0].role, Role::System);
    assert_eq!(trimmed.last(), messages.last());

    // Repeated counts are served from the cache
    assert!(tokenizer.get_cache_stats().hits > 0);
}
