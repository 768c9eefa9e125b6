/*!
 * Token-budget-aware chat message trimming
 *
 * Keeps the longest contiguous run of conversation that fits a token budget,
 * evicting from the oldest or newest end while always keeping messages the
 * retention policy protects.
 */

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::error::{Error, Result};
use crate::message::{Message, Role};
use crate::tokenizer::TokenCounter;

/// Tokens added per message for chat formatting
pub const DEFAULT_PER_MESSAGE_OVERHEAD: usize = 4;

/// Tokens added once per conversation
pub const DEFAULT_TOTAL_OVERHEAD: usize = 2;

/// Which end of the conversation is evicted first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimStrategy {
    /// Drop the oldest messages first, keeping the most recent ones
    #[default]
    Early,
    /// Drop the newest messages first, keeping the oldest ones
    Late,
}

/// Decides which messages are exempt from eviction
#[derive(Clone)]
pub enum RetentionPolicy {
    /// Every message may be evicted
    Nothing,
    /// Messages with one of these roles are always kept
    Roles(Vec<Role>),
    /// Messages matching the predicate are always kept
    Custom(Arc<dyn Fn(&Message) -> bool + Send + Sync>),
}

impl RetentionPolicy {
    /// Keep system messages
    pub fn system() -> Self {
        Self::Roles(vec![Role::System])
    }

    /// Keep messages matching `predicate`
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether `message` must be kept
    pub fn retains(&self, message: &Message) -> bool {
        match self {
            Self::Nothing => false,
            Self::Roles(roles) => roles.contains(&message.role),
            Self::Custom(predicate) => predicate(message),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::Roles(roles) => f.debug_tuple("Roles").field(roles).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Options for [`trim_messages`]
#[derive(Debug, Clone)]
pub struct TrimOptions {
    pub strategy: TrimStrategy,
    pub retention: RetentionPolicy,
    pub per_message_overhead: usize,
    pub total_overhead: usize,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            strategy: TrimStrategy::default(),
            retention: RetentionPolicy::default(),
            per_message_overhead: DEFAULT_PER_MESSAGE_OVERHEAD,
            total_overhead: DEFAULT_TOTAL_OVERHEAD,
        }
    }
}

impl TrimOptions {
    /// Set the eviction strategy
    pub fn strategy(mut self, strategy: TrimStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Keep system messages (`true`) or treat them like any other (`false`)
    pub fn preserve_system(mut self, preserve: bool) -> Self {
        self.retention = if preserve {
            RetentionPolicy::system()
        } else {
            RetentionPolicy::Nothing
        };
        self
    }

    /// Replace the retention policy
    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Override the formatting overheads
    pub fn overheads(mut self, per_message: usize, total: usize) -> Self {
        self.per_message_overhead = per_message;
        self.total_overhead = total;
        self
    }
}

/// A message with its token cost, content plus per-message overhead
#[derive(Debug, Clone, Copy)]
struct ScoredMessage<'a> {
    index: usize,
    message: &'a Message,
    token_cost: usize,
}

/// Select the messages that fit `max_tokens`.
///
/// Returns every message when the whole conversation fits. Otherwise keeps
/// all retained messages plus the longest run of evictable messages, taken
/// from the newest end (`Early`) or the oldest end (`Late`), that fits what
/// is left of the budget. The result preserves input order. Messages are
/// never split.
///
/// When the retained messages alone leave no room, only they are returned.
/// A zero budget is rejected with [`Error::MissingBudget`] before any
/// counting happens.
pub async fn trim_messages<C>(
    messages: &[Message],
    counter: &C,
    max_tokens: usize,
    options: &TrimOptions,
) -> Result<Vec<Message>>
where
    C: TokenCounter + ?Sized,
{
    if max_tokens == 0 {
        return Err(Error::MissingBudget);
    }
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let counts = try_join_all(
        messages
            .iter()
            .map(|message| counter.count_tokens(&message.content)),
    )
    .await?;

    let scored: Vec<ScoredMessage<'_>> = messages
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(index, (message, tokens))| ScoredMessage {
            index,
            message,
            token_cost: tokens.saturating_add(options.per_message_overhead),
        })
        .collect();

    let total = total_cost(&scored).saturating_add(options.total_overhead);
    if total <= max_tokens {
        return Ok(messages.to_vec());
    }

    let (retained, evictable): (Vec<_>, Vec<_>) = scored
        .into_iter()
        .partition(|s| options.retention.retains(s.message));

    let reserved = total_cost(&retained);

    let needed = reserved.saturating_add(options.total_overhead);
    let available = match max_tokens.checked_sub(needed) {
        Some(available) if available > 0 => available,
        _ => {
            tracing::debug!(
                max_tokens,
                reserved,
                retained = retained.len(),
                "retained messages exhaust the budget"
            );
            return Ok(retained.iter().map(|s| s.message.clone()).collect());
        }
    };

    let scan: Vec<&ScoredMessage<'_>> = match options.strategy {
        TrimStrategy::Early => evictable.iter().rev().collect(),
        TrimStrategy::Late => evictable.iter().collect(),
    };

    let mut used: usize = 0;
    let mut kept: Vec<&ScoredMessage<'_>> = retained.iter().collect();
    for candidate in scan {
        let next = used.saturating_add(candidate.token_cost);
        if next > available {
            break;
        }
        used = next;
        kept.push(candidate);
    }

    tracing::debug!(
        total,
        max_tokens,
        strategy = ?options.strategy,
        kept = kept.len(),
        dropped = messages.len() - kept.len(),
        "trimmed messages to budget"
    );

    kept.sort_by_key(|s| s.index);
    Ok(kept.into_iter().map(|s| s.message.clone()).collect())
}

fn total_cost(scored: &[ScoredMessage<'_>]) -> usize {
    scored.iter().fold(0, |acc, s| acc.saturating_add(s.token_cost))
}
