/*!
 * Token-bounded text splitting
 *
 * Splits text into chunks that each fit a token ceiling, cutting at paragraph
 * breaks first, then sentence ends, then word boundaries, and finally packing
 * the pieces back together as tightly as the ceiling allows.
 */

use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::tokenizer::TokenCounter;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n+").expect("paragraph pattern is valid"));

// Group 1 is the whitespace following terminal punctuation of a word
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w[.?!](\s+)").expect("sentence pattern is valid"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Separator placed between fragments packed into one chunk
const CHUNK_SEPARATOR: &str = "\n";

/// Boundary kinds, from coarsest to finest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// One or more newlines
    Paragraph,
    /// Whitespace after `.`, `?` or `!` that ends a word
    Sentence,
    /// Any whitespace run
    Word,
}

impl Delimiter {
    /// Split `text` on this boundary, dropping the boundary itself
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Paragraph => PARAGRAPH_BREAK.split(text).collect(),
            Delimiter::Word => WHITESPACE.split(text).collect(),
            Delimiter::Sentence => {
                let mut pieces = Vec::new();
                let mut start = 0;
                for caps in SENTENCE_END.captures_iter(text) {
                    if let Some(gap) = caps.get(1) {
                        pieces.push(&text[start..gap.start()]);
                        start = gap.end();
                    }
                }
                pieces.push(&text[start..]);
                pieces
            }
        }
    }
}

/// Options for [`split_max_tokens`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    /// Split on sentence ends before falling back to words
    pub preserve_sentences: bool,
    /// Allow splitting on word boundaries
    pub preserve_words: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            preserve_sentences: true,
            preserve_words: true,
        }
    }
}

impl SplitOptions {
    /// Enabled delimiters in priority order
    pub fn delimiters(&self) -> Vec<Delimiter> {
        [
            (Delimiter::Paragraph, true),
            (Delimiter::Sentence, self.preserve_sentences),
            (Delimiter::Word, self.preserve_words),
        ]
        .into_iter()
        .filter_map(|(delimiter, enabled)| enabled.then_some(delimiter))
        .collect()
    }
}

/// A measured piece of the source text
#[derive(Debug, Clone, Copy)]
struct Fragment<'a> {
    text: &'a str,
    tokens: usize,
}

/// Split `text` into chunks of at most `max_tokens` tokens each.
///
/// Returns no chunks for empty text, and the text unchanged when
/// `max_tokens` is 0 or the whole text already fits. Pieces packed into the
/// same chunk are joined with a newline, so whitespace between them is
/// normalized.
///
/// Fails with [`Error::SegmentationImpossible`] when some piece is still
/// above the ceiling after every enabled delimiter has been applied. Counting
/// errors are returned unchanged and no partial result is produced.
pub async fn split_max_tokens<C>(
    text: &str,
    counter: &C,
    max_tokens: usize,
    options: SplitOptions,
) -> Result<Vec<String>>
where
    C: TokenCounter + ?Sized,
{
    if text.is_empty() {
        return Ok(Vec::new());
    }
    if max_tokens == 0 {
        return Ok(vec![text.to_string()]);
    }

    let tokens = counter.count_tokens(text).await?;
    if tokens <= max_tokens {
        return Ok(vec![text.to_string()]);
    }

    let mut fragments = vec![Fragment { text, tokens }];

    for delimiter in options.delimiters() {
        if fragments.iter().all(|f| f.tokens <= max_tokens) {
            break;
        }
        fragments = refine(fragments, delimiter, counter, max_tokens).await?;
        tracing::debug!(
            ?delimiter,
            fragments = fragments.len(),
            "refined oversized fragments"
        );
    }

    if let Some(oversized) = fragments.iter().find(|f| f.tokens > max_tokens) {
        return Err(Error::SegmentationImpossible {
            tokens: oversized.tokens,
            max_tokens,
        });
    }

    pack(&fragments, counter, max_tokens).await
}

/// Split every oversized fragment on `delimiter` and measure the new pieces.
///
/// All counts of one pass are awaited together.
async fn refine<'a, C>(
    fragments: Vec<Fragment<'a>>,
    delimiter: Delimiter,
    counter: &C,
    max_tokens: usize,
) -> Result<Vec<Fragment<'a>>>
where
    C: TokenCounter + ?Sized,
{
    let mut candidates: Vec<(&'a str, Option<usize>)> = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        if fragment.tokens <= max_tokens {
            candidates.push((fragment.text, Some(fragment.tokens)));
            continue;
        }

        let pieces: Vec<&str> = delimiter
            .split(fragment.text)
            .into_iter()
            .filter(|piece| !piece.trim().is_empty())
            .collect();

        match pieces.as_slice() {
            // Nothing but whitespace; left for the final size check
            [] => candidates.push((fragment.text, Some(fragment.tokens))),
            // Delimiter does not occur; the count is already known
            [only] if *only == fragment.text => {
                candidates.push((fragment.text, Some(fragment.tokens)));
            }
            _ => candidates.extend(pieces.into_iter().map(|piece| (piece, None))),
        }
    }

    let counts = try_join_all(candidates.iter().map(|&(piece, known)| async move {
        match known {
            Some(tokens) => Ok(tokens),
            None => counter.count_tokens(piece).await,
        }
    }))
    .await?;

    Ok(candidates
        .into_iter()
        .zip(counts)
        .map(|((text, _), tokens)| Fragment { text, tokens })
        .collect())
}

/// Greedily pack fragments, in order, into chunks within the ceiling.
///
/// A fragment joins the current chunk only if the joined text, separator
/// included, still measures at most `max_tokens`.
async fn pack<C>(
    fragments: &[Fragment<'_>],
    counter: &C,
    max_tokens: usize,
) -> Result<Vec<String>>
where
    C: TokenCounter + ?Sized,
{
    let separator_tokens = if fragments.len() > 1 {
        counter.count_tokens(CHUNK_SEPARATOR).await?
    } else {
        0
    };

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut total: usize = 0;

    for fragment in fragments {
        if !current.is_empty() {
            let estimate = total
                .saturating_add(separator_tokens)
                .saturating_add(fragment.tokens);
            if estimate <= max_tokens {
                let joined = format!("{}{}{}", current, CHUNK_SEPARATOR, fragment.text);
                let measured = counter.count_tokens(&joined).await?;
                if measured <= max_tokens {
                    current = joined;
                    total = measured;
                    continue;
                }
            }
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(fragment.text);
        total = fragment.tokens;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}
