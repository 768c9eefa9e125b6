//! Token cache implementation

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::tokenizer::error::{TokenizerError, TokenizerResult};

const CACHE_FILE_NAME: &str = "token_cache.json";

// 7 days in seconds
const MAX_ENTRY_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Cache entry with token count and model identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenCacheEntry {
    /// Hash of the content
    hash: u64,
    /// Model used for tokenization
    model: String,
    /// Token count
    tokens: usize,
    /// Timestamp when the entry was created
    timestamp: u64,
}

/// Statistics for token cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
}

/// Cache for token counts, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: HashMap<(u64, String), TokenCacheEntry>,
    path: Option<PathBuf>,
    dirty: bool,
    stats: CacheStats,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    entries: Vec<TokenCacheEntry>,
}

impl TokenCache {
    /// Create a cache that lives only in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create a cache persisted at `path`, loading existing entries when present.
    ///
    /// A missing or unreadable file yields an empty cache; entries older than
    /// a week are dropped.
    pub fn persistent(path: PathBuf) -> Self {
        let mut cache = Self {
            path: Some(path.clone()),
            ..Self::default()
        };

        match load_entries(&path) {
            Ok(entries) => {
                let now = now_secs();
                let loaded = entries.len();
                for entry in entries {
                    if now.saturating_sub(entry.timestamp) < MAX_ENTRY_AGE_SECS {
                        cache
                            .entries
                            .insert((entry.hash, entry.model.clone()), entry);
                    }
                }
                // Expired entries must be purged from disk on next persist
                cache.dirty = cache.entries.len() < loaded;
                tracing::debug!(
                    path = %path.display(),
                    entries = cache.entries.len(),
                    "loaded token cache"
                );
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "starting with empty token cache");
            }
        }

        cache
    }

    /// Calculate hash for content
    fn hash_content(content: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        hasher.finish()
    }

    /// Get token count from cache if available
    pub fn get(&mut self, content: &str, model_id: &str) -> Option<usize> {
        let key = (Self::hash_content(content), model_id.to_string());
        let result = self.entries.get(&key).map(|entry| entry.tokens);

        if result.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }

        result
    }

    /// Insert token count into cache
    pub fn insert(&mut self, content: &str, model_id: &str, count: usize) {
        let hash = Self::hash_content(content);
        self.entries.insert(
            (hash, model_id.to_string()),
            TokenCacheEntry {
                hash,
                model: model_id.to_string(),
                tokens: count,
                timestamp: now_secs(),
            },
        );
        self.dirty = true;
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn get_stats(&self) -> CacheStats {
        self.stats
    }

    /// Write the cache to disk if it is persistent and has unsaved changes
    pub fn save(&mut self) -> TokenizerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let file = CacheFile {
            entries: self.entries.values().cloned().collect(),
        };
        let content = serde_json::to_string(&file)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;

        self.dirty = false;
        Ok(())
    }
}

fn load_entries(path: &Path) -> TokenizerResult<Vec<TokenCacheEntry>> {
    if !path.exists() {
        return Err(TokenizerError::CacheError(
            "Cache file not found".to_string(),
        ));
    }

    let content = fs::read_to_string(path)?;
    let file: CacheFile = serde_json::from_str(&content)?;
    Ok(file.entries)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Get the path of the token cache file.
///
/// Uses `cache_dir` when given, otherwise `~/.cache/tokenkit`.
pub fn get_cache_path(cache_dir: Option<&Path>) -> TokenizerResult<PathBuf> {
    let dir = match cache_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let home_dir = dirs::home_dir().ok_or_else(|| {
                TokenizerError::CacheError("Could not determine home directory".to_string())
            })?;
            home_dir.join(".cache").join("tokenkit")
        }
    };

    Ok(dir.join(CACHE_FILE_NAME))
}
