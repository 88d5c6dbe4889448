//! Per-file analysis cache
//!
//! Maps `(path, SHA-256(content))` to the parsed module and its per-file
//! violations. A hit skips re-parsing entirely; invalidation is implicit on
//! content change and explicit per path. Cross-file artefacts (call graph,
//! scores) are never cached here because they depend on the file set.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{ModuleAst, RuleViolation};

/// A cached analysis result for a single file.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub content_hash: String,
    pub module: ModuleAst,
    pub violations: Vec<RuleViolation>,
}

/// Three-method cache capability. Swapping the in-process store for a
/// shared external one is a drop-in substitution.
#[async_trait]
pub trait FileCacheService: Send + Sync {
    /// Look up a file by path and content. Returns `None` on miss, expiry,
    /// or content change.
    async fn get(&self, path: &str, content: &str) -> Option<CachedAnalysis>;

    /// Store analysis results for a file. Writes are atomic per key.
    async fn put(&self, path: &str, content: &str, module: ModuleAst, violations: Vec<RuleViolation>);

    /// Drop all entries for a path. Returns the number removed.
    async fn invalidate(&self, path: &str) -> usize;
}

/// SHA-256 of file content, hex-encoded.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn cache_key(path: &str, content_hash: &str) -> String {
    format!("{path}:{content_hash}")
}

/// In-memory cache with time-based expiry.
pub struct InMemoryFileCache {
    entries: RwLock<HashMap<String, (CachedAnalysis, Instant)>>,
    ttl: Duration,
}

impl InMemoryFileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl FileCacheService for InMemoryFileCache {
    async fn get(&self, path: &str, content: &str) -> Option<CachedAnalysis> {
        let content_hash = hash_content(content);
        let key = cache_key(path, &content_hash);
        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some((cached, stored_at)) if stored_at.elapsed() < self.ttl => {
                debug!(path, "Analysis cache hit");
                Some(cached.clone())
            }
            Some(_) => {
                debug!(path, "Analysis cache entry expired");
                None
            }
            None => None,
        }
    }

    async fn put(
        &self,
        path: &str,
        content: &str,
        module: ModuleAst,
        violations: Vec<RuleViolation>,
    ) {
        let content_hash = hash_content(content);
        let key = cache_key(path, &content_hash);
        let cached = CachedAnalysis {
            content_hash,
            module,
            violations,
        };
        self.entries.write().await.insert(key, (cached, Instant::now()));
    }

    async fn invalidate(&self, path: &str) -> usize {
        let prefix = format!("{path}:");
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        before - entries.len()
    }
}
