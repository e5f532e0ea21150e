use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use lru::LruCache;
use tracing::trace;

use crate::highlight::{Highlighter, StyledText};

/// Fence language and code
type CacheKey = (String, String);

/// Highlighted code blocks, shared across turns and bounded by entry count.
///
/// Least recently used entries are evicted first. The lock is never held
/// while the highlighter runs, so a slow highlight only delays its own block.
pub struct HighlightCache {
    highlighter: Box<dyn Highlighter>,
    entries: Mutex<LruCache<CacheKey, Arc<StyledText>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HighlightCache {
    pub fn new(highlighter: impl Highlighter + 'static, capacity: NonZeroUsize) -> Self {
        Self {
            highlighter: Box::new(highlighter),
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Styled rendering of `code`, from the cache when possible.
    #[profiling::function]
    pub fn highlight(&self, code: &str, language: &str) -> Arc<StyledText> {
        let key = (language.to_string(), code.to_string());

        if let Some(styled) = self.entries().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return styled.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let styled = Arc::new(self.highlighter.highlight(code, language));
        trace!(
            "highlighted {} bytes of '{language}' into {} runs",
            code.len(),
            styled.runs.len()
        );

        self.entries().put(key, styled.clone());

        styled
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.entries().cap()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<StyledText>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
