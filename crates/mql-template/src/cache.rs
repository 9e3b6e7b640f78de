/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Shared cache of structurally expanded templates.
//!
//! Once a template has had all of its collection and field path tags
//! replaced, the resulting text only depends on the source text and the
//! paths supplied, so it can be reused by any later template built from the
//! same source. Value tags are never part of a cached entry.
//!
//! [`TemplateCache`] is a cheap handle: clones share the same store. The
//! process-wide instance returned by [`TemplateCache::global`] is what
//! [`Template::new`](crate::Template::new) uses; tests and embedders that
//! need isolation construct their own and pass it to
//! [`Template::with_cache`](crate::Template::with_cache).

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashlink::LruCache;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, trace};

static GLOBAL: Lazy<TemplateCache> = Lazy::new(TemplateCache::new);

/// Cache sizing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of entries before the least recently used is evicted.
    /// `None` keeps every entry.
    pub capacity: Option<NonZeroUsize>,
}

struct CacheEntry {
    source: Arc<str>,
    expanded: Arc<str>,
}

/// Thread-safe store of expanded template text keyed by source hash.
#[derive(Clone)]
pub struct TemplateCache {
    entries: Arc<Mutex<LruCache<u64, CacheEntry>>>,
}

impl fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCache")
            .field("len", &self.len())
            .finish()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new_unbounded())),
        }
    }

    /// Create a cache holding at most `capacity` entries.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity.get()))),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        match config.capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    /// The process-wide cache.
    pub fn global() -> &'static TemplateCache {
        &GLOBAL
    }

    /// Look up the expanded text stored for `source`.
    pub fn lookup(&self, key: u64, source: &str) -> Option<Arc<str>> {
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(entry) if *entry.source == *source => {
                trace!(key, "template cache hit");
                Some(Arc::clone(&entry.expanded))
            }
            Some(_) => {
                debug!(key, "template cache key collision, treating as miss");
                None
            }
            None => {
                trace!(key, "template cache miss");
                None
            }
        }
    }

    /// Store the expanded text for `source`. The last writer wins.
    pub fn store(&self, key: u64, source: &str, expanded: &str) {
        let entry = CacheEntry {
            source: Arc::from(source),
            expanded: Arc::from(expanded),
        };
        let mut entries = self.lock();
        if entries.insert(key, entry).is_some() {
            trace!(key, "template cache entry replaced");
        } else {
            debug!(key, entries = entries.len(), "template cached");
        }
    }

    /// Whether an entry for `source` is present.
    pub fn contains(&self, source: &str) -> bool {
        let key = cache_key(source);
        self.lock()
            .peek(&key)
            .is_some_and(|entry| *entry.source == *source)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
        debug!("template cache cleared");
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<u64, CacheEntry>> {
        // Entries are written whole, so a panic elsewhere cannot leave one torn.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hash of a template's source text.
pub fn cache_key(source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_lookup() {
        let cache = TemplateCache::new();
        let source = "{ \"<Title>\": \"<search>\" }";
        let key = cache_key(source);

        assert!(cache.lookup(key, source).is_none());
        cache.store(key, source, "{ \"Title\": \"<search>\" }");

        assert_eq!(
            cache.lookup(key, source).as_deref(),
            Some("{ \"Title\": \"<search>\" }")
        );
        assert!(cache.contains(source));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_colliding_key_is_a_miss() {
        let cache = TemplateCache::new();
        cache.store(42, "<A>", "a");
        assert!(cache.lookup(42, "<B>").is_none());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = TemplateCache::new();
        let other = cache.clone();
        cache.store(cache_key("<A>"), "<A>", "A");
        assert!(other.contains("<A>"));

        other.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_cache_evicts_least_recent() {
        let cache = TemplateCache::with_capacity(NonZeroUsize::new(2).unwrap());
        for source in ["<A>", "<B>"] {
            cache.store(cache_key(source), source, source);
        }
        // touch <A> so <B> becomes the eviction candidate
        assert!(cache.lookup(cache_key("<A>"), "<A>").is_some());
        cache.store(cache_key("<C>"), "<C>", "<C>");

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("<A>"));
        assert!(!cache.contains("<B>"));
        assert!(cache.contains("<C>"));
    }

    #[test]
    fn test_config_deserializes() {
        let config: CacheConfig = toml::from_str("capacity = 16").unwrap();
        assert_eq!(config.capacity, NonZeroUsize::new(16));
        assert_eq!(TemplateCache::from_config(&config).len(), 0);

        let config: CacheConfig = toml::from_str("").unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_cache_key_is_stable_for_equal_text() {
        assert_eq!(cache_key("<A> and <B>"), cache_key("<A> and <B>"));
        assert_ne!(cache_key("<A>"), cache_key("<B>"));
    }
}
