//! AST cache.
//!
//! Maps exact expression source text to its parsed program. Entries live for
//! as long as the cache does; there is no eviction.

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::HashMap;
use spin::RwLock;

use crate::ast::Program;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached programs.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that missed.
    pub misses: usize,
}

/// Source-keyed program cache, safe to share between threads.
pub struct AstCache {
    /// Cached programs by source text.
    entries: RwLock<HashMap<String, Arc<Program>>>,
    /// Maximum number of entries, if bounded.
    max_entries: Option<usize>,
    /// Hit counter.
    hits: AtomicUsize,
    /// Miss counter.
    misses: AtomicUsize,
}

impl AstCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::with_max_entries(None)
    }

    /// Create a cache holding at most `max_entries` programs.
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        AstCache {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Look up a program by its exact source text.
    pub fn get(&self, source: &str) -> Option<Arc<Program>> {
        let found = self.entries.read().get(source).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("[form-expr] AST cache hit: {:?}", source);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a freshly parsed program and return the shared copy.
    ///
    /// If another caller stored the same source first, its program is kept
    /// and returned. When the cache is full the program is returned without
    /// being stored.
    pub fn insert(&self, source: &str, program: Program) -> Arc<Program> {
        let program = Arc::new(program);
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(source) {
            return Arc::clone(existing);
        }
        if self.max_entries.is_some_and(|max| entries.len() >= max) {
            log::debug!("[form-expr] AST cache full, not storing {:?}", source);
            return program;
        }

        entries.insert(String::from(source), Arc::clone(&program));
        program
    }

    /// Remove every entry and reset the counters.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached programs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for AstCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_insert_then_get_returns_same_program() {
        let cache = AstCache::new();
        assert!(cache.get("a + b").is_none());

        let stored = cache.insert("a + b", parse("a + b").unwrap());
        let found = cache.get("a + b").unwrap();
        assert!(Arc::ptr_eq(&stored, &found));
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn test_keys_are_exact_source_text() {
        let cache = AstCache::new();
        cache.insert("a+b", parse("a+b").unwrap());
        assert!(cache.get("a + b").is_none());
        assert!(cache.get(" a+b").is_none());
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = AstCache::new();
        let first = cache.insert("x", parse("x").unwrap());
        let second = cache.insert("x", parse("x").unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_bounded_cache_stops_storing() {
        let cache = AstCache::with_max_entries(Some(1));
        cache.insert("a", parse("a").unwrap());
        cache.insert("b", parse("b").unwrap());
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_concurrent_compiles_share_one_entry_per_source() {
        use std::thread;

        use crate::engine::Engine;

        const WORKERS: usize = 8;
        const SOURCES: usize = 50;

        let engine = Arc::new(Engine::default());
        let sources: Vec<String> = (0..SOURCES).map(|i| format!("field{} + {}", i, i)).collect();

        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let engine = Arc::clone(&engine);
                let sources = sources.clone();
                thread::spawn(move || {
                    (0..200)
                        .map(|n| {
                            let source = &sources[(n + worker * 7) % SOURCES];
                            (source.clone(), engine.compile(source).unwrap())
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let compiled: Vec<_> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(engine.cache_stats().entries, SOURCES);
        for (source, program) in &compiled {
            let stored = engine.compile(source).unwrap();
            assert!(Arc::ptr_eq(program, &stored), "{} was compiled twice", source);
        }
    }

    #[test]
    fn test_clear() {
        let cache = AstCache::new();
        cache.insert("a", parse("a").unwrap());
        cache.get("a");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
