//! Bounded LRU caches for compiled patterns and match results.
//!
//! A `Mutex`-guarded shared structure behind a cheap, cloneable handle,
//! rather than introducing a new concurrency primitive just for this
//! crate.

use crate::dialect::{compile, CompiledPattern, Dialect};
use crate::error::PatternError;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const DEFAULT_COMPILED_CAPACITY: usize = 1024;
const DEFAULT_RESULT_CAPACITY: usize = 4096;

/// Hash `s` into a `u64` for use as a result-cache key component.
#[must_use]
pub fn hash_str(s: &str) -> u64 {
    let digest = Sha256::digest(s.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is at least 8 bytes"))
}

/// Shared, clonable handle onto the pattern engine's caches.
#[derive(Clone)]
pub struct PatternCache {
    compiled: Arc<Mutex<LruCache<(Dialect, String), Arc<CompiledPattern>>>>,
    results: Arc<Mutex<LruCache<(u64, u64), bool>>>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_COMPILED_CAPACITY, DEFAULT_RESULT_CAPACITY)
    }
}

impl PatternCache {
    /// Build caches with explicit capacities.
    #[must_use]
    pub fn new(compiled_capacity: usize, result_capacity: usize) -> Self {
        Self {
            compiled: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(compiled_capacity.max(1)).unwrap(),
            ))),
            results: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(result_capacity.max(1)).unwrap(),
            ))),
        }
    }

    /// Fetch the compiled form of `(dialect, pattern)`, compiling and
    /// caching it on first use.
    pub fn compiled(
        &self,
        dialect: Dialect,
        pattern: &str,
    ) -> Result<Arc<CompiledPattern>, PatternError> {
        let key = (dialect, pattern.to_string());
        if let Some(hit) = self.compiled.lock().expect("compiled cache lock poisoned").get(&key) {
            return Ok(hit.clone());
        }
        let built = Arc::new(compile(dialect, pattern)?);
        self.compiled
            .lock()
            .expect("compiled cache lock poisoned")
            .put(key, built.clone());
        Ok(built)
    }

    /// Look up a previously recorded match result for `(compiled_id,
    /// value_hash)`.
    #[must_use]
    pub fn result(&self, compiled_id: u64, value_hash: u64) -> Option<bool> {
        self.results
            .lock()
            .expect("result cache lock poisoned")
            .get(&(compiled_id, value_hash))
            .copied()
    }

    /// Record a match result for `(compiled_id, value_hash)`.
    pub fn put_result(&self, compiled_id: u64, value_hash: u64, matched: bool) {
        self.results
            .lock()
            .expect("result cache lock poisoned")
            .put((compiled_id, value_hash), matched);
    }

    /// Drop every cached entry. Called whenever `superego-config` swaps in a
    /// new `RuleSet`, since pattern identities (and therefore cache keys
    /// derived from rule content) may no longer correspond to the same
    /// rules.
    pub fn flush(&self) {
        self.compiled.lock().expect("compiled cache lock poisoned").clear();
        self.results.lock().expect("result cache lock poisoned").clear();
    }
}
