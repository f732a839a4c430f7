// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concurrency-safe, read-mostly cache of compiled paths, keyed by their
//! text form (§4.2, §9 "Path cache").

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rtk_error::RtkError;
use tracing::trace;

use crate::parser::{self, Segment};

/// Caches compiled path programs by their source text.
///
/// Safe for concurrent read/insert from many threads: a read lock
/// services the common case (path already compiled); a write lock is
/// only taken on a cache miss, and a lost compilation race simply
/// compiles twice rather than blocking.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: RwLock<HashMap<String, Arc<Vec<Segment>>>>,
}

impl PathCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled segments for `path`, compiling and inserting
    /// on a cache miss.
    pub fn get_or_compile(&self, path: &str) -> Result<Arc<Vec<Segment>>, RtkError> {
        if let Some(hit) = self.entries.read().expect("path cache poisoned").get(path) {
            trace!(target: "rtk.path.cache", path, "cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(parser::parse(path)?);
        trace!(target: "rtk.path.cache", path, "cache miss, compiled");
        self.entries
            .write()
            .expect("path cache poisoned")
            .insert(path.to_owned(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of distinct path strings currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("path cache poisoned").len()
    }

    /// Returns `true` if no paths have been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_once_and_reuses_entry() {
        let cache = PathCache::new();
        let first = cache.get_or_compile("$.a.b").unwrap();
        assert_eq!(cache.len(), 1);
        let second = cache.get_or_compile("$.a.b").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_paths_get_distinct_entries() {
        let cache = PathCache::new();
        cache.get_or_compile("$.a").unwrap();
        cache.get_or_compile("$.b").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalid_path_is_not_cached() {
        let cache = PathCache::new();
        assert!(cache.get_or_compile(".a").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_compiles_of_same_path_are_consistent() {
        use std::thread;

        let cache = Arc::new(PathCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_compile("$.items[?(@.v > 1)]").unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results {
            assert_eq!(**r, **results[0]);
        }
    }
}
