//! Process-local LRU cache mapping expression source to its parsed AST.
//!
//! Owned by a [`crate::engine::FhirPathEngine`] instance rather than a global
//! static, per the "no ambient process-wide mutable state" design note.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::ast::AstNode;
use crate::error::Result;

pub struct ExpressionCache {
    cache: Mutex<LruCache<String, Arc<AstNode>>>,
}

impl ExpressionCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Return the cached AST for `source`, parsing and inserting on a miss.
    pub fn get_or_parse(&self, source: &str) -> Result<Arc<AstNode>> {
        if let Some(hit) = self.cache.lock().unwrap().get(source) {
            return Ok(hit.clone());
        }
        tracing::trace!(source, "fhirpath expression cache miss");
        let parsed = Arc::new(crate::parser::parse(source)?);
        self.cache.lock().unwrap().put(source.to_string(), parsed.clone());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_parse_returns_the_same_cached_instance() {
        let cache = ExpressionCache::new(NonZeroUsize::new(8).unwrap());
        let first = cache.get_or_parse("name.given").unwrap();
        let second = cache.get_or_parse("name.given").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn eviction_drops_old_entries_but_keeps_cache_usable() {
        let cache = ExpressionCache::new(NonZeroUsize::new(1).unwrap());
        cache.get_or_parse("a").unwrap();
        cache.get_or_parse("b").unwrap();
        // `a` was evicted, but re-parsing it must still succeed.
        assert!(cache.get_or_parse("a").is_ok());
    }
}
