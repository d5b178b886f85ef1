//! Compiled query cache
//!
//! `Document::select_node(s)` compile the same few expressions over and
//! over. Queries without variables depend only on their text, so they are
//! kept in a small per-thread LRU keyed by that text.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use super::compiler::XPathQuery;

/// Queries kept per thread
pub const DEFAULT_CAPACITY: usize = 64;

thread_local! {
    static QUERY_CACHE: RefCell<QueryCache> = RefCell::new(QueryCache::new(DEFAULT_CAPACITY));
}

/// LRU of compiled, variable-free queries
pub struct QueryCache {
    entries: LruCache<String, Rc<XPathQuery>>,
}

impl QueryCache {
    /// A capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            entries: LruCache::new(capacity),
        }
    }

    /// Cached query for `expression`, compiling it on a miss
    ///
    /// Failed compiles are cached too; callers check `result()`.
    pub fn get_or_compile(&mut self, expression: &str) -> Rc<XPathQuery> {
        if let Some(query) = self.entries.get(expression) {
            trace!(expression, "query cache hit");
            return Rc::clone(query);
        }
        trace!(expression, "query cache miss");
        let query = Rc::new(XPathQuery::new(expression, None));
        self.entries.put(expression.to_string(), Rc::clone(&query));
        query
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Compile through this thread's cache
pub(crate) fn cached_query(expression: &str) -> Rc<XPathQuery> {
    QUERY_CACHE.with(|cache| cache.borrow_mut().get_or_compile(expression))
}

/// Drop every query cached on this thread
pub fn clear_query_cache() {
    QUERY_CACHE.with(|cache| cache.borrow_mut().clear());
}
