use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::aggregate::Aggregate;
use crate::extract::LoadError;
use crate::YearFilter;

/// Process-wide cache of aggregated trees keyed by year filter.
///
/// The lock is held across compute-and-store, so concurrent callers for
/// the same uncached filter run the aggregation once. Invalidation is
/// total: a new source file clears every key.
pub struct TreeCache {
    inner: Mutex<HashMap<YearFilter, Arc<Aggregate>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_compute<F>(&self, filter: YearFilter, compute: F) -> Result<Arc<Aggregate>, LoadError>
    where
        F: FnOnce() -> Result<Aggregate, LoadError>,
    {
        let mut cache = self.inner.lock().unwrap();
        if let Some(tree) = cache.get(&filter) {
            return Ok(Arc::clone(tree));
        }
        let tree = Arc::new(compute()?);
        cache.insert(filter, Arc::clone(&tree));
        Ok(tree)
    }

    pub fn invalidate(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TreeCache {
    fn default() -> Self {
        Self::new()
    }
}
