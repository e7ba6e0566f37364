use jsonxp_path::{PathError, Query};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Parsed queries keyed by their text. When full, the cache is cleared
/// rather than evicting one entry at a time.
#[derive(Debug)]
pub struct QueryCache {
    capacity: usize,
    entries: RwLock<HashMap<String, Arc<Query>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the parsed form of `path`, parsing and caching it on a miss.
    /// Syntax errors are not cached.
    pub fn get_or_parse(&self, path: &str) -> Result<Arc<Query>, PathError> {
        if let Some(query) = self.entries.read().get(path) {
            return Ok(Arc::clone(query));
        }

        let query = Arc::new(Query::parse(path)?);
        if self.capacity == 0 {
            return Ok(query);
        }
        log::debug!("Query cache miss for '{}'", path);

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            log::debug!("Query cache full ({} entries); clearing", entries.len());
            entries.clear();
        }
        Ok(Arc::clone(entries.entry(path.to_string()).or_insert(query)))
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(crate::QueryLimits::default().cache_capacity)
    }
}
