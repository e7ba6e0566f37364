//! Configuration shared by documents: limits, filter functions and the AST cache.

use crate::cache::QueryCache;
use jsonxp_path::{DEFAULT_MAX_DEPTH, EvaluationContext, FunctionRegistry};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Numeric limits, loadable from a host's configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Deepest nesting recursive descent will search below its starting node.
    pub max_depth: usize,
    /// Distinct query texts kept parsed. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            cache_capacity: 256,
        }
    }
}

/// Everything a document needs besides its data. Shared via `Arc` between
/// a document, the views derived from it, and other documents.
#[derive(Debug)]
pub struct DocumentOptions {
    limits: QueryLimits,
    functions: Arc<FunctionRegistry>,
    cache: Arc<QueryCache>,
}

static SHARED_DEFAULT: Lazy<Arc<DocumentOptions>> =
    Lazy::new(|| Arc::new(DocumentOptions::default()));

impl Default for DocumentOptions {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            limits,
            functions: Arc::new(FunctionRegistry::default()),
            cache: Arc::new(QueryCache::new(limits.cache_capacity)),
        }
    }
}

impl DocumentOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// The process-wide default used by [`crate::parse`]. Documents built from
    /// it share one AST cache.
    pub fn shared() -> Arc<DocumentOptions> {
        Arc::clone(&SHARED_DEFAULT)
    }

    /// Replaces the limits. The cache is rebuilt to the new capacity.
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self.cache = Arc::new(QueryCache::new(limits.cache_capacity));
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    /// Uses `functions` for filter calls instead of the built-ins.
    pub fn with_functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = functions;
        self
    }

    /// Shares an existing cache, e.g. between option sets that differ only in functions.
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub(crate) fn evaluation_context(&self) -> EvaluationContext<'_> {
        EvaluationContext::new(&self.functions).with_max_depth(self.limits.max_depth)
    }
}
