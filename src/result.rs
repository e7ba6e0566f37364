//! Query results: zero or more matches plus a sticky error.

use crate::document::Document;
use crate::error::Error;
use crate::options::DocumentOptions;
use jsonxp_path::evaluator::{value_as_bool, value_as_number};
use jsonxp_path::{NodeKind, select};
use serde_json::Value;
use std::sync::Arc;

/// The outcome of a query.
///
/// A failed query still produces a `QueryResult`; its error is *sticky*:
/// chained [`query`](QueryResult::query) calls carry it forward and every
/// accessor returns it, so a chain needs checking only once at the end.
#[derive(Debug, Clone)]
pub struct QueryResult {
    path: String,
    matches: Vec<Value>,
    error: Option<Error>,
    options: Arc<DocumentOptions>,
}

impl QueryResult {
    pub(crate) fn new(path: &str, matches: Vec<Value>, options: Arc<DocumentOptions>) -> Self {
        Self {
            path: path.to_string(),
            matches,
            error: None,
            options,
        }
    }

    pub(crate) fn failed(path: &str, error: Error, options: Arc<DocumentOptions>) -> Self {
        Self {
            path: path.to_string(),
            matches: Vec::new(),
            error: Some(error),
            options,
        }
    }

    // --- Inspection ---

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// True if the query succeeded and matched at least once.
    pub fn exists(&self) -> bool {
        self.error.is_none() && !self.matches.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.matches
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The matches, or the sticky error.
    pub fn into_result(self) -> Result<Vec<Value>, Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.matches),
        }
    }

    /// Encodes all matches as a JSON array.
    pub fn to_json(&self) -> Result<String, Error> {
        self.check()?;
        Ok(serde_json::to_string(&self.matches)?)
    }

    // --- Chaining ---

    /// Runs `path` against every match, concatenating the results in order.
    pub fn query(&self, path: &str) -> QueryResult {
        if let Some(e) = &self.error {
            return QueryResult::failed(path, e.clone(), Arc::clone(&self.options));
        }
        let query = match self.options.cache().get_or_parse(path) {
            Ok(query) => query,
            Err(e) => return QueryResult::failed(path, e.into(), Arc::clone(&self.options)),
        };

        let e_ctx = self.options.evaluation_context();
        let mut matches = Vec::new();
        for value in &self.matches {
            match select(&query, value, &e_ctx) {
                Ok(found) => matches.extend(found),
                Err(e) => return QueryResult::failed(path, e.into(), Arc::clone(&self.options)),
            }
        }
        QueryResult::new(path, matches, Arc::clone(&self.options))
    }

    /// A read-only document over a copy of the first match.
    pub fn to_document(&self) -> Result<Document, Error> {
        let value = self.first()?.clone();
        Ok(Document::view_of(value, Arc::clone(&self.options)))
    }

    // --- Typed Accessors ---

    fn check(&self) -> Result<(), Error> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// The first match. With several matches the rest are ignored.
    pub fn first(&self) -> Result<&Value, Error> {
        self.check()?;
        self.matches
            .first()
            .ok_or_else(|| Error::NotFound(self.path.clone()))
    }

    pub fn as_value(&self) -> Result<Value, Error> {
        self.first().cloned()
    }

    /// Borrows a string match. Other types are a mismatch; nothing is
    /// stringified.
    pub fn as_str(&self) -> Result<&str, Error> {
        let value = self.first()?;
        value.as_str().ok_or_else(|| mismatch("string", value))
    }

    pub fn as_string(&self) -> Result<String, Error> {
        self.as_str().map(str::to_string)
    }

    /// An integral number, or a string holding one.
    pub fn as_int(&self) -> Result<i64, Error> {
        let value = self.first()?;
        if let Some(i) = value.as_i64() {
            return Ok(i);
        }
        value_as_number(value)
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
            .ok_or_else(|| mismatch("integer", value))
    }

    /// A number, or a string holding a finite one.
    pub fn as_float(&self) -> Result<f64, Error> {
        let value = self.first()?;
        value_as_number(value).ok_or_else(|| mismatch("number", value))
    }

    /// A boolean, a number (nonzero is true), or exactly `"true"` / `"false"`.
    pub fn as_bool(&self) -> Result<bool, Error> {
        let value = self.first()?;
        value_as_bool(value).ok_or_else(|| mismatch("bool", value))
    }

    pub fn as_array(&self) -> Result<&[Value], Error> {
        let value = self.first()?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| mismatch("array", value))
    }

    // --- Panicking Accessors ---
    //
    // For call sites that have already established the match exists. Each
    // panics with the error its fallible counterpart would have returned.

    pub fn must_value(&self) -> Value {
        self.as_value().unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn must_str(&self) -> &str {
        self.as_str().unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn must_string(&self) -> String {
        self.as_string().unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn must_int(&self) -> i64 {
        self.as_int().unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn must_float(&self) -> f64 {
        self.as_float().unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn must_bool(&self) -> bool {
        self.as_bool().unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn must_array(&self) -> &[Value] {
        self.as_array().unwrap_or_else(|e| panic!("{}", e))
    }
}

impl IntoIterator for QueryResult {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
        expected,
        found: NodeKind::of(found).name(),
    }
}
