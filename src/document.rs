//! The JSON document: raw bytes until something needs the decoded tree.

use crate::error::Error;
use crate::mutation;
use crate::options::DocumentOptions;
use crate::result::QueryResult;
use jsonxp_path::{EvaluationContext, PathError, Query, RawNode, select};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The two representations a document moves between, in one direction only.
#[derive(Debug)]
enum State {
    /// The source bytes as given. Direct queries scan them in place.
    Raw(Vec<u8>),
    /// The decoded, mutable tree.
    Materialized(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Owned,
    View,
}

/// A JSON document that answers path queries and accepts mutations.
///
/// A document parsed from bytes starts out *raw*: queries made only of field
/// and index steps are answered by scanning the bytes, decoding nothing but
/// the match. The first query that needs more (a filter, wildcard, slice,
/// recursive or parent step) or the first `set`/`delete` decodes the whole
/// source once; from then on the document is *materialized* and stays so.
///
/// `Document` is `Send + Sync`. Queries share a read lock; mutations hold the
/// write lock for their whole duration, so no query observes a half-applied
/// change.
#[derive(Debug)]
pub struct Document {
    state: RwLock<State>,
    materialized: AtomicBool,
    access: Access,
    options: Arc<DocumentOptions>,
}

impl Document {
    // --- Construction ---

    /// Validates `bytes` as JSON and wraps them without decoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the bytes are not a single,
    /// well-formed JSON value.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        Self::parse_with_options(bytes, DocumentOptions::shared())
    }

    pub fn parse_with_options(
        bytes: impl Into<Vec<u8>>,
        options: Arc<DocumentOptions>,
    ) -> Result<Self, Error> {
        let bytes = bytes.into();
        serde_json::from_slice::<Validated>(&bytes)?;
        log::trace!("Parsed document of {} bytes", bytes.len());
        Ok(Self {
            state: RwLock::new(State::Raw(bytes)),
            materialized: AtomicBool::new(false),
            access: Access::Owned,
            options,
        })
    }

    /// An owned, already materialized document.
    pub fn from_value(value: Value) -> Self {
        Self::from_tree(value, Access::Owned, DocumentOptions::shared())
    }

    pub(crate) fn view_of(value: Value, options: Arc<DocumentOptions>) -> Self {
        Self::from_tree(value, Access::View, options)
    }

    fn from_tree(value: Value, access: Access, options: Arc<DocumentOptions>) -> Self {
        Self {
            state: RwLock::new(State::Materialized(value)),
            materialized: AtomicBool::new(true),
            access,
            options,
        }
    }

    /// A read-only copy of the first value matched by `path`.
    ///
    /// # Errors
    ///
    /// Returns the query's error, or [`Error::NotFound`] if nothing matched.
    pub fn view(&self, path: &str) -> Result<Document, Error> {
        self.query(path).to_document()
    }

    // --- State ---

    /// True once the source has been decoded. Never reverts.
    pub fn is_materialized(&self) -> bool {
        self.materialized.load(Ordering::Acquire)
    }

    /// True for views derived from another document or result.
    pub fn is_read_only(&self) -> bool {
        self.access == Access::View
    }

    pub fn options(&self) -> &Arc<DocumentOptions> {
        &self.options
    }

    // --- Queries ---

    /// Runs `path` against the document. Syntax and engine errors are carried
    /// by the returned result rather than returned directly.
    pub fn query(&self, path: &str) -> QueryResult {
        match self.options.cache().get_or_parse(path) {
            Ok(query) => self.run(path, &query),
            Err(e) => QueryResult::failed(path, e.into(), Arc::clone(&self.options)),
        }
    }

    /// Runs an already parsed query, bypassing the cache.
    pub fn query_compiled(&self, query: &Query) -> QueryResult {
        self.run("", query)
    }

    fn run(&self, path: &str, query: &Query) -> QueryResult {
        let e_ctx = self.options.evaluation_context();
        let outcome = if query.is_direct() {
            let state = self.state.read();
            execute_on(query, &state, &e_ctx)
        } else {
            match self.read_materialized() {
                Ok(state) => execute_on(query, &state, &e_ctx),
                Err(e) => return QueryResult::failed(path, e, Arc::clone(&self.options)),
            }
        };

        match outcome {
            Ok(matches) => QueryResult::new(path, matches, Arc::clone(&self.options)),
            Err(e) => QueryResult::failed(path, e.into(), Arc::clone(&self.options)),
        }
    }

    /// A read guard over the materialized state, decoding first if needed.
    /// The decoding call upgrades to the write lock and downgrades afterwards,
    /// so it continues as an ordinary reader.
    fn read_materialized(&self) -> Result<RwLockReadGuard<'_, State>, Error> {
        if self.is_materialized() {
            return Ok(self.state.read());
        }

        let guard = self.state.upgradable_read();
        if matches!(*guard, State::Materialized(_)) {
            return Ok(RwLockUpgradableReadGuard::downgrade(guard));
        }
        let mut write = RwLockUpgradableReadGuard::upgrade(guard);
        self.materialize(&mut write)?;
        Ok(RwLockWriteGuard::downgrade(write))
    }

    /// Decodes a raw state in place and returns the tree.
    fn materialize<'s>(&self, state: &'s mut State) -> Result<&'s mut Value, Error> {
        if let State::Raw(bytes) = state {
            let value: Value = serde_json::from_slice(bytes)?;
            log::debug!("Materializing document ({} bytes)", bytes.len());
            *state = State::Materialized(value);
            self.materialized.store(true, Ordering::Release);
        }
        match state {
            State::Materialized(value) => Ok(value),
            State::Raw(_) => Err(Error::InvalidInput(
                "document could not be materialized".to_string(),
            )),
        }
    }

    // --- Mutations ---

    /// Writes `value` at `path`, creating missing intermediate objects. The
    /// empty path replaces the whole document.
    ///
    /// # Errors
    ///
    /// - [`Error::ReadOnly`] on a view.
    /// - [`Error::InvalidQuerySyntax`] if `path` is malformed or not a plain
    ///   sequence of field names and indices.
    /// - [`Error::NotFound`] for an array index outside the array; arrays
    ///   are never extended.
    /// - [`Error::TypeMismatch`] when the path runs through a scalar.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.ensure_writable()?;
        let segments = self.direct_segments(path)?;
        let mut state = self.state.write();
        let root = self.materialize(&mut state)?;
        mutation::set(root, &segments, value.into(), path)
    }

    /// Removes the member or element at `path`. Later array elements shift down.
    ///
    /// # Errors
    ///
    /// - [`Error::ReadOnly`] on a view.
    /// - [`Error::InvalidQuerySyntax`] for malformed or non-direct paths, and
    ///   for the root path.
    /// - [`Error::NotFound`] if there is nothing at `path`.
    pub fn delete(&self, path: &str) -> Result<(), Error> {
        self.ensure_writable()?;
        let segments = self.direct_segments(path)?;
        let mut state = self.state.write();
        let root = self.materialize(&mut state)?;
        mutation::delete(root, &segments, path)
    }

    fn ensure_writable(&self) -> Result<(), Error> {
        if self.is_read_only() {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn direct_segments(&self, path: &str) -> Result<Vec<jsonxp_path::PathSegment>, Error> {
        let query = self.options.cache().get_or_parse(path)?;
        query.direct_segments().ok_or_else(|| {
            Error::syntax(
                path,
                "mutations accept only field names and array indices",
            )
        })
    }

    // --- Output ---

    /// The original bytes while raw; the re-encoded tree once materialized.
    ///
    /// # Errors
    ///
    /// Encoding a materialized tree can fail only for values `serde_json`
    /// refuses to write.
    pub fn bytes(&self) -> Result<Vec<u8>, Error> {
        match &*self.state.read() {
            State::Raw(bytes) => Ok(bytes.clone()),
            State::Materialized(value) => Ok(serde_json::to_vec(value)?),
        }
    }

    pub fn text(&self) -> Result<String, Error> {
        String::from_utf8(self.bytes()?).map_err(|e| Error::InvalidInput(e.to_string()))
    }

    /// A decoded copy of the whole document. Does not materialize it.
    pub fn to_value(&self) -> Result<Value, Error> {
        match &*self.state.read() {
            State::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
            State::Materialized(value) => Ok(value.clone()),
        }
    }
}

fn execute_on(
    query: &Query,
    state: &State,
    e_ctx: &EvaluationContext<'_>,
) -> Result<Vec<Value>, PathError> {
    match state {
        State::Raw(bytes) => match RawNode::root(bytes) {
            Some(root) => select(query, root, e_ctx),
            None => Ok(Vec::new()),
        },
        State::Materialized(value) => select(query, value, e_ctx),
    }
}

// --- Validation ---

/// Checks a source against everything `Value` decoding enforces (UTF-8
/// strings, numbers in range, the nesting limit) without building the tree.
/// Any node of an accepted source later decodes on its own.
struct Validated;

impl<'de> Deserialize<'de> for Validated {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValidatedVisitor)
    }
}

struct ValidatedVisitor;

impl<'de> Visitor<'de> for ValidatedVisitor {
    type Value = Validated;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any valid JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Validated, E> {
        Ok(Validated)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Validated, E> {
        Ok(Validated)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Validated, E> {
        Ok(Validated)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Validated, E> {
        Ok(Validated)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Validated, E> {
        Ok(Validated)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Validated, E> {
        Ok(Validated)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Validated, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<Validated>()?.is_some() {}
        Ok(Validated)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Validated, A::Error>
    where
        A: MapAccess<'de>,
    {
        while map.next_entry::<Validated, Validated>()?.is_some() {}
        Ok(Validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const SOURCE: &str = r#"{"a":{"b":[1,2,3]},"s":"x"}"#;

    #[test]
    fn test_parse_rejects_invalid_json() {
        for bad in ["", "{", "[1,]", "{} {}", "nul"] {
            let err = Document::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{:?}", bad);
        }
    }

    #[test]
    fn test_parse_rejects_what_decoding_rejects() {
        let nested = format!("{}{}", "[".repeat(200), "]".repeat(200));
        let cases: [&[u8]; 4] = [
            br#"{"a":1e400,"b":"x"}"#,
            b"{\"s\":\"\xff\"}",
            b"{\"\xc3\":1}",
            nested.as_bytes(),
        ];
        for bad in cases {
            let err = Document::parse(bad.to_vec()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{:?}", bad);
            assert!(serde_json::from_slice::<Value>(bad).is_err());
        }
    }

    #[test]
    fn test_parse_accepts_what_decoding_accepts() {
        let nested = format!("{}1{}", "[".repeat(100), "]".repeat(100));
        for good in [nested.as_str(), r#"{"big":18446744073709551615,"neg":-1.5e300}"#] {
            assert!(Document::parse(good).is_ok(), "{}", good);
            assert!(serde_json::from_str::<Value>(good).is_ok());
        }
    }

    #[test]
    fn test_direct_query_stays_raw() {
        let doc = Document::parse(SOURCE).unwrap();
        assert_eq!(doc.query("/a/b[-1]").as_value().unwrap(), json!(3));
        assert_eq!(doc.query("/a/b/0").as_value().unwrap(), json!(1));
        assert!(doc.query("/a/missing").is_empty());
        assert!(!doc.is_materialized());
    }

    #[test]
    fn test_non_direct_query_materializes() {
        let doc = Document::parse(SOURCE).unwrap();
        assert_eq!(doc.query("/a/b[0:2]").as_value().unwrap(), json!([1, 2]));
        assert!(doc.is_materialized());
        assert_eq!(doc.query("/a/b[-1]").as_value().unwrap(), json!(3));
    }

    #[test]
    fn test_syntax_error_is_sticky_and_does_not_materialize() {
        let doc = Document::parse(SOURCE).unwrap();
        let result = doc.query("/a[?(@.x ==");
        assert_eq!(
            result.error().map(Error::kind),
            Some(ErrorKind::InvalidQuerySyntax)
        );
        assert!(!doc.is_materialized());
    }

    #[test]
    fn test_bytes_unchanged_while_raw() {
        let source = "{ \"a\" : 1 }";
        let doc = Document::parse(source).unwrap();
        doc.query("/a");
        assert_eq!(doc.bytes().unwrap(), source.as_bytes());
        assert_eq!(doc.text().unwrap(), source);
    }

    #[test]
    fn test_set_and_delete() {
        let doc = Document::parse(SOURCE).unwrap();
        doc.set("/a/c", 5).unwrap();
        assert!(doc.is_materialized());
        assert_eq!(doc.query("/a/c").as_int().unwrap(), 5);

        doc.delete("/a/b").unwrap();
        assert!(doc.query("/a/b").is_empty());
        assert_eq!(doc.text().unwrap(), r#"{"a":{"c":5},"s":"x"}"#);
    }

    #[test]
    fn test_mutation_rejects_non_direct_paths() {
        let doc = Document::parse(SOURCE).unwrap();
        let err = doc.set("/a/*", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuerySyntax);
        let err = doc.delete("//b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuerySyntax);
        assert!(!doc.is_materialized());
    }

    #[test]
    fn test_views_are_read_only() {
        let doc = Document::parse(SOURCE).unwrap();
        let view = doc.view("/a").unwrap();
        assert!(view.is_read_only());
        assert_eq!(view.query("/b[1]").as_int().unwrap(), 2);
        assert_eq!(view.set("/b", 1).unwrap_err(), Error::ReadOnly);
        assert_eq!(view.delete("/b").unwrap_err(), Error::ReadOnly);
        assert_eq!(doc.view("/zzz").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_from_value_is_materialized_and_writable() {
        let doc = Document::from_value(json!({ "k": [] }));
        assert!(doc.is_materialized());
        assert!(!doc.is_read_only());
        doc.set("/k2", "v").unwrap();
        assert_eq!(doc.to_value().unwrap(), json!({ "k": [], "k2": "v" }));
    }

    #[test]
    fn test_to_value_does_not_materialize() {
        let doc = Document::parse(SOURCE).unwrap();
        assert_eq!(doc.to_value().unwrap()["s"], json!("x"));
        assert!(!doc.is_materialized());
    }

    #[test]
    fn test_document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }
}
