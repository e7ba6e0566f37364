//! Query and mutate JSON documents with an XPath-like path language.
//!
//! ```
//! let doc = jsonxp::parse(r#"{"a":{"b":[1,2,3]}}"#).unwrap();
//! assert_eq!(doc.query("/a/b[-1]").as_int().unwrap(), 3);
//! assert_eq!(doc.query("a.b[0:2]").as_value().unwrap(), serde_json::json!([1, 2]));
//!
//! doc.set("/a/c", 5).unwrap();
//! assert_eq!(doc.query("/a/c").must_int(), 5);
//! ```
//!
//! Documents start out as raw bytes and decode lazily; see [`Document`].
//! The path language itself lives in the `jsonxp-path` crate and is
//! re-exported as [`path`].

mod cache;
mod document;
mod error;
mod mutation;
mod options;
mod result;

use std::sync::Arc;

// --- Public API ---
pub use cache::QueryCache;
pub use document::Document;
pub use error::{Error, ErrorKind};
pub use jsonxp_path as path;
pub use jsonxp_path::{FunctionRegistry, Operand, Query};
pub use options::{DocumentOptions, QueryLimits};
pub use result::QueryResult;
pub use serde_json::Value;

/// Wraps `bytes` in a [`Document`] with the shared default options.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `bytes` is not well-formed JSON.
pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Document, Error> {
    Document::parse(bytes)
}

pub fn parse_with_options(
    bytes: impl Into<Vec<u8>>,
    options: Arc<DocumentOptions>,
) -> Result<Document, Error> {
    Document::parse_with_options(bytes, options)
}
