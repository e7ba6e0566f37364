//! Defines the core abstraction for a navigable, read-only JSON value source.
//!
//! The execution engine is written exclusively against [`DataSourceNode`], so
//! the same query can run over a raw byte buffer (decoded only where it is
//! touched) or over a fully decoded `serde_json::Value` tree.

mod raw;
mod tree;

pub use raw::RawNode;

use crate::error::PathError;
use serde_json::Value;

/// The JSON type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Array => "array",
            NodeKind::Object => "object",
        }
    }

    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => NodeKind::Null,
            Value::Bool(_) => NodeKind::Bool,
            Value::Number(_) => NodeKind::Number,
            Value::String(_) => NodeKind::String,
            Value::Array(_) => NodeKind::Array,
            Value::Object(_) => NodeKind::Object,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Array | NodeKind::Object)
    }
}

/// The universal contract for a node in a read-only JSON source.
///
/// `'a` is the lifetime of the underlying data (the byte buffer or the tree).
/// Nodes are cheap handles; copying one never copies the data it points at.
pub trait DataSourceNode<'a>: std::fmt::Debug + Clone + Copy {
    fn kind(&self) -> NodeKind;

    /// The member called `name`, if this is an object that has one. When an
    /// object repeats a key the last occurrence wins.
    fn field(&self, name: &str) -> Option<Self>;

    /// The element at `index`, if this is an array that long.
    fn element(&self, index: usize) -> Option<Self>;

    /// Element count for arrays, member count for objects, zero otherwise.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array elements in index order, or object values in source order.
    /// Empty for scalars.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// Decodes this node (and only this node) into an owned value.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Decode`] if the node's source is not JSON that
    /// `serde_json::Value` accepts.
    fn to_value(&self) -> Result<Value, PathError>;

    /// A key that is equal for two handles exactly when they refer to the
    /// same node of the same source. Used for identity deduplication.
    fn identity(&self) -> usize;
}
