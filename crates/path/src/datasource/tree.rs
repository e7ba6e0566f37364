//! `DataSourceNode` over a decoded `serde_json::Value` tree.

use super::{DataSourceNode, NodeKind};
use crate::error::PathError;
use serde_json::Value;

impl<'a> DataSourceNode<'a> for &'a Value {
    fn kind(&self) -> NodeKind {
        NodeKind::of(self)
    }

    fn field(&self, name: &str) -> Option<Self> {
        match *self {
            Value::Object(map) => map.get(name),
            _ => None,
        }
    }

    fn element(&self, index: usize) -> Option<Self> {
        match *self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        match *self {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match *self {
            Value::Array(items) => Box::new(items.iter()),
            Value::Object(map) => Box::new(map.values()),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn to_value(&self) -> Result<Value, PathError> {
        Ok((*self).clone())
    }

    fn identity(&self) -> usize {
        *self as *const Value as usize
    }
}
