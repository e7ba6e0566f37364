//! A lazy `DataSourceNode` over unparsed JSON bytes.
//!
//! A [`RawNode`] is a byte range inside the source. Navigating to a member or
//! element only skips over siblings; nothing is decoded until
//! [`DataSourceNode::to_value`] is called on the node that was asked for.
//! The scanner assumes the source is well-formed JSON (callers validate it
//! once up front) and treats anything unexpected as "no such node".

use super::{DataSourceNode, NodeKind};
use crate::error::PathError;
use memchr::memchr2;
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct RawNode<'a> {
    source: &'a [u8],
    start: usize,
    end: usize,
}

impl<'a> RawNode<'a> {
    /// The top-level value of `source`, or `None` if there is none.
    pub fn root(source: &'a [u8]) -> Option<Self> {
        let start = skip_whitespace(source, 0);
        Self::at(source, start)
    }

    fn at(source: &'a [u8], start: usize) -> Option<Self> {
        let end = value_end(source, start)?;
        Some(Self { source, start, end })
    }

    /// The exact source text of this value.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.source[self.start..self.end]
    }

    fn entries(&self) -> ObjectEntries<'a> {
        ObjectEntries {
            source: self.source,
            pos: self.start + 1,
            done: self.kind() != NodeKind::Object,
        }
    }

    fn elements(&self) -> ArrayElements<'a> {
        ArrayElements {
            source: self.source,
            pos: self.start + 1,
            done: self.kind() != NodeKind::Array,
        }
    }
}

impl<'a> DataSourceNode<'a> for RawNode<'a> {
    fn kind(&self) -> NodeKind {
        match self.source[self.start] {
            b'{' => NodeKind::Object,
            b'[' => NodeKind::Array,
            b'"' => NodeKind::String,
            b't' | b'f' => NodeKind::Bool,
            b'n' => NodeKind::Null,
            _ => NodeKind::Number,
        }
    }

    fn field(&self, name: &str) -> Option<Self> {
        self.entries()
            .filter(|(key, _)| key_matches(key, name))
            .last()
            .map(|(_, value)| value)
    }

    fn element(&self, index: usize) -> Option<Self> {
        self.elements().nth(index)
    }

    fn len(&self) -> usize {
        match self.kind() {
            NodeKind::Object => self.entries().count(),
            NodeKind::Array => self.elements().count(),
            _ => 0,
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self.kind() {
            NodeKind::Object => Box::new(self.entries().map(|(_, value)| value)),
            NodeKind::Array => Box::new(self.elements()),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn to_value(&self) -> Result<Value, PathError> {
        serde_json::from_slice(self.as_bytes()).map_err(|e| PathError::Decode(e.to_string()))
    }

    fn identity(&self) -> usize {
        self.source.as_ptr() as usize + self.start
    }
}

// --- Iterators ---

/// Yields `(quoted key bytes, value)` for each object member in source order.
struct ObjectEntries<'a> {
    source: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Iterator for ObjectEntries<'a> {
    type Item = (&'a [u8], RawNode<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let entry = self.scan_entry();
        if entry.is_none() {
            self.done = true;
        }
        entry
    }
}

impl<'a> ObjectEntries<'a> {
    fn scan_entry(&mut self) -> Option<(&'a [u8], RawNode<'a>)> {
        let source = self.source;
        let mut pos = skip_separator(source, self.pos);
        if source.get(pos)? != &b'"' {
            return None;
        }
        let key_end = string_end(source, pos + 1)? + 1;
        let key = &source[pos..key_end];

        pos = skip_whitespace(source, key_end);
        if source.get(pos)? != &b':' {
            return None;
        }
        pos = skip_whitespace(source, pos + 1);
        let value = RawNode::at(source, pos)?;
        self.pos = value.end;
        Some((key, value))
    }
}

/// Yields each array element in index order.
struct ArrayElements<'a> {
    source: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Iterator for ArrayElements<'a> {
    type Item = RawNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let pos = skip_separator(self.source, self.pos);
        match RawNode::at(self.source, pos) {
            Some(element) => {
                self.pos = element.end;
                Some(element)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

// --- Scanning ---

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while let Some(b' ' | b'\t' | b'\n' | b'\r') = bytes.get(pos) {
        pos += 1;
    }
    pos
}

/// Skips whitespace and at most one `,` between members or elements.
fn skip_separator(bytes: &[u8], pos: usize) -> usize {
    let pos = skip_whitespace(bytes, pos);
    if bytes.get(pos) == Some(&b',') {
        skip_whitespace(bytes, pos + 1)
    } else {
        pos
    }
}

/// Position one past the end of the value starting at `pos`.
fn value_end(bytes: &[u8], pos: usize) -> Option<usize> {
    match *bytes.get(pos)? {
        b'"' => string_end(bytes, pos + 1).map(|end| end + 1),
        b'{' | b'[' => container_end(bytes, pos),
        b't' => literal_end(bytes, pos, b"true"),
        b'f' => literal_end(bytes, pos, b"false"),
        b'n' => literal_end(bytes, pos, b"null"),
        b'-' | b'0'..=b'9' => {
            let mut end = pos + 1;
            while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = bytes.get(end) {
                end += 1;
            }
            Some(end)
        }
        _ => None,
    }
}

fn literal_end(bytes: &[u8], pos: usize, word: &[u8]) -> Option<usize> {
    let end = pos + word.len();
    (bytes.get(pos..end)? == word).then_some(end)
}

/// Position of the closing quote of a string whose content starts at `pos`.
fn string_end(bytes: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let offset = memchr2(b'"', b'\\', bytes.get(pos..)?)?;
        let found = pos + offset;
        if bytes[found] == b'"' {
            return Some(found);
        }
        pos = found + 2;
    }
}

/// Position one past the bracket that closes the container opened at `pos`.
fn container_end(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => {
                pos = string_end(bytes, pos + 1)?;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Compares a quoted key from the source with a field name, unescaping only
/// when the key contains a backslash.
fn key_matches(quoted: &[u8], name: &str) -> bool {
    let inner = &quoted[1..quoted.len() - 1];
    if !inner.contains(&b'\\') {
        return inner == name.as_bytes();
    }
    serde_json::from_slice::<String>(quoted).is_ok_and(|key| key == name)
}
