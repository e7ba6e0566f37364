//! In-place `set` and `delete` over a materialized tree.

use crate::error::Error;
use jsonxp_path::selectors::resolve_index;
use jsonxp_path::{NodeKind, PathSegment};
use serde_json::{Map, Value};

pub(crate) fn set(
    root: &mut Value,
    segments: &[PathSegment],
    value: Value,
    path: &str,
) -> Result<(), Error> {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };
    check_set(root, parents, last, path)?;

    let mut current = root;
    for segment in parents {
        current = child_or_create(current, segment, path)?;
    }

    match current {
        Value::Object(map) => match last {
            PathSegment::Key(key) => {
                map.insert(key.clone(), value);
                Ok(())
            }
            PathSegment::Index(_) => Err(Error::TypeMismatch {
                expected: "array",
                found: "object",
            }),
        },
        Value::Array(items) => {
            let index = element_index(items.len(), last, path)?;
            items[index] = value;
            Ok(())
        }
        other => Err(mismatch(expected_for(last), other)),
    }
}

pub(crate) fn delete(root: &mut Value, segments: &[PathSegment], path: &str) -> Result<(), Error> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(Error::syntax(path, "the document root cannot be deleted"));
    };

    let mut current = root;
    for segment in parents {
        current = existing_child(current, segment, path)?;
    }

    match (current, last) {
        (Value::Object(map), PathSegment::Key(key)) => map
            .shift_remove(key.as_str())
            .map(|_| ())
            .ok_or_else(|| not_found(path)),
        (Value::Array(items), segment) => {
            let index = element_index(items.len(), segment, path)?;
            items.remove(index);
            Ok(())
        }
        _ => Err(not_found(path)),
    }
}

// --- Walking ---

/// Walks the target of a `set` without touching the tree, so a write that
/// fails leaves no intermediate objects behind. `None` stands for an object
/// the write would create.
fn check_set(
    root: &Value,
    parents: &[PathSegment],
    last: &PathSegment,
    path: &str,
) -> Result<(), Error> {
    let mut current = Some(root);
    for segment in parents {
        current = match (current, segment) {
            (None | Some(Value::Object(_)), PathSegment::Index(_)) => {
                return Err(Error::TypeMismatch {
                    expected: "array",
                    found: "object",
                });
            }
            (None, PathSegment::Key(_)) => None,
            (Some(Value::Object(map)), PathSegment::Key(key)) => map.get(key.as_str()),
            (Some(Value::Array(items)), segment) => {
                Some(&items[element_index(items.len(), segment, path)?])
            }
            (Some(other), segment) => return Err(mismatch(expected_for(segment), other)),
        };
    }

    match (current, last) {
        (None | Some(Value::Object(_)), PathSegment::Key(_)) => Ok(()),
        (None | Some(Value::Object(_)), PathSegment::Index(_)) => Err(Error::TypeMismatch {
            expected: "array",
            found: "object",
        }),
        (Some(Value::Array(items)), segment) => {
            element_index(items.len(), segment, path).map(|_| ())
        }
        (Some(other), segment) => Err(mismatch(expected_for(segment), other)),
    }
}

fn child_or_create<'v>(
    current: &'v mut Value,
    segment: &PathSegment,
    path: &str,
) -> Result<&'v mut Value, Error> {
    match current {
        Value::Object(map) => match segment {
            PathSegment::Key(key) => Ok(map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()))),
            PathSegment::Index(_) => Err(Error::TypeMismatch {
                expected: "array",
                found: "object",
            }),
        },
        Value::Array(items) => {
            let index = element_index(items.len(), segment, path)?;
            Ok(&mut items[index])
        }
        other => Err(mismatch(expected_for(segment), other)),
    }
}

fn existing_child<'v>(
    current: &'v mut Value,
    segment: &PathSegment,
    path: &str,
) -> Result<&'v mut Value, Error> {
    match (current, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.get_mut(key.as_str()).ok_or_else(|| not_found(path))
        }
        (Value::Array(items), segment) => {
            let index = element_index(items.len(), segment, path)?;
            Ok(&mut items[index])
        }
        _ => Err(not_found(path)),
    }
}

/// Resolves an array position. A key segment counts when it is a
/// non-negative integer (`/list/0`).
fn element_index(len: usize, segment: &PathSegment, path: &str) -> Result<usize, Error> {
    let index = match segment {
        PathSegment::Index(i) => *i,
        PathSegment::Key(key) => key
            .parse::<i64>()
            .ok()
            .filter(|i| *i >= 0)
            .ok_or(Error::TypeMismatch {
                expected: "object",
                found: "array",
            })?,
    };
    resolve_index(index, len).ok_or_else(|| not_found(path))
}

// --- Errors ---

fn not_found(path: &str) -> Error {
    Error::NotFound(path.to_string())
}

fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
        expected,
        found: NodeKind::of(found).name(),
    }
}

fn expected_for(segment: &PathSegment) -> &'static str {
    match segment {
        PathSegment::Key(_) => "object",
        PathSegment::Index(_) => "array",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use jsonxp_path::Query;
    use serde_json::json;

    fn segments(path: &str) -> Vec<PathSegment> {
        Query::parse(path).unwrap().direct_segments().unwrap()
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut doc = json!({});
        set(&mut doc, &segments("/a/b/c"), json!(1), "/a/b/c").unwrap();
        assert_eq!(doc, json!({ "a": { "b": { "c": 1 } } }));
    }

    #[test]
    fn test_set_array_element_by_index_and_key() {
        let mut doc = json!({ "xs": [1, 2, 3] });
        set(&mut doc, &segments("/xs[-1]"), json!(9), "").unwrap();
        set(&mut doc, &segments("/xs/0"), json!(7), "").unwrap();
        assert_eq!(doc, json!({ "xs": [7, 2, 9] }));
    }

    #[test]
    fn test_set_never_extends_arrays() {
        let mut doc = json!({ "xs": [1] });
        let err = set(&mut doc, &segments("/xs[1]"), json!(2), "/xs[1]").unwrap_err();
        assert_eq!(err, Error::NotFound("/xs[1]".into()));
        assert_eq!(doc, json!({ "xs": [1] }));
    }

    #[test]
    fn test_set_through_scalar_is_type_mismatch() {
        let mut doc = json!({ "a": 5 });
        let err = set(&mut doc, &segments("/a/b"), json!(1), "/a/b").unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: "object",
                found: "number"
            }
        );
        let mut doc = json!({ "xs": [] });
        let err = set(&mut doc, &segments("/xs/name"), json!(1), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_failed_set_leaves_tree_untouched() {
        let mut doc = json!({ "a": {} });
        let path = "/a/new/deeper[0]";
        let err = set(&mut doc, &segments(path), json!(1), path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(doc, json!({ "a": {} }));

        let mut doc = json!({ "a": { "xs": [] } });
        let path = "/a/xs[3]/b";
        let err = set(&mut doc, &segments(path), json!(1), path).unwrap_err();
        assert_eq!(err, Error::NotFound(path.into()));
        assert_eq!(doc, json!({ "a": { "xs": [] } }));

        let mut doc = json!({ "a": [{ "n": 1 }] });
        let err = set(&mut doc, &segments("/a[0]/m/n/k[1]"), json!(1), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(doc, json!({ "a": [{ "n": 1 }] }));
    }

    #[test]
    fn test_set_root_replaces_document() {
        let mut doc = json!({ "a": 1 });
        set(&mut doc, &[], json!([true]), "").unwrap();
        assert_eq!(doc, json!([true]));
    }

    #[test]
    fn test_delete_shifts_array_elements() {
        let mut doc = json!({ "xs": ["a", "b", "c"] });
        delete(&mut doc, &segments("/xs[0]"), "").unwrap();
        assert_eq!(doc, json!({ "xs": ["b", "c"] }));
    }

    #[test]
    fn test_delete_missing_and_root() {
        let mut doc = json!({ "a": { "b": 1 } });
        assert_eq!(
            delete(&mut doc, &segments("/a/x"), "/a/x").unwrap_err(),
            Error::NotFound("/a/x".into())
        );
        assert_eq!(
            delete(&mut doc, &segments("/q/x"), "/q/x").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            delete(&mut doc, &[], "/").unwrap_err().kind(),
            ErrorKind::InvalidQuerySyntax
        );
    }

    #[test]
    fn test_delete_preserves_member_order() {
        let mut doc = json!({ "a": 1, "b": 2, "c": 3 });
        delete(&mut doc, &segments("/a"), "").unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"b":2,"c":3}"#);
    }
}
