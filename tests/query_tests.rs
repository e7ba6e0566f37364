mod common;

use common::fixtures::{layered, store};
use common::{TestResult, document};
use jsonxp::{Document, ErrorKind, Query};
use serde_json::json;

#[test]
fn test_negative_index_counts_from_end() -> TestResult {
    let doc = document(r#"{"xs":[10,20,30,40]}"#);
    for (k, expected) in [(1, 40), (2, 30), (4, 10)] {
        let path = format!("/xs[-{}]", k);
        assert_eq!(doc.query(&path).as_int()?, expected);
    }
    assert!(doc.query("/xs[-5]").is_empty());
    Ok(())
}

#[test]
fn test_out_of_range_index_is_empty_not_error() {
    let doc = document(r#"{"xs":[1,2]}"#);
    for path in ["/xs[2]", "/xs[99]", "/xs/5", "/xs[-3]"] {
        let result = doc.query(path);
        assert!(result.is_empty(), "{}", path);
        assert!(result.error().is_none(), "{}", path);
        assert_eq!(result.as_int().unwrap_err().kind(), ErrorKind::NotFound);
    }
}

#[test]
fn test_slice_bounds() -> TestResult {
    let doc = document(r#"{"xs":[0,1,2,3,4]}"#);
    let cases = [
        ("/xs[1:3]", json!([1, 2])),
        ("/xs[:2]", json!([0, 1])),
        ("/xs[3:]", json!([3, 4])),
        ("/xs[:]", json!([0, 1, 2, 3, 4])),
        ("/xs[-2:]", json!([3, 4])),
        ("/xs[:-3]", json!([0, 1])),
        ("/xs[3:1]", json!([])),
        ("/xs[2:100]", json!([2, 3, 4])),
        ("/xs[-100:1]", json!([0])),
    ];
    for (path, expected) in cases {
        assert_eq!(doc.query(path).as_value()?, expected, "{}", path);
    }
    Ok(())
}

#[test]
fn test_recursive_descent_in_document_order() -> TestResult {
    let doc = Document::from_value(layered());
    let result = doc.query("//name");
    assert_eq!(result.values(), &[json!("one"), json!("three"), json!("five")]);
    assert_eq!(doc.query("..name").len(), 3);
    assert_eq!(doc.query("/x//name").values(), &[json!("three"), json!("five")]);
    Ok(())
}

#[test]
fn test_recursive_descent_finds_nothing() {
    let doc = Document::from_value(layered());
    let result = doc.query("//missing");
    assert!(result.is_empty());
    assert!(result.error().is_none());
}

#[test]
fn test_wildcards() -> TestResult {
    let doc = Document::from_value(store());
    assert_eq!(doc.query("/store/book/*").len(), 4);
    assert_eq!(doc.query("/store/book[*]/author").len(), 4);
    assert_eq!(
        doc.query("/store/bicycle/*").values(),
        &[json!("red"), json!(19.95)]
    );
    assert_eq!(doc.query("/store/*/color").as_str()?, "red");
    assert!(doc.query("/expensive/*").is_empty());
    Ok(())
}

#[test]
fn test_wildcard_then_index() -> TestResult {
    let doc = Document::from_value(store());
    assert_eq!(doc.query("/store/book/*/title[0]").len(), 0);
    assert_eq!(doc.query("/store/book[-1]/title").as_str()?, "The Lord");
    Ok(())
}

#[test]
fn test_parent_steps() -> TestResult {
    let doc = Document::from_value(store());
    assert_eq!(doc.query("/store/bicycle/color/..").as_value()?["price"], json!(19.95));
    assert_eq!(doc.query("/store/bicycle/color/../../expensive").len(), 0);
    assert_eq!(doc.query("/store/bicycle/../bicycle/color").as_str()?, "red");
    assert!(doc.query("/..").is_empty());
    Ok(())
}

#[test]
fn test_quoted_and_bracketed_names() -> TestResult {
    let doc = document(r#"{"a/b":{"c.d":{"e f":7}}}"#);
    assert_eq!(doc.query(r#"/"a/b"/"c.d"/"e f""#).as_int()?, 7);
    assert_eq!(doc.query("['a/b']['c.d']['e f']").as_int()?, 7);
    assert!(!doc.is_materialized());
    Ok(())
}

#[test]
fn test_dot_and_slash_forms_agree() -> TestResult {
    let doc = Document::from_value(store());
    let slash = doc.query("/store/book[2]/author").as_string()?;
    let dot = doc.query("$.store.book[2].author").as_string()?;
    assert_eq!(slash, "Melville");
    assert_eq!(slash, dot);
    Ok(())
}

#[test]
fn test_chained_queries() -> TestResult {
    let doc = Document::from_value(store());
    let books = doc.query("/store/book/*");
    assert_eq!(books.query("isbn").values(), &[json!("0-553"), json!("0-395")]);
    assert_eq!(books.query("/price").query("..").len(), 0);

    let broken = doc.query("/store[").query("/book");
    assert_eq!(broken.error().map(|e| e.kind()), Some(ErrorKind::InvalidQuerySyntax));
    Ok(())
}

#[test]
fn test_precompiled_query() -> TestResult {
    let doc = Document::from_value(store());
    let query: Query = "/store/bicycle/price".parse()?;
    assert_eq!(doc.query_compiled(&query).as_float()?, 19.95);
    Ok(())
}

#[test]
fn test_syntax_errors_report_position() {
    let doc = Document::from_value(store());
    for path in ["/a[", "/a[1:2:3]", "/a[?(@.x ==)]", "/a/[]", "/a[?(@.x == 1]"] {
        let err = doc.query(path).error().cloned();
        match err {
            Some(jsonxp::Error::InvalidQuerySyntax { path: p, .. }) => assert_eq!(p, path),
            other => panic!("{}: expected a syntax error, got {:?}", path, other),
        }
    }
}

#[test]
fn test_result_to_json() -> TestResult {
    let doc = Document::from_value(store());
    assert_eq!(doc.query("/store/bicycle/color").to_json()?, r#"["red"]"#);
    assert_eq!(doc.query("/nothing").to_json()?, "[]");
    Ok(())
}
