mod common;

use common::fixtures::store;
use common::{TestResult, document};
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;

const READERS: usize = 8;

#[test]
fn test_concurrent_direct_queries_stay_raw() {
    let doc = Arc::new(document(&store().to_string()));
    let handles: Vec<_> = (0..READERS)
        .map(|i| {
            let doc = Arc::clone(&doc);
            thread::spawn(move || {
                let index = i % 4;
                for _ in 0..100 {
                    let path = format!("/store/book[{}]/price", index);
                    assert!(doc.query(&path).as_float().is_ok());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("reader panicked");
    }
    assert!(!doc.is_materialized());
}

#[test]
fn test_racing_materialization_decodes_once() {
    let doc = Arc::new(document(&store().to_string()));
    let barrier = Arc::new(Barrier::new(READERS));
    let handles: Vec<_> = (0..READERS)
        .map(|i| {
            let doc = Arc::clone(&doc);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let result = if i % 2 == 0 {
                    doc.query("//price")
                } else {
                    doc.query("/store/book[0]/price")
                };
                assert!(result.error().is_none());
                result.len()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let len = handle.join().expect("reader panicked");
        let expected = if i % 2 == 0 { 5 } else { 1 };
        assert_eq!(len, expected);
    }
    assert!(doc.is_materialized());
}

#[test]
fn test_readers_never_see_partial_mutations() -> TestResult {
    let doc = Arc::new(document(r#"{"pair":{"left":0,"right":0}}"#));
    let writer = {
        let doc = Arc::clone(&doc);
        thread::spawn(move || {
            for n in 1..=200 {
                doc.set("/pair", json!({ "left": n, "right": n }))
                    .expect("set succeeds");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let doc = Arc::clone(&doc);
            thread::spawn(move || {
                for _ in 0..200 {
                    let pair = doc.query("/pair").must_value();
                    assert_eq!(pair["left"], pair["right"]);
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert_eq!(doc.query("/pair/left").as_int()?, 200);
    Ok(())
}

#[test]
fn test_concurrent_writers_to_distinct_keys() -> TestResult {
    let doc = Arc::new(document("{}"));
    let handles: Vec<_> = (0..READERS)
        .map(|i| {
            let doc = Arc::clone(&doc);
            thread::spawn(move || {
                for j in 0..25 {
                    doc.set(&format!("/w{}/k{}", i, j), j).expect("set succeeds");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer panicked");
    }

    for i in 0..READERS {
        let keys = doc.query(&format!("/w{}/*", i));
        assert_eq!(keys.len(), 25);
    }
    assert_eq!(doc.query("/w3/k24").as_int()?, 24);
    Ok(())
}

#[test]
fn test_shared_cache_across_threads() {
    let doc = Arc::new(document(&store().to_string()));
    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let doc = Arc::clone(&doc);
            thread::spawn(move || doc.query("/store/book[?(@.price > 10)]/title").len())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("reader panicked"), 2);
    }
    assert!(doc.options().cache().len() >= 1);
}
