#![allow(dead_code)]

pub mod fixtures;

use jsonxp::Document;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parse a fixture into a fresh, raw document.
pub fn document(source: &str) -> Document {
    init_logging();
    jsonxp::parse(source).expect("fixture is valid JSON")
}
