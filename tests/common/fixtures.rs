use serde_json::{Value, json};

/// The small document used throughout the end-to-end tests.
pub const NESTED: &str = r#"{"a":{"b":[1,2,3]}}"#;

/// A bookstore with mixed types and optional fields.
pub fn store() -> Value {
    json!({
        "store": {
            "book": [
                { "category": "reference", "author": "Rees", "title": "Sayings", "price": 8.95 },
                { "category": "fiction", "author": "Waugh", "title": "Sword", "price": 12.99 },
                { "category": "fiction", "author": "Melville", "title": "Moby Dick", "isbn": "0-553", "price": 8.99 },
                { "category": "fiction", "author": "Tolkien", "title": "The Lord", "isbn": "0-395", "price": 22.99 }
            ],
            "bicycle": { "color": "red", "price": 19.95 }
        },
        "expensive": 10
    })
}

/// Five records straddling `price == 10` with mixed stock flags.
pub fn inventory() -> Value {
    json!({
        "items": [
            { "sku": "a", "price": 5, "inStock": true },
            { "sku": "b", "price": 9.99, "inStock": false },
            { "sku": "c", "price": 10, "inStock": true },
            { "sku": "d", "price": 3, "inStock": "true" },
            { "sku": "e", "price": 12, "inStock": true }
        ]
    })
}

/// `name` present at depths 1, 3 and 5.
pub fn layered() -> Value {
    json!({
        "name": "one",
        "x": {
            "y": {
                "name": "three",
                "z": {
                    "w": { "name": "five" }
                }
            }
        }
    })
}
