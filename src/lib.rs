//! reclite - an embedded, in-process record store
//!
//! Untyped field/value records held in memory, addressable by a stable
//! integer identifier, queryable by equality and comparison filters,
//! optionally accelerated by per-field indices, and durable via
//! full-snapshot persistence.
//!
//! ```
//! use reclite::filter::field;
//! use reclite::store::{Schema, Store};
//! use serde_json::json;
//!
//! let mut db = Store::in_memory(Schema::from_names(["name", "age", "size"]).unwrap());
//! db.insert(&[("name", json!("homer")), ("age", json!(23)), ("size", json!(1.84))]).unwrap();
//!
//! db.create_index(&["age"]).unwrap();
//! let records = db.select(&[("age", json!(23))]).unwrap();
//! assert_eq!(records[0].get("name"), Some(json!("homer")));
//!
//! let adults = db.query(&(field("age").gte(json!(18)) & field("size").lt(json!(2.0))));
//! assert_eq!(adults.len(), 1);
//! ```

pub mod filter;
pub mod index;
pub mod snapshot;
pub mod store;
