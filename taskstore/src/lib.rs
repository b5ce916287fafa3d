//! taskstore - generic persistent record store
//!
//! Provides a small single-writer, file-backed store for typed records.
//! Each record type gets its own JSONL collection file plus a sidecar
//! index file for equality/range queries over a handful of indexed
//! fields. There is no query planner and no SQL: the store exists to give
//! callers durable key-value-with-a-few-indexes persistence on local
//! disk, not a database.
//!
//! # Example
//!
//! ```ignore
//! use taskstore::{Record, Store, IndexValue};
//! use std::collections::HashMap;
//!
//! #[derive(serde::Serialize, serde::Deserialize, Clone)]
//! struct Widget { id: String, updated_at: i64, color: String }
//!
//! impl Record for Widget {
//!     fn id(&self) -> &str { &self.id }
//!     fn updated_at(&self) -> i64 { self.updated_at }
//!     fn collection_name() -> &'static str { "widgets" }
//!     fn indexed_fields(&self) -> HashMap<String, IndexValue> {
//!         let mut m = HashMap::new();
//!         m.insert("color".to_string(), IndexValue::String(self.color.clone()));
//!         m
//!     }
//! }
//!
//! let store = Store::open("/tmp/mystore")?;
//! store.put(&Widget { id: "w1".into(), updated_at: taskstore::now_ms(), color: "red".into() })?;
//! # Ok::<(), eyre::Error>(())
//! ```

mod error;
mod query;
mod record;
mod store;
mod time;

pub use error::StoreError;
pub use query::{Filter, FilterOp};
pub use record::{IndexValue, Record};
pub use store::Store;
pub use time::now_ms;
