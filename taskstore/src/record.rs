//! The `Record` trait implemented by every persisted type.

use std::collections::HashMap;

/// A value usable in an index lookup or range filter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

/// A type that can be stored in a [`crate::Store`].
///
/// Implementors are plain data: the store never calls back into
/// application logic, it only reads `id`/`updated_at`/`indexed_fields`
/// for bookkeeping and serializes the whole value with `serde_json`.
pub trait Record: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync {
    /// Stable unique identifier within this record's collection.
    fn id(&self) -> &str;

    /// Last-modified timestamp (Unix millis), used to resolve write races
    /// in favor of the most recently updated copy.
    fn updated_at(&self) -> i64;

    /// Name of the collection file on disk (e.g. `"task_status"`).
    fn collection_name() -> &'static str;

    /// Fields to maintain in the sidecar index for this record.
    fn indexed_fields(&self) -> HashMap<String, IndexValue>;
}
