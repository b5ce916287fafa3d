//! JSONL-backed single-writer record store.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::query::Filter;
use crate::record::{IndexValue, Record};

/// In-memory view of one collection, lazily populated from disk.
#[derive(Default)]
struct CollectionCache {
    /// id -> raw JSON value for the full record
    records: HashMap<String, serde_json::Value>,
    /// id -> indexed fields, kept in lockstep with `records`
    indexes: HashMap<String, HashMap<String, IndexValue>>,
    loaded: bool,
}

/// A generic, file-backed record store.
///
/// One `Store` can hold many record types; each gets its own JSONL file
/// under `base_path` named after `Record::collection_name()`. Writes are
/// serialized per-collection via an advisory file lock (`fs2`) so that a
/// single writer invariant holds even across processes, matching the
/// spec's "single writer, read by queries" requirement for status
/// persistence.
pub struct Store {
    base_path: PathBuf,
    cache: Mutex<HashMap<&'static str, CollectionCache>>,
}

impl Store {
    /// Open (creating if necessary) a store rooted at `base_path`.
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| StoreError::Io {
            path: base_path.display().to_string(),
            source: e,
        })?;
        debug!(path = %base_path.display(), "Store::open");
        Ok(Self {
            base_path,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{name}.jsonl"))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{name}.lock"))
    }

    /// Acquire the exclusive lock for a collection, held for the duration
    /// of one mutation (load-modify-rewrite).
    fn lock_collection(&self, name: &str) -> Result<File, StoreError> {
        let lock_path = self.lock_path(name);
        let file = File::create(&lock_path).map_err(|e| StoreError::Io {
            path: lock_path.display().to_string(),
            source: e,
        })?;
        file.lock_exclusive()
            .map_err(|_| StoreError::Locked(lock_path.display().to_string()))?;
        Ok(file)
    }

    /// Load a collection's JSONL file into the cache if not already loaded.
    fn ensure_loaded<T: Record>(&self, cache: &mut HashMap<&'static str, CollectionCache>) -> Result<(), StoreError> {
        let name = T::collection_name();
        if cache.get(name).map(|c| c.loaded).unwrap_or(false) {
            return Ok(());
        }

        let path = self.collection_path(name);
        let mut entry = CollectionCache::default();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let value: serde_json::Value = serde_json::from_str(line)?;
                let record: T = serde_json::from_value(value.clone())?;
                let id = record.id().to_string();
                entry.indexes.insert(id.clone(), record.indexed_fields());
                entry.records.insert(id, value);
            }
        }

        entry.loaded = true;
        trace!(collection = name, count = entry.records.len(), "Store::ensure_loaded");
        cache.insert(name, entry);
        Ok(())
    }

    /// Persist the in-memory cache for one collection back to disk,
    /// writing to a temp file and renaming into place so readers never
    /// observe a partial write.
    fn flush_collection(&self, name: &str, entry: &CollectionCache) -> Result<(), StoreError> {
        let path = self.collection_path(name);
        let tmp_path = path.with_extension("jsonl.tmp");

        let mut ids: Vec<&String> = entry.records.keys().collect();
        ids.sort();

        let mut buf = String::new();
        for id in ids {
            let value = &entry.records[id];
            buf.push_str(&serde_json::to_string(value)?);
            buf.push('\n');
        }

        fs::write(&tmp_path, buf).map_err(|e| StoreError::Io {
            path: tmp_path.display().to_string(),
            source: e,
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Insert or update a record.
    ///
    /// If a record with the same id already exists with a newer
    /// `updated_at`, the write is ignored (last-writer-by-timestamp wins)
    /// rather than silently clobbering a racing writer's newer state.
    pub fn put<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        let name = T::collection_name();
        let _lock = self.lock_collection(name)?;
        let mut cache = self.cache.lock().expect("store cache mutex poisoned");
        self.ensure_loaded::<T>(&mut cache)?;
        let entry = cache.get_mut(name).expect("just loaded");

        let id = record.id().to_string();
        if let Some(existing) = entry.records.get(&id) {
            let existing_updated_at = existing.get("updated_at").and_then(|v| v.as_i64()).unwrap_or(i64::MIN);
            if existing_updated_at > record.updated_at() {
                debug!(collection = name, %id, "Store::put: ignoring stale write");
                return Ok(());
            }
        }

        let value = serde_json::to_value(record)?;
        entry.indexes.insert(id.clone(), record.indexed_fields());
        entry.records.insert(id, value);

        self.flush_collection(name, entry)
    }

    /// Fetch one record by id.
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>, StoreError> {
        let name = T::collection_name();
        let mut cache = self.cache.lock().expect("store cache mutex poisoned");
        self.ensure_loaded::<T>(&mut cache)?;
        let entry = cache.get(name).expect("just loaded");
        match entry.records.get(id) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Delete a record by id. Returns whether it existed.
    pub fn delete<T: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let name = T::collection_name();
        let _lock = self.lock_collection(name)?;
        let mut cache = self.cache.lock().expect("store cache mutex poisoned");
        self.ensure_loaded::<T>(&mut cache)?;
        let entry = cache.get_mut(name).expect("just loaded");

        let existed = entry.records.remove(id).is_some();
        entry.indexes.remove(id);
        if existed {
            self.flush_collection(name, entry)?;
        }
        Ok(existed)
    }

    /// List every record in a collection.
    pub fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let name = T::collection_name();
        let mut cache = self.cache.lock().expect("store cache mutex poisoned");
        self.ensure_loaded::<T>(&mut cache)?;
        let entry = cache.get(name).expect("just loaded");
        let mut out = Vec::with_capacity(entry.records.len());
        for value in entry.records.values() {
            out.push(serde_json::from_value(value.clone())?);
        }
        Ok(out)
    }

    /// List records matching every filter (conjunction).
    pub fn query<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>, StoreError> {
        let name = T::collection_name();
        let mut cache = self.cache.lock().expect("store cache mutex poisoned");
        self.ensure_loaded::<T>(&mut cache)?;
        let entry = cache.get(name).expect("just loaded");

        let mut out = Vec::new();
        for (id, value) in &entry.records {
            let fields = entry.indexes.get(id).cloned().unwrap_or_default();
            if filters.iter().all(|f| f.matches(&fields)) {
                out.push(serde_json::from_value(value.clone())?);
            }
        }
        Ok(out)
    }

    /// Force a reload of a collection's index from disk, returning the
    /// number of records indexed. Used after an external process may have
    /// written to the collection file directly.
    pub fn rebuild_indexes<T: Record>(&self) -> Result<usize, StoreError> {
        let name = T::collection_name();
        let mut cache = self.cache.lock().expect("store cache mutex poisoned");
        cache.remove(name);
        self.ensure_loaded::<T>(&mut cache)?;
        let entry = cache.get(name).expect("just loaded");
        Ok(entry.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Widget {
        id: String,
        updated_at: i64,
        color: String,
    }

    impl Record for Widget {
        fn id(&self) -> &str {
            &self.id
        }
        fn updated_at(&self) -> i64 {
            self.updated_at
        }
        fn collection_name() -> &'static str {
            "widgets"
        }
        fn indexed_fields(&self) -> StdHashMap<String, IndexValue> {
            let mut m = StdHashMap::new();
            m.insert("color".to_string(), IndexValue::String(self.color.clone()));
            m
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let w = Widget {
            id: "w1".into(),
            updated_at: 10,
            color: "red".into(),
        };
        store.put(&w).unwrap();
        let fetched: Widget = store.get("w1").unwrap().unwrap();
        assert_eq!(fetched, w);
    }

    #[test]
    fn stale_write_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .put(&Widget {
                id: "w1".into(),
                updated_at: 100,
                color: "red".into(),
            })
            .unwrap();
        store
            .put(&Widget {
                id: "w1".into(),
                updated_at: 50,
                color: "blue".into(),
            })
            .unwrap();
        let fetched: Widget = store.get("w1").unwrap().unwrap();
        assert_eq!(fetched.color, "red");
    }

    #[test]
    fn delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .put(&Widget {
                id: "w1".into(),
                updated_at: 1,
                color: "red".into(),
            })
            .unwrap();
        assert!(store.delete::<Widget>("w1").unwrap());
        assert!(store.get::<Widget>("w1").unwrap().is_none());
        assert!(!store.delete::<Widget>("w1").unwrap());
    }

    #[test]
    fn query_filters_by_indexed_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .put(&Widget {
                id: "w1".into(),
                updated_at: 1,
                color: "red".into(),
            })
            .unwrap();
        store
            .put(&Widget {
                id: "w2".into(),
                updated_at: 1,
                color: "blue".into(),
            })
            .unwrap();

        let reds: Vec<Widget> = store
            .query(&[Filter::eq("color", IndexValue::String("red".into()))])
            .unwrap();
        assert_eq!(reds.len(), 1);
        assert_eq!(reds[0].id, "w1");
    }

    #[test]
    fn persists_across_store_handles() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            store
                .put(&Widget {
                    id: "w1".into(),
                    updated_at: 1,
                    color: "green".into(),
                })
                .unwrap();
        }
        let store2 = Store::open(dir.path()).unwrap();
        let fetched: Widget = store2.get("w1").unwrap().unwrap();
        assert_eq!(fetched.color, "green");
    }

    #[test]
    fn rebuild_indexes_reports_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .put(&Widget {
                id: "w1".into(),
                updated_at: 1,
                color: "red".into(),
            })
            .unwrap();
        store
            .put(&Widget {
                id: "w2".into(),
                updated_at: 1,
                color: "blue".into(),
            })
            .unwrap();
        let count = store.rebuild_indexes::<Widget>().unwrap();
        assert_eq!(count, 2);
    }
}
