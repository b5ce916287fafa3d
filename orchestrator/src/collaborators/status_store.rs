//! Status Store collaborator (`TaskflowRepository` in spec terms).
//!
//! Durable `taskId -> TaskState` mapping. The default implementation is
//! backed by `taskstore::Store` over `TaskStatus` records; this trait lets
//! the Taskflow Service depend on the contract rather than the concrete
//! store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use taskstore::{IndexValue, Record, Store};

use crate::domain::TaskState;

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn load_statuses(&self) -> Result<HashMap<String, TaskState>>;
    async fn save_statuses(&self, statuses: HashMap<String, TaskState>) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskflowState {
    task_id: String,
    state: TaskState,
    updated_at: i64,
}

impl Record for TaskflowState {
    fn id(&self) -> &str {
        &self.task_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "taskflow_state"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), IndexValue::String(self.state.to_string()));
        fields
    }
}

/// Backed by [`taskstore::Store`], one record per task id. `Store` is a
/// synchronous, file-locking store, so every call is dispatched through
/// `spawn_blocking` to avoid stalling the async runtime.
pub struct DefaultStatusStore {
    store: Arc<Store>,
}

impl DefaultStatusStore {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusStore for DefaultStatusStore {
    async fn load_statuses(&self) -> Result<HashMap<String, TaskState>> {
        let store = self.store.clone();
        let records = tokio::task::spawn_blocking(move || store.list::<TaskflowState>()).await??;
        Ok(records.into_iter().map(|r| (r.task_id, r.state)).collect())
    }

    async fn save_statuses(&self, statuses: HashMap<String, TaskState>) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || -> Result<(), taskstore::StoreError> {
            for (task_id, state) in statuses {
                store.put(&TaskflowState {
                    task_id,
                    state,
                    updated_at: taskstore::now_ms(),
                })?;
            }
            Ok(())
        })
        .await??;
        Ok(())
    }
}
