//! Task, TaskState and TaskStatus domain types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskstore::{IndexValue, Record, now_ms};
use tracing::debug;

/// Per-task change budgets enforced by the Taskflow Service after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Budgets {
    pub max_files: u32,
    pub max_changed_lines: u32,
}

/// Lifecycle state of a task.
///
/// `done` and `failed` are terminal. `blocked` is a pause state reachable
/// only from and to `todo` via pause/resume; execution transitions
/// `todo -> done | failed` directly. `done` is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Todo,
    Done,
    Failed,
    Blocked,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl TaskState {
    /// Terminal states cannot transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// A task loaded from a plan (or minted by the Autonomous Supervisor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Ordered set of task ids this task depends on.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub step_file: Option<String>,
    #[serde(default)]
    pub budgets: Budgets,
    pub status: TaskState,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: id.into(),
            name: name.into(),
            depends_on: Vec::new(),
            step_file: None,
            budgets: Budgets::default(),
            status: TaskState::Todo,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_step_file(mut self, step_file: impl Into<String>) -> Self {
        self.step_file = Some(step_file.into());
        self
    }

    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// Task type hint read from `metadata["type"]`, used by the Taskflow
    /// Service to decide whether to enable ephemeral guardrail mode.
    pub fn task_type(&self) -> Option<&str> {
        self.metadata.get("type").and_then(|v| v.as_str())
    }

    pub fn set_status(&mut self, status: TaskState) {
        debug!(task_id = %self.id, ?status, "Task::set_status");
        self.status = status;
        self.updated_at = now_ms();
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "tasks"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        fields
    }
}

/// Point-in-time progress/result snapshot for one task, the unit persisted
/// by the Status Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub message: String,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Milliseconds; `completed_at - started_at` once both are set.
    pub duration_ms: i64,
    pub error: Option<String>,
    pub updated_at: i64,
}

impl TaskStatus {
    pub fn new(task_id: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            task_id: task_id.into(),
            state: TaskState::Todo,
            progress: 0.0,
            message: String::new(),
            started_at: None,
            completed_at: None,
            duration_ms: 0,
            error: None,
            updated_at: now,
        }
    }

    pub fn start(&mut self) {
        let now = now_ms();
        self.state = TaskState::Todo;
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Set progress and message, recomputing duration if already started.
    pub fn update(&mut self, progress: f64, message: impl Into<String>) {
        self.progress = progress.clamp(0.0, 1.0);
        self.message = message.into();
        self.updated_at = now_ms();
        if let Some(started_at) = self.started_at {
            self.duration_ms = self.updated_at - started_at;
        }
    }

    /// Transition to a terminal state, stamping `completed_at`/`duration_ms`.
    pub fn finish(&mut self, state: TaskState, message: impl Into<String>, error: Option<String>) {
        debug_assert!(state.is_terminal(), "finish() requires a terminal state");
        let now = now_ms();
        self.state = state;
        self.progress = 1.0;
        self.message = message.into();
        self.error = error;
        self.completed_at = Some(now);
        self.updated_at = now;
        if let Some(started_at) = self.started_at {
            self.duration_ms = now - started_at;
        }
    }
}

impl Record for TaskStatus {
    fn id(&self) -> &str {
        &self.task_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "task_status"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), IndexValue::String(self.state.to_string()));
        fields
    }
}
