//! Top-level error type carrying the orchestrator's error-kind taxonomy.

use thiserror::Error;

/// Errors that cross a public API boundary (Taskflow Service, Supervisor,
/// Protocol Executor, Pipeline Planner). Internal plumbing uses
/// `eyre::Result` and gets wrapped into `Internal` at the boundary.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid task state: expected {expected}, task {task_id} is {actual}")]
    InvalidTaskState {
        task_id: String,
        expected: String,
        actual: String,
    },

    #[error("cyclic dependency detected: {0}")]
    CyclicDependency(String),

    #[error("stage {stage} failed: {message}")]
    StageFailure { stage: String, message: String },

    #[error("step {step_id} failed: {message}")]
    StepFailure { step_id: String, message: String },

    #[error("{what} timed out after {0:?}", .duration)]
    Timeout { what: String, duration: std::time::Duration },

    #[error("internal error: {0}")]
    Internal(#[from] eyre::Error),
}

impl OrchestratorError {
    /// Machine-readable kind, as surfaced in reports and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::TaskNotFound(_) => "taskNotFound",
            Self::InvalidTaskState { .. } => "invalidTaskState",
            Self::CyclicDependency(_) => "cyclicDependency",
            Self::StageFailure { .. } => "stageFailure",
            Self::StepFailure { .. } => "stepFailure",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    pub fn invalid_state(task_id: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidTaskState {
            task_id: task_id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping() {
        assert_eq!(OrchestratorError::Validation("x".into()).kind(), "validation");
        assert_eq!(OrchestratorError::TaskNotFound("x".into()).kind(), "taskNotFound");
        assert_eq!(
            OrchestratorError::invalid_state("t1", "todo", "done").kind(),
            "invalidTaskState"
        );
    }
}
