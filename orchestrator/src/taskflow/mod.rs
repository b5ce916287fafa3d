//! Taskflow Service: the top-level facade. Loads a plan, exposes
//! start/list/ready-task queries, and drives each ready task's pipeline
//! through the Planner while enforcing dependency order and per-task
//! guardrail budgets.

mod plan;
mod validate;

pub use plan::{PlanFile, PlanTaskEntry};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::collaborators::{BuildService, GitRepository, GuardrailService, StatusStore};
use crate::domain::{Task, TaskProtocolResult, TaskState};
use crate::error::OrchestratorError;
use crate::events::EventEmitter;
use crate::pipeline::PipelinePlanner;
use crate::reports::ReportWriter;

const EPHEMERAL_GUARDRAIL_VALIDITY: Duration = Duration::from_secs(5 * 60);
const EPHEMERAL_TASK_TYPES: [&str; 2] = ["scaffold", "deps_fix"];

/// Owns the in-memory task table exclusively; the Supervisor and Protocol
/// Executor only ever mutate status through this service.
pub struct TaskflowService {
    tasks: RwLock<HashMap<String, Task>>,
    status_store: Arc<dyn StatusStore>,
    guardrail: Arc<dyn GuardrailService>,
    git: Arc<dyn GitRepository>,
    build: Arc<dyn BuildService>,
    planner: Arc<PipelinePlanner>,
    events: EventEmitter,
}

impl TaskflowService {
    pub fn new(
        status_store: Arc<dyn StatusStore>,
        guardrail: Arc<dyn GuardrailService>,
        git: Arc<dyn GitRepository>,
        build: Arc<dyn BuildService>,
        planner: Arc<PipelinePlanner>,
        events: EventEmitter,
    ) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            status_store,
            guardrail,
            git,
            build,
            planner,
            events,
        }
    }

    /// Loads `plan_path`, overlaying current Status Store state onto each
    /// task's initial status hint.
    pub async fn load_plan(&self, plan_path: &Path) -> Result<(), OrchestratorError> {
        let statuses = self
            .status_store
            .load_statuses()
            .await
            .map_err(OrchestratorError::Internal)?;
        let loaded = plan::load_tasks(plan_path, &statuses)
            .await
            .map_err(OrchestratorError::Internal)?;

        let mut tasks = self.tasks.write().await;
        for task in loaded {
            tasks.insert(task.id.clone(), task);
        }
        info!(count = tasks.len(), "taskflow loaded plan");
        Ok(())
    }

    /// DFS cycle check over `dependsOn` plus `stepFile` existence checks.
    /// Returns the first error found.
    pub async fn validate_taskflow(&self, project_path: &str) -> Result<(), OrchestratorError> {
        let tasks = self.tasks.read().await;
        validate::validate(&tasks, project_path)
    }

    /// Tasks in state `todo` whose every dependency is `done`.
    pub async fn get_ready_tasks(&self) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        tasks
            .values()
            .filter(|t| t.status == TaskState::Todo)
            .filter(|t| t.depends_on.iter().all(|dep| tasks.get(dep).map(|d| d.status == TaskState::Done).unwrap_or(false)))
            .cloned()
            .collect()
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Repeatedly executes every ready task until none remain.
    pub async fn execute_taskflow(&self, project_path: &str) -> Result<(), OrchestratorError> {
        loop {
            let ready = self.get_ready_tasks().await;
            if ready.is_empty() {
                break;
            }
            for task in ready {
                if let Err(err) = self.execute_task(&task.id, project_path).await {
                    warn!(task_id = %task.id, %err, "task execution failed");
                }
            }
        }
        Ok(())
    }

    /// Checks dependencies, optionally enables ephemeral guardrail mode,
    /// validates guardrails, builds and executes a pipeline via the
    /// Planner, and persists the resulting state.
    pub async fn execute_task(&self, task_id: &str, project_path: &str) -> Result<(), OrchestratorError> {
        let task = {
            let tasks = self.tasks.read().await;
            tasks
                .get(task_id)
                .cloned()
                .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?
        };

        {
            let tasks = self.tasks.read().await;
            let deps_satisfied = task
                .depends_on
                .iter()
                .all(|dep| tasks.get(dep).map(|d| d.status == TaskState::Done).unwrap_or(false));
            if !deps_satisfied {
                return Err(OrchestratorError::invalid_state(task_id, "dependencies done", "pending"));
            }
        }

        let ephemeral = task.task_type().map(|t| EPHEMERAL_TASK_TYPES.contains(&t)).unwrap_or(false);
        if ephemeral {
            let task_type = task.task_type().unwrap_or_default();
            self.guardrail
                .enable_ephemeral_mode(task_id, task_type, EPHEMERAL_GUARDRAIL_VALIDITY)
                .await
                .map_err(OrchestratorError::Internal)?;
        }

        let files = self.git.get_uncommitted_files(project_path).await.unwrap_or_default();
        let validation = self
            .guardrail
            .validate_task(task_id, &files, 0)
            .await
            .map_err(OrchestratorError::Internal)?;

        if ephemeral {
            self.guardrail.disable_ephemeral_mode().await.map_err(OrchestratorError::Internal)?;
        }

        if !validation.valid {
            let message = validation.error.unwrap_or_else(|| "guardrail validation failed".to_string());
            self.set_task_status(task_id, TaskState::Failed).await;
            self.events.task_failed(task_id, message.clone());
            return Err(OrchestratorError::Validation(message));
        }

        let languages = self.build.detect_languages(project_path).await.map_err(OrchestratorError::Internal)?;
        let mut pipeline = self.planner.create_pipeline(task_id);
        self.planner.execute_pipeline(&mut pipeline, project_path, &languages).await;

        let final_state = if pipeline.status == crate::domain::PipelineStatus::Completed {
            TaskState::Done
        } else {
            TaskState::Failed
        };
        self.set_task_status(task_id, final_state).await;

        let verification = TaskProtocolResult {
            task_id: task_id.to_string(),
            started_at: pipeline.started_at.unwrap_or(pipeline.created_at),
            completed_at: pipeline.completed_at,
            success: final_state == TaskState::Done,
            stages: Vec::new(),
            correction_cycles: 0,
            final_error: pipeline.error.clone().unwrap_or_default(),
        };
        if let Err(err) = ReportWriter::new(project_path).write_verification_report(&verification).await {
            warn!(task_id, %err, "failed to write verification report");
        }

        if final_state == TaskState::Failed {
            let message = pipeline.error.clone().unwrap_or_else(|| "pipeline failed".to_string());
            self.events.task_failed(task_id, message.clone());
            return Err(OrchestratorError::StepFailure {
                step_id: task_id.to_string(),
                message,
            });
        }
        Ok(())
    }

    async fn set_task_status(&self, task_id: &str, state: TaskState) {
        {
            let mut tasks = self.tasks.write().await;
            if let Some(task) = tasks.get_mut(task_id) {
                task.set_status(state);
            }
        }
        let snapshot: HashMap<String, TaskState> = self
            .tasks
            .read()
            .await
            .iter()
            .map(|(id, t)| (id.clone(), t.status))
            .collect();
        if let Err(err) = self.status_store.save_statuses(snapshot).await {
            warn!(%err, "failed to persist task statuses");
        }
    }
}
