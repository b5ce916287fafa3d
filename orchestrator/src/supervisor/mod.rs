//! Autonomous Supervisor: end-to-end drive of a user-submitted task
//! through context building, policy selection, a bounded repair loop,
//! and finalization — under panic isolation.

mod types;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub use types::{AutonomousTaskRequest, AutonomousTaskResponse};

use crate::collaborators::{ContextBuilder, GitRepository, LlmRouter, StatusStore};
use crate::domain::{Pipeline, PipelinePolicy, PipelineStatus, PipelineStep, PipelineStepType, SlaPolicy, Task, TaskState, TaskStatus};
use crate::error::OrchestratorError;
use crate::events::EventEmitter;
use crate::pipeline::PipelinePlanner;

const MAX_REPAIR_ITERATIONS: u32 = 3;
const CONTEXT_BUILD_TIMEOUT: Duration = Duration::from_secs(120);

/// Drives one autonomous task at a time. `statuses` is this supervisor's
/// in-memory view; every mutation is mirrored to the `StatusStore`
/// collaborator, which owns durable `taskId -> TaskState` persistence.
pub struct AutonomousSupervisor {
    status_store: Arc<dyn StatusStore>,
    context_builder: Arc<dyn ContextBuilder>,
    llm_router: Arc<dyn LlmRouter>,
    git: Arc<dyn GitRepository>,
    planner: Arc<PipelinePlanner>,
    events: EventEmitter,
    statuses: RwLock<HashMap<String, TaskStatus>>,
}

impl AutonomousSupervisor {
    pub fn new(
        status_store: Arc<dyn StatusStore>,
        context_builder: Arc<dyn ContextBuilder>,
        llm_router: Arc<dyn LlmRouter>,
        git: Arc<dyn GitRepository>,
        planner: Arc<PipelinePlanner>,
        events: EventEmitter,
    ) -> Self {
        Self {
            status_store,
            context_builder,
            llm_router,
            git,
            planner,
            events,
            statuses: RwLock::new(HashMap::new()),
        }
    }

    fn validate_request(request: &AutonomousTaskRequest) -> Result<SlaPolicy, OrchestratorError> {
        if request.task.trim().is_empty() {
            return Err(OrchestratorError::Validation("task must not be empty".to_string()));
        }
        if request.project_path.trim().is_empty() {
            return Err(OrchestratorError::Validation("projectPath must not be empty".to_string()));
        }
        request
            .sla_policy
            .parse::<SlaPolicy>()
            .map_err(OrchestratorError::Validation)
    }

    async fn has_running_tasks(&self) -> bool {
        self.statuses.read().await.values().any(|s| !s.state.is_terminal())
    }

    async fn persist(&self, status: TaskStatus) {
        let task_id = status.task_id.clone();
        self.statuses.write().await.insert(task_id, status);
        let snapshot: HashMap<String, TaskState> = self
            .statuses
            .read()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), s.state))
            .collect();
        if let Err(err) = self.status_store.save_statuses(snapshot).await {
            error!(%err, "failed to persist task statuses");
        }
    }

    /// Admission: validate, enforce one-running-task, mint an id, persist
    /// `todo`, and launch execution in the background under panic
    /// isolation. Returns immediately with `status=accepted`.
    pub async fn submit_autonomous_task(
        self: &Arc<Self>,
        request: AutonomousTaskRequest,
    ) -> Result<AutonomousTaskResponse, OrchestratorError> {
        let sla_policy = Self::validate_request(&request)?;

        if self.has_running_tasks().await {
            return Err(OrchestratorError::invalid_state("new", "no_running_tasks", "running_task_exists"));
        }

        let task_id = format!("autonomous_{}", taskstore::now_ms() / 1000);
        self.persist(TaskStatus::new(task_id.clone())).await;

        let supervisor = Arc::clone(self);
        let spawned_id = task_id.clone();
        let handle = tokio::spawn(async move {
            supervisor.run_execution(spawned_id, request.task, request.project_path, sla_policy).await;
        });

        let supervisor = Arc::clone(self);
        let reaper_id = task_id.clone();
        tokio::spawn(async move {
            if let Err(join_err) = handle.await {
                error!(task_id = %reaper_id, error = %join_err, "autonomous task coroutine panicked");
                let mut status = TaskStatus::new(reaper_id.clone());
                status.start();
                status.finish(TaskState::Failed, format!("Internal error: {join_err}"), Some("internal".to_string()));
                supervisor.persist(status).await;
                supervisor.events.task_failed(reaper_id, format!("Internal error: {join_err}"));
            }
        });

        Ok(AutonomousTaskResponse {
            task_id,
            status: "accepted".to_string(),
        })
    }

    async fn run_execution(self: Arc<Self>, task_id: String, task_description: String, project_path: String, sla_policy: SlaPolicy) {
        let mut status = TaskStatus::new(task_id.clone());
        status.start();
        status.update(0.0, "planning");
        self.persist(status.clone()).await;

        // 1. Plan
        self.events.context_generation_started(&task_id);
        let context_pack = match tokio::time::timeout(
            CONTEXT_BUILD_TIMEOUT,
            self.context_builder.build_context(&task_description, &project_path),
        )
        .await
        {
            Ok(Ok(pack)) => {
                self.events.context_generation_generated(&task_id);
                pack
            }
            Ok(Err(err)) => {
                warn!(task_id = %task_id, %err, "context build failed, proceeding with empty context");
                self.events.context_generation_failed(&task_id, err.to_string());
                Default::default()
            }
            Err(_) => {
                warn!(task_id = %task_id, "context build timed out, proceeding with empty context");
                self.events.context_generation_timeout(&task_id);
                Default::default()
            }
        };

        let task = Task::new(task_id.clone(), task_description.clone());
        let policy = match self.llm_router.create_pipeline_with_llm(&task, &context_pack).await {
            Ok(outcome) if !outcome.fallback_used => outcome.policy,
            Ok(outcome) => outcome.policy,
            Err(err) => {
                info!(task_id = %task_id, %err, "llm router unavailable, using heuristic policy");
                sla_policy.heuristic_policy()
            }
        };

        let base_pipeline = self.planner.create_pipeline_with_policy(&task_id, policy);
        status.update(0.2, "running");
        status.state = TaskState::Todo;
        self.persist(status.clone()).await;

        // 2. Execute with bounded repair loop
        let languages = vec!["go".to_string()];
        let mut final_pipeline = base_pipeline.clone_fresh();
        let mut succeeded = false;

        for iteration in 1..=MAX_REPAIR_ITERATIONS {
            let mut attempt = base_pipeline.clone_fresh();
            self.planner.execute_pipeline(&mut attempt, &project_path, &languages).await;

            if attempt.status == PipelineStatus::Completed {
                final_pipeline = attempt;
                succeeded = true;
                break;
            }

            let Some(failed_step) = attempt.first_failed_step() else {
                final_pipeline = attempt;
                break;
            };
            let error_output = failed_step.error.clone().unwrap_or_default();
            info!(task_id = %task_id, iteration, step = %failed_step.id, "main pipeline failed, running repair sub-pipeline");

            let mut repair_pipeline = repair_sub_pipeline(&task_id, &project_path, &error_output);
            self.planner.execute_pipeline(&mut repair_pipeline, &project_path, &languages).await;

            final_pipeline = attempt;
            if repair_pipeline.status != PipelineStatus::Completed {
                warn!(task_id = %task_id, iteration, "repair sub-pipeline did not complete, giving up");
                break;
            }
        }

        // 3. Finalize
        let diff = match self.git.generate_diff(&project_path).await {
            Ok(diff) => Some(diff),
            Err(err) => {
                warn!(task_id = %task_id, %err, "diff generation failed (non-fatal)");
                None
            }
        };
        if let Some(diff) = &diff {
            info!(task_id = %task_id, bytes = diff.len(), "collected diff for observability");
        }

        if succeeded {
            status.finish(TaskState::Done, "completed", None);
        } else {
            let message = final_pipeline.error.clone().unwrap_or_else(|| "pipeline did not complete".to_string());
            status.finish(TaskState::Failed, message.clone(), Some(message));
            self.events.task_failed(task_id.clone(), status.message.clone());
        }
        self.persist(status).await;
    }

    /// `PauseTask`: `todo -> blocked`. Any other source state is rejected.
    pub async fn pause_task(&self, task_id: &str) -> Result<(), OrchestratorError> {
        self.transition(task_id, TaskState::Todo, TaskState::Blocked).await
    }

    /// `ResumeTask`: `blocked -> todo`. Any other source state is rejected.
    pub async fn resume_task(&self, task_id: &str) -> Result<(), OrchestratorError> {
        self.transition(task_id, TaskState::Blocked, TaskState::Todo).await
    }

    /// Transitions a non-terminal task to `failed`. Does not interrupt an
    /// in-flight step; its result is discarded at finalize.
    pub async fn cancel_task(&self, task_id: &str) -> Result<(), OrchestratorError> {
        let mut statuses = self.statuses.write().await;
        let status = statuses.get_mut(task_id).ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        if status.state.is_terminal() {
            return Err(OrchestratorError::invalid_state(task_id, "non-terminal", status.state.to_string()));
        }
        status.finish(TaskState::Failed, "Task cancelled by user", None);
        let snapshot: HashMap<String, TaskState> = statuses.iter().map(|(id, s)| (id.clone(), s.state)).collect();
        drop(statuses);
        if let Err(err) = self.status_store.save_statuses(snapshot).await {
            error!(%err, "failed to persist task statuses");
        }
        Ok(())
    }

    async fn transition(&self, task_id: &str, from: TaskState, to: TaskState) -> Result<(), OrchestratorError> {
        let mut statuses = self.statuses.write().await;
        let status = statuses.get_mut(task_id).ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        if status.state != from {
            return Err(OrchestratorError::invalid_state(task_id, from.to_string(), status.state.to_string()));
        }
        status.state = to;
        status.updated_at = taskstore::now_ms();
        let snapshot: HashMap<String, TaskState> = statuses.iter().map(|(id, s)| (id.clone(), s.state)).collect();
        drop(statuses);
        if let Err(err) = self.status_store.save_statuses(snapshot).await {
            error!(%err, "failed to persist task statuses");
        }
        Ok(())
    }

    pub async fn task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.statuses.read().await.get(task_id).cloned()
    }

    /// `updateAutonomousTaskStatus`: maps a string status to `TaskState`
    /// (`completed -> done`, `failed -> failed`, else `todo`), stores
    /// `progress/100`, stamps `updatedAt`.
    pub async fn update_autonomous_task_status(&self, task_id: &str, status: &str, message: &str, progress: f64) {
        let state = match status {
            "completed" => TaskState::Done,
            "failed" => TaskState::Failed,
            _ => TaskState::Todo,
        };
        let mut statuses = self.statuses.write().await;
        let entry = statuses.entry(task_id.to_string()).or_insert_with(|| TaskStatus::new(task_id));
        entry.state = state;
        entry.update(progress / 100.0, message);
    }
}

fn repair_sub_pipeline(task_id: &str, project_path: &str, error_output: &str) -> Pipeline {
    let mut step = PipelineStep::new(format!("{task_id}-repair-1"), PipelineStepType::Repair, 1, vec![]);
    step.config.insert("task_id".to_string(), json!(task_id));
    step.config.insert("project_path".to_string(), json!(project_path));
    step.config.insert("error_output".to_string(), json!(error_output));
    step.config.insert("strategies".to_string(), json!(["auto_fix"]));
    step.config.insert("max_attempts".to_string(), json!(1));

    let policy = PipelinePolicy {
        enable_retrieve: false,
        enable_ast_synth: false,
        enable_compile: false,
        enable_test: false,
        enable_static: false,
        enable_repair: true,
        enable_format: false,
        enable_validate: false,
        fail_fast: true,
        retry_failed: false,
        max_retries: 0,
        parallel_steps: false,
        timeout: Duration::from_secs(5 * 60),
    };

    Pipeline::new(task_id, vec![step], policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::build::mock::MockBuildService;
    use crate::collaborators::context::mock::MockContextBuilder;
    use crate::collaborators::formatter::mock::MockFormatterService;
    use crate::collaborators::git::mock::MockGitRepository;
    use crate::collaborators::guardrail::mock::MockGuardrailService;
    use crate::collaborators::repair::mock::MockRepairService;
    use crate::collaborators::router::mock::MockLlmRouter;
    use crate::collaborators::static_analyzer::mock::MockStaticAnalyzerService;
    use crate::collaborators::status_store::mock::MockStatusStore;
    use crate::collaborators::test_service::mock::MockTestService;
    use crate::events::EventBus;

    fn supervisor(build_ok: bool, test_ok: bool) -> Arc<AutonomousSupervisor> {
        let bus = EventBus::new(16);
        let planner = Arc::new(PipelinePlanner::new(
            Arc::new(MockBuildService::new(build_ok)),
            Arc::new(MockTestService::new(test_ok)),
            Arc::new(MockStaticAnalyzerService::default()),
            Arc::new(MockRepairService::new(true)),
            Arc::new(MockContextBuilder::new(Default::default())),
            Arc::new(MockGuardrailService::new(true)),
            Arc::new(MockFormatterService::new(true)),
        ));
        Arc::new(AutonomousSupervisor::new(
            Arc::new(MockStatusStore::default()),
            Arc::new(MockContextBuilder::new(Default::default())),
            Arc::new(MockLlmRouter::succeeding(PipelinePolicy::tests_only())),
            Arc::new(MockGitRepository::new("diff --git a b")),
            planner,
            bus.emitter(),
        ))
    }

    #[tokio::test]
    async fn rejects_empty_task() {
        let supervisor = supervisor(true, true);
        let request = AutonomousTaskRequest {
            task: "".to_string(),
            project_path: "/p".to_string(),
            sla_policy: "standard".to_string(),
        };
        let err = supervisor.submit_autonomous_task(request).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn rejects_unknown_sla_policy() {
        let supervisor = supervisor(true, true);
        let request = AutonomousTaskRequest {
            task: "fix auth".to_string(),
            project_path: "/p".to_string(),
            sla_policy: "bogus".to_string(),
        };
        assert!(supervisor.submit_autonomous_task(request).await.is_err());
    }

    #[tokio::test]
    async fn second_running_task_is_rejected() {
        let supervisor = supervisor(true, true);
        let request = AutonomousTaskRequest {
            task: "fix auth".to_string(),
            project_path: "/p".to_string(),
            sla_policy: "standard".to_string(),
        };
        supervisor.submit_autonomous_task(request.clone()).await.unwrap();
        let err = supervisor.submit_autonomous_task(request).await.unwrap_err();
        assert_eq!(err.kind(), "invalidTaskState");
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips() {
        let supervisor = supervisor(true, true);
        supervisor.persist(TaskStatus::new("t1")).await;
        supervisor.pause_task("t1").await.unwrap();
        assert_eq!(supervisor.task_status("t1").await.unwrap().state, TaskState::Blocked);
        assert!(supervisor.pause_task("t1").await.is_err());
        supervisor.resume_task("t1").await.unwrap();
        assert_eq!(supervisor.task_status("t1").await.unwrap().state, TaskState::Todo);
        assert!(supervisor.resume_task("t1").await.is_err());
    }

    #[tokio::test]
    async fn cancel_transitions_non_terminal_task_to_failed() {
        let supervisor = supervisor(true, true);
        supervisor.persist(TaskStatus::new("t1")).await;
        supervisor.cancel_task("t1").await.unwrap();
        let status = supervisor.task_status("t1").await.unwrap();
        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.message, "Task cancelled by user");
    }

    #[tokio::test]
    async fn successful_submission_eventually_completes() {
        let supervisor = supervisor(true, true);
        let request = AutonomousTaskRequest {
            task: "fix auth".to_string(),
            project_path: "/p".to_string(),
            sla_policy: "standard".to_string(),
        };
        let response = supervisor.submit_autonomous_task(request).await.unwrap();
        assert_eq!(response.status, "accepted");

        for _ in 0..50 {
            if let Some(status) = supervisor.task_status(&response.task_id).await {
                if status.state.is_terminal() {
                    assert_eq!(status.state, TaskState::Done);
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("task did not reach a terminal state in time");
    }

    #[tokio::test]
    async fn context_build_emits_started_and_generated() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let planner = Arc::new(PipelinePlanner::new(
            Arc::new(MockBuildService::new(true)),
            Arc::new(MockTestService::new(true)),
            Arc::new(MockStaticAnalyzerService::default()),
            Arc::new(MockRepairService::new(true)),
            Arc::new(MockContextBuilder::new(Default::default())),
            Arc::new(MockGuardrailService::new(true)),
            Arc::new(MockFormatterService::new(true)),
        ));
        let supervisor = Arc::new(AutonomousSupervisor::new(
            Arc::new(MockStatusStore::default()),
            Arc::new(MockContextBuilder::new(Default::default())),
            Arc::new(MockLlmRouter::succeeding(PipelinePolicy::tests_only())),
            Arc::new(MockGitRepository::new("diff --git a b")),
            planner,
            bus.emitter(),
        ));

        supervisor
            .submit_autonomous_task(AutonomousTaskRequest {
                task: "fix auth".to_string(),
                project_path: "/p".to_string(),
                sla_policy: "standard".to_string(),
            })
            .await
            .unwrap();

        let mut saw_started = false;
        let mut saw_generated = false;
        for _ in 0..10 {
            match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
                Ok(Ok(crate::events::Event::ShotgunContextGenerationStarted { .. })) => saw_started = true,
                Ok(Ok(crate::events::Event::ShotgunContextGenerationGenerated { .. })) => saw_generated = true,
                Ok(Ok(_)) => {}
                _ => break,
            }
            if saw_started && saw_generated {
                break;
            }
        }
        assert!(saw_started, "expected a context-generation-started event");
        assert!(saw_generated, "expected a context-generation-generated event");
    }

    #[tokio::test]
    async fn repair_loop_gives_up_after_max_iterations() {
        // The test step always fails and the repair service is a no-op,
        // so every iteration fails the same way; the loop still has to
        // terminate at MAX_REPAIR_ITERATIONS rather than spin forever.
        let supervisor = supervisor(true, false);
        let request = AutonomousTaskRequest {
            task: "fix auth".to_string(),
            project_path: "/p".to_string(),
            sla_policy: "standard".to_string(),
        };
        let response = supervisor.submit_autonomous_task(request).await.unwrap();

        for _ in 0..50 {
            if let Some(status) = supervisor.task_status(&response.task_id).await {
                if status.state.is_terminal() {
                    assert_eq!(status.state, TaskState::Failed);
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("task did not reach a terminal state in time");
    }
}
