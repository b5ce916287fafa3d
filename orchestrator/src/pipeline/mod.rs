//! Pipeline Planner: materializes a task's step DAG and executes it,
//! either sequentially or with bounded parallelism across independent
//! steps.

mod builder;
mod executor;
mod policy;

pub use builder::create_pipeline as build_pipeline;
pub use policy::policy_for_task;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::collaborators::{BuildService, ContextBuilder, FormatterService, GuardrailService, RepairService, StaticAnalyzerService, TestService};
use crate::domain::{Pipeline, PipelineCounts, PipelinePolicy, StepStatus};

pub struct PipelinePlanner {
    build: Arc<dyn BuildService>,
    test: Arc<dyn TestService>,
    static_analyzer: Arc<dyn StaticAnalyzerService>,
    repair: Arc<dyn RepairService>,
    context_builder: Arc<dyn ContextBuilder>,
    guardrail: Arc<dyn GuardrailService>,
    formatter: Arc<dyn FormatterService>,
}

impl PipelinePlanner {
    pub fn new(
        build: Arc<dyn BuildService>,
        test: Arc<dyn TestService>,
        static_analyzer: Arc<dyn StaticAnalyzerService>,
        repair: Arc<dyn RepairService>,
        context_builder: Arc<dyn ContextBuilder>,
        guardrail: Arc<dyn GuardrailService>,
        formatter: Arc<dyn FormatterService>,
    ) -> Self {
        Self {
            build,
            test,
            static_analyzer,
            repair,
            context_builder,
            guardrail,
            formatter,
        }
    }

    /// Derive the task's policy from its id, then materialize the step DAG.
    pub fn create_pipeline(&self, task_id: &str) -> Pipeline {
        build_pipeline(task_id, policy_for_task(task_id))
    }

    /// Same as `create_pipeline` but with an explicit policy, used by the
    /// Supervisor's repair loop and by tests.
    pub fn create_pipeline_with_policy(&self, task_id: &str, policy: PipelinePolicy) -> Pipeline {
        build_pipeline(task_id, policy)
    }

    /// Run every step respecting `dependsOn` edges. Sequential mode runs
    /// steps in materialized order; parallel mode launches all steps
    /// whose dependencies are satisfied, bounded by a semaphore sized to
    /// the step count, repeating until the DAG drains.
    pub async fn execute_pipeline(&self, pipeline: &mut Pipeline, project_path: &str, languages: &[String]) {
        pipeline.mark_running();
        info!(task_id = %pipeline.task_id, parallel = pipeline.policy.parallel_steps, "executing pipeline");

        if pipeline.policy.parallel_steps {
            self.execute_parallel(pipeline, project_path, languages).await;
        } else {
            self.execute_sequential(pipeline, project_path, languages).await;
        }

        let counts = pipeline.counts();
        if counts.failed > 0 {
            let message = pipeline
                .first_failed_step()
                .and_then(|s| s.error.clone())
                .unwrap_or_else(|| "one or more steps failed".to_string());
            pipeline.mark_failed(message);
        } else {
            pipeline.mark_completed();
        }
    }

    async fn execute_sequential(&self, pipeline: &mut Pipeline, project_path: &str, languages: &[String]) {
        let task_id = pipeline.task_id.clone();
        for index in 0..pipeline.steps.len() {
            let step = pipeline.steps[index].clone();
            let result = executor::run_step(self, &task_id, project_path, languages, &step).await;
            self.apply_result(&mut pipeline.steps[index], result);
            if pipeline.steps[index].status == StepStatus::Failed && pipeline.policy.fail_fast {
                warn!(task_id = %pipeline.task_id, step = %pipeline.steps[index].id, "fail_fast: stopping pipeline");
                break;
            }
        }
    }

    async fn execute_parallel(&self, pipeline: &mut Pipeline, project_path: &str, languages: &[String]) {
        let task_id = pipeline.task_id.clone();
        let semaphore = Semaphore::new(pipeline.steps.len().max(1));
        let mut completed: HashSet<String> = HashSet::new();
        let mut failed = false;

        loop {
            let ready: Vec<usize> = pipeline
                .steps
                .iter()
                .enumerate()
                .filter(|(_, s)| s.status == StepStatus::Pending)
                .filter(|(_, s)| s.depends_on.iter().all(|dep| completed.contains(dep)))
                .map(|(i, _)| i)
                .collect();

            if ready.is_empty() {
                break;
            }
            if failed && pipeline.policy.fail_fast {
                break;
            }

            let batch = futures::future::join_all(ready.iter().map(|&index| {
                let step = pipeline.steps[index].clone();
                let semaphore = &semaphore;
                let task_id = &task_id;
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    (index, executor::run_step(self, task_id, project_path, languages, &step).await)
                }
            }))
            .await;

            for (index, result) in batch {
                let step_failed = !result.success;
                self.apply_result(&mut pipeline.steps[index], result);
                if step_failed {
                    failed = true;
                } else {
                    completed.insert(pipeline.steps[index].id.clone());
                }
            }
        }
    }

    fn apply_result(&self, step: &mut crate::domain::PipelineStep, result: crate::domain::StepResult) {
        step.mark_running();
        if result.success {
            step.mark_completed(result);
        } else {
            let message = result.message.clone();
            step.result = Some(result);
            step.mark_failed(message);
        }
    }

    pub fn pipeline_status(&self, pipeline: &Pipeline) -> PipelineCounts {
        pipeline.counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::build::mock::MockBuildService;
    use crate::collaborators::context::mock::MockContextBuilder;
    use crate::collaborators::formatter::mock::MockFormatterService;
    use crate::collaborators::guardrail::mock::MockGuardrailService;
    use crate::collaborators::repair::mock::MockRepairService;
    use crate::collaborators::static_analyzer::mock::MockStaticAnalyzerService;
    use crate::collaborators::test_service::mock::MockTestService;
    use crate::collaborators::ContextPack;

    fn planner(build_ok: bool, test_ok: bool) -> PipelinePlanner {
        PipelinePlanner::new(
            Arc::new(MockBuildService::new(build_ok)),
            Arc::new(MockTestService::new(test_ok)),
            Arc::new(MockStaticAnalyzerService::default()),
            Arc::new(MockRepairService::new(true)),
            Arc::new(MockContextBuilder::new(ContextPack::default())),
            Arc::new(MockGuardrailService::new(true)),
            Arc::new(MockFormatterService::new(true)),
        )
    }

    #[tokio::test]
    async fn sequential_pipeline_completes_when_all_steps_pass() {
        let planner = planner(true, true);
        let mut pipeline = planner.create_pipeline_with_policy("t1", PipelinePolicy::tests_only());
        planner.execute_pipeline(&mut pipeline, "/tmp", &["go".to_string()]).await;
        assert_eq!(pipeline.status, crate::domain::PipelineStatus::Completed);
        assert_eq!(pipeline.counts().completed, 2);
    }

    #[tokio::test]
    async fn fail_fast_stops_after_first_failure() {
        let planner = planner(false, true);
        let mut pipeline = planner.create_pipeline_with_policy("t1", PipelinePolicy::tests_only());
        planner.execute_pipeline(&mut pipeline, "/tmp", &["go".to_string()]).await;
        assert_eq!(pipeline.status, crate::domain::PipelineStatus::Failed);
        assert_eq!(pipeline.counts().pending, 1, "test step should not have run");
    }

    #[tokio::test]
    async fn parallel_mode_runs_independent_steps_to_completion() {
        let planner = planner(true, true);
        let mut pipeline = planner.create_pipeline_with_policy(
            "t1",
            PipelinePolicy {
                parallel_steps: true,
                ..PipelinePolicy::default()
            },
        );
        planner.execute_pipeline(&mut pipeline, "/tmp", &["go".to_string()]).await;
        assert_eq!(pipeline.status, crate::domain::PipelineStatus::Completed);
        assert_eq!(pipeline.counts().completed, 8);
    }
}
