//! Task Protocol Executor: runs the four verification stages with a
//! bounded self-correction loop between retries.

mod stages;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::collaborators::{BuildService, FormatterService, GuardrailService, StaticAnalyzerService, TestService};
use crate::correction;
use crate::domain::{ProtocolStage, ProtocolStageResult, TaskProtocolConfig, TaskProtocolResult};
use crate::error_analyzer;
use crate::events::EventEmitter;
use crate::reports::ReportWriter;

/// Executes `TaskProtocolConfig.enabled_stages` in order, serialized by an
/// internal lock so only one protocol run can be in flight at a time
/// (matches the spec's "single RwLock held for the entire call").
pub struct ProtocolExecutor {
    build: Arc<dyn BuildService>,
    test: Arc<dyn TestService>,
    static_analyzer: Arc<dyn StaticAnalyzerService>,
    guardrail: Arc<dyn GuardrailService>,
    formatter: Arc<dyn FormatterService>,
    events: EventEmitter,
    lock: RwLock<()>,
}

impl ProtocolExecutor {
    pub fn new(
        build: Arc<dyn BuildService>,
        test: Arc<dyn TestService>,
        static_analyzer: Arc<dyn StaticAnalyzerService>,
        guardrail: Arc<dyn GuardrailService>,
        formatter: Arc<dyn FormatterService>,
        events: EventEmitter,
    ) -> Self {
        Self {
            build,
            test,
            static_analyzer,
            guardrail,
            formatter,
            events,
            lock: RwLock::new(()),
        }
    }

    /// Run every enabled stage, in order, stopping early if `fail_fast` is
    /// set and a stage fails. Overall success is the conjunction over
    /// critical stages only (building, testing).
    pub async fn execute_protocol(&self, task_id: &str, config: &TaskProtocolConfig) -> TaskProtocolResult {
        let _guard = self.lock.write().await;

        let started_at = taskstore::now_ms();
        let mut result = TaskProtocolResult::new(task_id, started_at);
        info!(task_id, "starting task protocol");

        for &stage in &config.enabled_stages {
            let (stage_result, cycles) = self.execute_stage_with_retry(task_id, stage, config).await;
            let stage_failed = !stage_result.success;
            result.correction_cycles += cycles;
            result.stages.push(stage_result);

            if stage_failed && config.fail_fast {
                result.final_error = format!("Stage {stage} failed: {}", result.stages.last().unwrap().error_details.as_ref().map(|e| e.message.clone()).unwrap_or_default());
                warn!(task_id, %stage, "fail_fast: stopping protocol run");
                break;
            }
        }

        result.recompute_success();
        result.completed_at = Some(taskstore::now_ms());
        if !result.success && result.final_error.is_empty() {
            result.final_error = "one or more critical stages failed".to_string();
        }
        if !result.success {
            self.events.task_failed(task_id, result.final_error.clone());
        }

        let writer = ReportWriter::new(&config.project_path);
        if let Err(err) = writer.write_protocol_report(task_id, &result).await {
            warn!(task_id, %err, "failed to write protocol report");
        }

        result
    }

    /// Run `stage` up to `max_retries + 1` times. Between attempts, if
    /// self-correction is enabled, the analyzer proposes corrections and
    /// the correction engine applies them before the next attempt; an
    /// applied correction consumes a retry slot rather than adding one.
    /// Returns the stage result plus the number of correction cycles to
    /// credit to the enclosing `TaskProtocolResult` — one per aggregate
    /// `CorrectionResult` that reported `success=true`.
    async fn execute_stage_with_retry(
        &self,
        task_id: &str,
        stage: ProtocolStage,
        config: &TaskProtocolConfig,
    ) -> (ProtocolStageResult, u32) {
        let max_attempts = config.max_retries + 1;
        let start = Instant::now();
        let mut attempts = 0;
        let mut last_error = None;
        let mut correction_steps = Vec::new();
        let mut correction_cycles = 0;

        loop {
            attempts += 1;
            let outcome = stages::run_stage(self, task_id, stage, config).await;

            match outcome {
                Ok(()) => {
                    return (
                        ProtocolStageResult {
                            stage,
                            success: true,
                            attempts,
                            duration_ms: start.elapsed().as_millis() as i64,
                            error_details: None,
                            correction_steps,
                        },
                        correction_cycles,
                    );
                }
                Err(message) => {
                    let details = error_analyzer::analyze(stage, &message);
                    last_error = Some(details.clone());

                    if attempts >= max_attempts {
                        return (
                            ProtocolStageResult {
                                stage,
                                success: false,
                                attempts,
                                duration_ms: start.elapsed().as_millis() as i64,
                                error_details: last_error,
                                correction_steps,
                            },
                            correction_cycles,
                        );
                    }

                    if !config.self_correction.enabled {
                        continue;
                    }

                    let proposed = error_analyzer::suggest_corrections(&details);
                    if proposed.is_empty() {
                        continue;
                    }

                    let (applied_steps, aggregate) =
                        correction::apply_corrections(&config.project_path, proposed, self.formatter.as_ref()).await;
                    if aggregate.success {
                        correction_cycles += 1;
                    }
                    for file in aggregate.files_changed() {
                        info!(task_id, %stage, file, "correction applied");
                    }
                    correction_steps.extend(applied_steps);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        build::mock::MockBuildService, formatter::mock::MockFormatterService, guardrail::mock::MockGuardrailService,
        static_analyzer::mock::MockStaticAnalyzerService, test_service::mock::MockTestService,
    };
    use crate::domain::TaskProtocolConfig;
    use crate::events::EventBus;

    fn executor(build_ok: bool, test_ok: bool) -> ProtocolExecutor {
        let bus = EventBus::new(16);
        ProtocolExecutor::new(
            Arc::new(MockBuildService::new(build_ok)),
            Arc::new(MockTestService::new(test_ok)),
            Arc::new(MockStaticAnalyzerService::default()),
            Arc::new(MockGuardrailService::new(true)),
            Arc::new(MockFormatterService::new(true)),
            bus.emitter(),
        )
    }

    #[tokio::test]
    async fn succeeds_when_critical_stages_pass() {
        let executor = executor(true, true);
        let dir = tempfile::tempdir().unwrap();
        let config = TaskProtocolConfig::new(
            dir.path().to_str().unwrap(),
            vec!["go".into()],
            vec![ProtocolStage::Building, ProtocolStage::Testing],
        );
        let result = executor.execute_protocol("t1", &config).await;
        assert!(result.success);
        assert_eq!(result.stages.len(), 2);
    }

    #[tokio::test]
    async fn non_critical_failure_does_not_fail_overall_result() {
        let bus = EventBus::new(16);
        let executor = ProtocolExecutor::new(
            Arc::new(MockBuildService::new(true)),
            Arc::new(MockTestService::new(true)),
            Arc::new(MockStaticAnalyzerService::with_report(crate::collaborators::StaticAnalysisReport {
                issues: vec![crate::collaborators::AnalysisIssue {
                    severity: crate::collaborators::IssueSeverity::Error,
                    file: "main.go".into(),
                    message: "unused import".into(),
                }],
            })),
            Arc::new(MockGuardrailService::new(true)),
            Arc::new(MockFormatterService::new(true)),
            bus.emitter(),
        );
        let dir = tempfile::tempdir().unwrap();
        let mut config = TaskProtocolConfig::new(
            dir.path().to_str().unwrap(),
            vec!["go".into()],
            vec![ProtocolStage::Linting, ProtocolStage::Building],
        );
        config.max_retries = 0;
        let result = executor.execute_protocol("t1", &config).await;
        assert!(result.success, "linting is not critical");
        assert!(!result.stages[0].success);
    }

    #[tokio::test]
    async fn critical_failure_exhausts_retries_and_reports_failure() {
        let executor = executor(false, true);
        let dir = tempfile::tempdir().unwrap();
        let mut config = TaskProtocolConfig::new(dir.path().to_str().unwrap(), vec!["go".into()], vec![ProtocolStage::Building]);
        config.max_retries = 1;
        config.self_correction.enabled = false;
        let result = executor.execute_protocol("t1", &config).await;
        assert!(!result.success);
        assert_eq!(result.stages[0].attempts, 2);
    }

    /// S3 from the scenario suite: self-correction recovers a failing
    /// stage within its retry budget.
    #[tokio::test]
    async fn self_correction_recovers_and_counts_one_cycle() {
        use crate::collaborators::{BuildResult, ProjectBuildReport};
        use std::sync::atomic::{AtomicU32, Ordering};

        struct FailOnceThenSucceed(AtomicU32);

        #[async_trait::async_trait]
        impl BuildService for FailOnceThenSucceed {
            async fn build(&self, _project_path: &str, language: &str) -> eyre::Result<BuildResult> {
                let call = self.0.fetch_add(1, Ordering::SeqCst);
                let success = call > 0;
                Ok(BuildResult {
                    language: language.to_string(),
                    success,
                    output: if success { "ok".into() } else { "compile error at main.go:10:2: undefined foo".into() },
                })
            }
            async fn validate_project(&self, project_path: &str, languages: &[String]) -> eyre::Result<ProjectBuildReport> {
                let mut per_language = Vec::new();
                let mut success = true;
                for lang in languages {
                    let result = self.build(project_path, lang).await?;
                    success &= result.success;
                    per_language.push(result);
                }
                Ok(ProjectBuildReport { success, per_language })
            }
            async fn get_supported_languages(&self) -> eyre::Result<Vec<String>> {
                Ok(vec!["go".into()])
            }
            async fn detect_languages(&self, _project_path: &str) -> eyre::Result<Vec<String>> {
                Ok(vec!["go".into()])
            }
        }

        let bus = EventBus::new(16);
        let executor = ProtocolExecutor::new(
            Arc::new(FailOnceThenSucceed(AtomicU32::new(0))),
            Arc::new(crate::collaborators::test_service::mock::MockTestService::new(true)),
            Arc::new(crate::collaborators::static_analyzer::mock::MockStaticAnalyzerService::default()),
            Arc::new(crate::collaborators::guardrail::mock::MockGuardrailService::new(true)),
            Arc::new(MockFormatterService::new(true)),
            bus.emitter(),
        );
        let dir = tempfile::tempdir().unwrap();
        let mut config = TaskProtocolConfig::new(dir.path().to_str().unwrap(), vec!["go".into()], vec![ProtocolStage::Building]);
        config.max_retries = 2;
        config.self_correction.enabled = true;

        let result = executor.execute_protocol("t1", &config).await;
        assert!(result.success);
        assert!(result.stages[0].success);
        assert_eq!(result.stages[0].attempts, 2);
        assert!(result.correction_cycles >= 1);
    }

    #[tokio::test]
    async fn fail_fast_stops_remaining_stages() {
        let executor = executor(false, true);
        let dir = tempfile::tempdir().unwrap();
        let mut config = TaskProtocolConfig::new(
            dir.path().to_str().unwrap(),
            vec!["go".into()],
            vec![ProtocolStage::Building, ProtocolStage::Testing],
        );
        config.fail_fast = true;
        config.max_retries = 0;
        config.self_correction.enabled = false;
        let result = executor.execute_protocol("t1", &config).await;
        assert_eq!(result.stages.len(), 1, "testing stage should not have run");
    }
}
