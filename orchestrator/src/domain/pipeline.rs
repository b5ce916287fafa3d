//! Pipeline / step DAG types for the Pipeline Planner.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskstore::now_ms;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepType {
    Retrieve,
    AstSynth,
    Compile,
    Test,
    Static,
    Format,
    Validate,
    Repair,
}

impl std::fmt::Display for PipelineStepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Retrieve => "retrieve",
            Self::AstSynth => "ast_synth",
            Self::Compile => "compile",
            Self::Test => "test",
            Self::Static => "static",
            Self::Format => "format",
            Self::Validate => "validate",
            Self::Repair => "repair",
        };
        write!(f, "{s}")
    }
}

/// The canonical materialization order used by `CreatePipeline`.
pub const CANONICAL_STEP_ORDER: [PipelineStepType; 8] = [
    PipelineStepType::Retrieve,
    PipelineStepType::AstSynth,
    PipelineStepType::Compile,
    PipelineStepType::Test,
    PipelineStepType::Static,
    PipelineStepType::Format,
    PipelineStepType::Validate,
    PipelineStepType::Repair,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// Result payload of one successfully- or unsuccessfully-run step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
}

/// One node of a pipeline's step DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: PipelineStepType,
    pub status: StepStatus,
    pub priority: u32,
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub duration_ms: i64,
    pub error: Option<String>,
    pub result: Option<StepResult>,
}

impl PipelineStep {
    pub fn new(id: impl Into<String>, step_type: PipelineStepType, priority: u32, depends_on: Vec<String>) -> Self {
        let id = id.into();
        Self {
            name: step_type.to_string(),
            id,
            step_type,
            status: StepStatus::Pending,
            priority,
            depends_on,
            config: HashMap::new(),
            started_at: None,
            completed_at: None,
            duration_ms: 0,
            error: None,
            result: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(now_ms());
    }

    pub fn mark_completed(&mut self, result: StepResult) {
        let now = now_ms();
        self.status = StepStatus::Completed;
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = now - started_at;
        }
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let now = now_ms();
        self.status = StepStatus::Failed;
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = now - started_at;
        }
        self.error = Some(error.into());
    }

    /// Reset to `pending`, dropping timing/result, but keeping id, type,
    /// config, dependsOn, and priority — the shape needed by
    /// `Pipeline::clone_fresh`.
    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.started_at = None;
        self.completed_at = None;
        self.duration_ms = 0;
        self.error = None;
        self.result = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// Feature flags and retry/timeout knobs controlling how a pipeline is
/// materialized and executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PipelinePolicy {
    pub enable_retrieve: bool,
    pub enable_ast_synth: bool,
    pub enable_compile: bool,
    pub enable_test: bool,
    pub enable_static: bool,
    pub enable_repair: bool,
    pub enable_format: bool,
    pub enable_validate: bool,
    pub fail_fast: bool,
    pub retry_failed: bool,
    pub max_retries: u32,
    pub parallel_steps: bool,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            enable_retrieve: true,
            enable_ast_synth: true,
            enable_compile: true,
            enable_test: true,
            enable_static: true,
            enable_repair: true,
            enable_format: true,
            enable_validate: true,
            fail_fast: true,
            retry_failed: true,
            max_retries: 3,
            parallel_steps: false,
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl PipelinePolicy {
    /// Tests-only policy: only `compile` and `test` steps.
    pub fn tests_only() -> Self {
        Self {
            enable_retrieve: false,
            enable_ast_synth: false,
            enable_compile: true,
            enable_test: true,
            enable_static: false,
            enable_repair: false,
            enable_format: false,
            enable_validate: false,
            ..Self::default()
        }
    }

    /// Static-analysis-only policy.
    pub fn static_only() -> Self {
        Self {
            enable_retrieve: false,
            enable_ast_synth: false,
            enable_compile: false,
            enable_test: false,
            enable_static: true,
            enable_repair: false,
            enable_format: false,
            enable_validate: false,
            ..Self::default()
        }
    }

    /// Is this step type enabled under this policy?
    pub fn enables(&self, step_type: PipelineStepType) -> bool {
        match step_type {
            PipelineStepType::Retrieve => self.enable_retrieve,
            PipelineStepType::AstSynth => self.enable_ast_synth,
            PipelineStepType::Compile => self.enable_compile,
            PipelineStepType::Test => self.enable_test,
            PipelineStepType::Static => self.enable_static,
            PipelineStepType::Format => self.enable_format,
            PipelineStepType::Validate => self.enable_validate,
            PipelineStepType::Repair => self.enable_repair,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// A materialized step DAG for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub task_id: String,
    pub steps: Vec<PipelineStep>,
    pub status: PipelineStatus,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub duration_ms: i64,
    pub error: Option<String>,
    pub policy: PipelinePolicy,
}

impl Pipeline {
    pub fn new(task_id: impl Into<String>, steps: Vec<PipelineStep>, policy: PipelinePolicy) -> Self {
        Self {
            task_id: task_id.into(),
            steps,
            status: PipelineStatus::Pending,
            created_at: now_ms(),
            started_at: None,
            completed_at: None,
            duration_ms: 0,
            error: None,
            policy,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = PipelineStatus::Running;
        self.started_at = Some(now_ms());
    }

    pub fn mark_completed(&mut self) {
        let now = now_ms();
        self.status = PipelineStatus::Completed;
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = now - started_at;
        }
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let now = now_ms();
        self.status = PipelineStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = now - started_at;
        }
    }

    /// Deep copy with every step status reset to `pending`, used between
    /// the Supervisor's repair-loop iterations.
    pub fn clone_fresh(&self) -> Self {
        debug!(task_id = %self.task_id, "Pipeline::clone_fresh");
        let mut steps = self.steps.clone();
        for step in &mut steps {
            step.reset();
        }
        Self {
            task_id: self.task_id.clone(),
            steps,
            status: PipelineStatus::Pending,
            created_at: now_ms(),
            started_at: None,
            completed_at: None,
            duration_ms: 0,
            error: None,
            policy: self.policy,
        }
    }

    pub fn find_step(&self, id: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn find_step_mut(&mut self, id: &str) -> Option<&mut PipelineStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// First step (in listed order) currently in `failed` status.
    pub fn first_failed_step(&self) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    pub fn counts(&self) -> PipelineCounts {
        let mut counts = PipelineCounts::default();
        for step in &self.steps {
            match step.status {
                StepStatus::Pending => counts.pending += 1,
                StepStatus::Running => counts.running += 1,
                StepStatus::Completed => counts.completed += 1,
                StepStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl PipelineCounts {
    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.failed
    }

    pub fn progress(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.completed as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_preserves_identity_fields() {
        let mut step = PipelineStep::new("t-step-1", PipelineStepType::Compile, 1, vec![]);
        step.mark_running();
        step.mark_failed("boom");
        assert_eq!(step.status, StepStatus::Failed);
        step.reset();
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.id, "t-step-1");
        assert_eq!(step.step_type, PipelineStepType::Compile);
        assert!(step.error.is_none());
    }

    #[test]
    fn clone_fresh_resets_all_steps() {
        let mut step = PipelineStep::new("t-step-1", PipelineStepType::Compile, 1, vec![]);
        step.mark_completed(StepResult {
            success: true,
            message: "ok".into(),
        });
        let pipeline = Pipeline::new("t1", vec![step], PipelinePolicy::default());
        let fresh = pipeline.clone_fresh();
        assert_eq!(fresh.steps[0].status, StepStatus::Pending);
        assert_eq!(fresh.status, PipelineStatus::Pending);
    }

    #[test]
    fn counts_and_progress() {
        let mut a = PipelineStep::new("a", PipelineStepType::Compile, 1, vec![]);
        a.mark_completed(StepResult {
            success: true,
            message: "ok".into(),
        });
        let b = PipelineStep::new("b", PipelineStepType::Test, 2, vec!["a".into()]);
        let pipeline = Pipeline::new("t1", vec![a, b], PipelinePolicy::default());
        let counts = pipeline.counts();
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.progress(), 0.5);
    }

    #[test]
    fn tests_only_policy_disables_everything_else() {
        let policy = PipelinePolicy::tests_only();
        assert!(policy.enables(PipelineStepType::Compile));
        assert!(policy.enables(PipelineStepType::Test));
        assert!(!policy.enables(PipelineStepType::Static));
        assert!(!policy.enables(PipelineStepType::Repair));
    }
}
