//! Protocol stage and result types for the Task Protocol Executor.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error_kind::{CorrectionStep, ErrorDetails};

/// One of the four fixed verification stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStage {
    Linting,
    Building,
    Testing,
    Guardrails,
}

impl ProtocolStage {
    /// Critical stages determine overall `TaskProtocolResult.success`.
    pub fn is_critical(self) -> bool {
        matches!(self, Self::Building | Self::Testing)
    }
}

impl std::fmt::Display for ProtocolStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linting => write!(f, "linting"),
            Self::Building => write!(f, "building"),
            Self::Testing => write!(f, "testing"),
            Self::Guardrails => write!(f, "guardrails"),
        }
    }
}

/// Outcome of running one stage, including retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolStageResult {
    pub stage: ProtocolStage,
    pub success: bool,
    /// Includes the initial try; always >= 1.
    pub attempts: u32,
    pub duration_ms: i64,
    pub error_details: Option<ErrorDetails>,
    pub correction_steps: Vec<CorrectionStep>,
}

/// Outcome of a full protocol run over `enabledStages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProtocolResult {
    pub task_id: String,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub success: bool,
    pub stages: Vec<ProtocolStageResult>,
    pub correction_cycles: u32,
    pub final_error: String,
}

impl TaskProtocolResult {
    pub fn new(task_id: impl Into<String>, started_at: i64) -> Self {
        Self {
            task_id: task_id.into(),
            started_at,
            completed_at: None,
            success: false,
            stages: Vec::new(),
            correction_cycles: 0,
            final_error: String::new(),
        }
    }

    /// Conjunction of success over critical stages only, per the data
    /// model's contract for `TaskProtocolResult.success`.
    pub fn recompute_success(&mut self) {
        self.success = self
            .stages
            .iter()
            .filter(|s| s.stage.is_critical())
            .all(|s| s.success);
    }
}

/// Self-correction knobs for a protocol run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelfCorrectionConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub ai_assistance: bool,
}

impl Default for SelfCorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            ai_assistance: false,
        }
    }
}

/// Read-only configuration for one `ExecuteProtocol` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProtocolConfig {
    pub project_path: String,
    pub languages: Vec<String>,
    pub enabled_stages: Vec<ProtocolStage>,
    pub max_retries: u32,
    pub fail_fast: bool,
    pub self_correction: SelfCorrectionConfig,
    #[serde(default, with = "duration_map")]
    pub timeouts: HashMap<ProtocolStage, Duration>,
}

impl TaskProtocolConfig {
    pub fn new(project_path: impl Into<String>, languages: Vec<String>, enabled_stages: Vec<ProtocolStage>) -> Self {
        Self {
            project_path: project_path.into(),
            languages,
            enabled_stages,
            max_retries: 3,
            fail_fast: false,
            self_correction: SelfCorrectionConfig::default(),
            timeouts: HashMap::new(),
        }
    }

    pub fn timeout_for(&self, stage: ProtocolStage) -> Duration {
        self.timeouts.get(&stage).copied().unwrap_or(Duration::from_secs(5 * 60))
    }
}

/// `ProtocolStage` isn't a plain string, so timeouts serialize as an array
/// of `(stage, millis)` pairs rather than a map with non-string keys.
mod duration_map {
    use super::ProtocolStage;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        stage: ProtocolStage,
        millis: u64,
    }

    pub fn serialize<S: Serializer>(map: &HashMap<ProtocolStage, Duration>, s: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<Entry> = map
            .iter()
            .map(|(stage, d)| Entry {
                stage: *stage,
                millis: d.as_millis() as u64,
            })
            .collect();
        entries.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<HashMap<ProtocolStage, Duration>, D::Error> {
        let entries: Vec<Entry> = Vec::deserialize(d)?;
        Ok(entries
            .into_iter()
            .map(|e| (e.stage, Duration::from_millis(e.millis)))
            .collect())
    }
}
