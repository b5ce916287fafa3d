//! Event payloads published by the core, per the external-interfaces
//! event list: `app:error`, the `shotgunContextGeneration*` family, and
//! `taskFailed`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "app:error")]
    AppError { message: String },

    #[serde(rename = "shotgunContextGenerationStarted")]
    ShotgunContextGenerationStarted { task_id: String },

    #[serde(rename = "shotgunContextGenerationProgress")]
    ShotgunContextGenerationProgress { task_id: String, progress: f64 },

    #[serde(rename = "shotgunContextGenerationTimeout")]
    ShotgunContextGenerationTimeout { task_id: String },

    #[serde(rename = "shotgunContextGenerationFailed")]
    ShotgunContextGenerationFailed { task_id: String, message: String },

    #[serde(rename = "shotgunContextGenerationGenerated")]
    ShotgunContextGenerationGenerated { task_id: String },

    #[serde(rename = "taskFailed")]
    TaskFailed { task_id: String, message: String },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppError { .. } => "app:error",
            Self::ShotgunContextGenerationStarted { .. } => "shotgunContextGenerationStarted",
            Self::ShotgunContextGenerationProgress { .. } => "shotgunContextGenerationProgress",
            Self::ShotgunContextGenerationTimeout { .. } => "shotgunContextGenerationTimeout",
            Self::ShotgunContextGenerationFailed { .. } => "shotgunContextGenerationFailed",
            Self::ShotgunContextGenerationGenerated { .. } => "shotgunContextGenerationGenerated",
            Self::TaskFailed { .. } => "taskFailed",
        }
    }
}
