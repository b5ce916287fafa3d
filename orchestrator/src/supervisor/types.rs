//! Request/response DTOs for the Autonomous Supervisor's public entry
//! point. These aren't persisted records, so they live beside the
//! supervisor rather than in `domain`.

use serde::{Deserialize, Serialize};

/// `sla_policy` arrives as a raw string (the wire/CLI boundary) and is
/// parsed into `SlaPolicy` during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousTaskRequest {
    pub task: String,
    pub project_path: String,
    pub sla_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousTaskResponse {
    pub task_id: String,
    pub status: String,
}
