//! Repair Service collaborator (optional), invoked by the Pipeline
//! Planner's `repair` step executor and, indirectly, by the Supervisor's
//! repair sub-pipeline.

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairRequest {
    pub project_path: String,
    pub error_output: String,
    pub language: String,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub success: bool,
    pub attempts: u32,
}

#[async_trait]
pub trait RepairService: Send + Sync {
    async fn execute_repair(&self, request: RepairRequest) -> Result<RepairOutcome>;
}

/// Default when no auto-fix backend is configured. Reports failure
/// without running anything, so repair sub-pipelines fail fast instead
/// of hanging on a collaborator that was never wired up.
pub struct NullRepairService;

#[async_trait]
impl RepairService for NullRepairService {
    async fn execute_repair(&self, _request: RepairRequest) -> Result<RepairOutcome> {
        Ok(RepairOutcome { success: false, attempts: 0 })
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn null_repair_service_reports_failure() {
        let service = NullRepairService;
        let outcome = service
            .execute_repair(RepairRequest {
                project_path: "/p".into(),
                error_output: "boom".into(),
                language: "go".into(),
                max_attempts: 3,
            })
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    pub struct MockRepairService {
        pub succeeds: AtomicBool,
    }

    impl MockRepairService {
        pub fn new(succeeds: bool) -> Self {
            Self {
                succeeds: AtomicBool::new(succeeds),
            }
        }
    }

    #[async_trait]
    impl RepairService for MockRepairService {
        async fn execute_repair(&self, request: RepairRequest) -> Result<RepairOutcome> {
            Ok(RepairOutcome {
                success: self.succeeds.load(Ordering::SeqCst),
                attempts: request.max_attempts.min(1),
            })
        }
    }

    #[tokio::test]
    async fn repair_reports_requested_outcome() {
        let service = MockRepairService::new(true);
        let outcome = service
            .execute_repair(RepairRequest {
                project_path: "/p".into(),
                error_output: "boom".into(),
                language: "go".into(),
                max_attempts: 1,
            })
            .await
            .unwrap();
        assert!(outcome.success);
    }
}
