//! LLM Router collaborator (optional — the Supervisor falls back to a
//! heuristic `PipelinePolicy` when this is unavailable or errors).

use async_trait::async_trait;
use eyre::Result;

use crate::collaborators::ContextPack;
use crate::domain::{PipelinePolicy, Task};

pub struct RouterOutcome {
    pub policy: PipelinePolicy,
    pub fallback_used: bool,
}

#[async_trait]
pub trait LlmRouter: Send + Sync {
    async fn create_pipeline_with_llm(&self, task: &Task, context_pack: &ContextPack) -> Result<RouterOutcome>;
}

/// Default when no LLM backend is configured. Always errors, so the
/// Supervisor falls back to `SlaPolicy::heuristic_policy`.
pub struct NullLlmRouter;

#[async_trait]
impl LlmRouter for NullLlmRouter {
    async fn create_pipeline_with_llm(&self, _task: &Task, _context_pack: &ContextPack) -> Result<RouterOutcome> {
        eyre::bail!("no LLM router configured")
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;

    #[tokio::test]
    async fn null_router_always_errors() {
        let router = NullLlmRouter;
        let task = Task::new("t1", "fix auth");
        let pack = ContextPack::default();
        assert!(router.create_pipeline_with_llm(&task, &pack).await.is_err());
    }

    pub struct MockLlmRouter {
        pub should_fail: bool,
        pub policy: PipelinePolicy,
    }

    impl MockLlmRouter {
        pub fn succeeding(policy: PipelinePolicy) -> Self {
            Self {
                should_fail: false,
                policy,
            }
        }

        pub fn failing() -> Self {
            Self {
                should_fail: true,
                policy: PipelinePolicy::default(),
            }
        }
    }

    #[async_trait]
    impl LlmRouter for MockLlmRouter {
        async fn create_pipeline_with_llm(&self, _task: &Task, _context_pack: &ContextPack) -> Result<RouterOutcome> {
            if self.should_fail {
                eyre::bail!("llm router unavailable");
            }
            Ok(RouterOutcome {
                policy: self.policy,
                fallback_used: false,
            })
        }
    }

    #[tokio::test]
    async fn failing_router_errors() {
        let router = MockLlmRouter::failing();
        let task = Task::new("t1", "fix auth");
        let pack = ContextPack::default();
        assert!(router.create_pipeline_with_llm(&task, &pack).await.is_err());
    }
}
