//! Task-id-driven policy derivation for `CreatePipeline`.
//!
//! Task ids carry a project-specific suffix that pins them to a reduced
//! verification scope; everything else gets the full default pipeline.

use crate::domain::PipelinePolicy;

const TESTS_ONLY_MARKERS: &[&str] = &["ark-160"];
const STATIC_ONLY_MARKERS: &[&str] = &["ark-170"];

/// Derive the policy a pipeline for `task_id` should run under.
pub fn policy_for_task(task_id: &str) -> PipelinePolicy {
    if TESTS_ONLY_MARKERS.iter().any(|marker| task_id.contains(marker)) {
        PipelinePolicy::tests_only()
    } else if STATIC_ONLY_MARKERS.iter().any(|marker| task_id.contains(marker)) {
        PipelinePolicy::static_only()
    } else {
        PipelinePolicy::default()
    }
}
