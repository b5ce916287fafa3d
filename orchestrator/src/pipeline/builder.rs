//! Materializes a `Pipeline`'s step DAG from a policy.

use crate::domain::{Pipeline, PipelinePolicy, PipelineStep, CANONICAL_STEP_ORDER};

/// Build the step list for `task_id` under `policy`: walk the canonical
/// order, skip disabled step types, chain each materialized step's
/// `dependsOn` to the immediately-preceding materialized step, assign
/// priorities 1..=8 by canonical position, then stable-sort by
/// `(priority desc, depends_on.len() asc)`.
pub fn create_pipeline(task_id: &str, policy: PipelinePolicy) -> Pipeline {
    let mut steps = Vec::new();
    let mut previous_id: Option<String> = None;

    for (index, &step_type) in CANONICAL_STEP_ORDER.iter().enumerate() {
        if !policy.enables(step_type) {
            continue;
        }
        let id = format!("{task_id}-step-{}", steps.len() + 1);
        let priority = (CANONICAL_STEP_ORDER.len() - index) as u32;
        let depends_on = previous_id.clone().into_iter().collect();
        steps.push(PipelineStep::new(id.clone(), step_type, priority, depends_on));
        previous_id = Some(id);
    }

    steps.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.depends_on.len().cmp(&b.depends_on.len())));

    Pipeline::new(task_id, steps, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_materializes_all_eight_steps_in_order() {
        let pipeline = create_pipeline("t1", PipelinePolicy::default());
        assert_eq!(pipeline.steps.len(), 8);
        assert_eq!(pipeline.steps[0].id, "t1-step-1");
        assert!(pipeline.steps[0].depends_on.is_empty());
        assert_eq!(pipeline.steps[1].depends_on, vec!["t1-step-1".to_string()]);
    }

    #[test]
    fn disabled_steps_are_skipped_and_chain_closes_the_gap() {
        let pipeline = create_pipeline("t1", PipelinePolicy::tests_only());
        // compile, test
        assert_eq!(pipeline.steps.len(), 2);
        assert!(pipeline.steps[0].depends_on.is_empty());
        assert_eq!(pipeline.steps[1].depends_on, vec![pipeline.steps[0].id.clone()]);
    }

    #[test]
    fn priorities_are_stable_sorted_descending() {
        let pipeline = create_pipeline("t1", PipelinePolicy::default());
        for pair in pipeline.steps.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }
}
