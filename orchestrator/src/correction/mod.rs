//! Correction Engine: applies an ordered sequence of `CorrectionStep`s to
//! a project path.

mod dispatch;

use crate::collaborators::FormatterService;
use crate::domain::{CorrectionResult, CorrectionStep};

/// Apply `steps` against `project_path`, in the Correction Engine's
/// priority order. Returns the steps with `applied`/`result` filled in
/// plus the aggregate `CorrectionResult`.
pub async fn apply_corrections(
    project_path: &str,
    mut steps: Vec<CorrectionStep>,
    formatter: &dyn FormatterService,
) -> (Vec<CorrectionStep>, CorrectionResult) {
    steps.sort_by_key(|s| std::cmp::Reverse(s.action.priority()));

    let mut result = CorrectionResult::default();
    let mut messages = Vec::new();
    let mut overall_success = true;

    for step in &mut steps {
        match dispatch::dispatch(project_path, step, formatter).await {
            Ok(outcome) => {
                step.applied = outcome.success;
                step.result = outcome.message.clone();
                if let Some(path) = outcome.changed_file {
                    result.mark_changed(path);
                }
                overall_success &= outcome.success;
                messages.push(outcome.message);
            }
            Err(err) => {
                step.applied = false;
                step.result = format!("Failed: {err}");
                overall_success = false;
                messages.push(step.result.clone());
            }
        }
    }

    result.success = overall_success;
    result.message = messages.join("; ");
    (steps, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::formatter::mock::MockFormatterService;
    use crate::domain::CorrectionAction;

    #[tokio::test]
    async fn aggregates_results_in_priority_order() {
        let steps = vec![
            CorrectionStep::new(CorrectionAction::RemoveCode, "a.go", "remove dead code"),
            CorrectionStep::new(CorrectionAction::FixSyntax, "a.go", "fix syntax"),
        ];
        let formatter = MockFormatterService::new(true);
        let (applied, result) = apply_corrections("/tmp/does-not-matter", steps, &formatter).await;
        // both are no-op reserved extensions: overall success true
        assert!(result.success);
        assert_eq!(applied[0].action, CorrectionAction::FixSyntax, "higher priority runs first");
    }

    #[tokio::test]
    async fn unsupported_format_target_does_not_abort_sequence() {
        let steps = vec![CorrectionStep::new(CorrectionAction::FormatCode, "a.unknown", "format")];
        let formatter = MockFormatterService::new(false);
        let (_, result) = apply_corrections("/tmp", steps, &formatter).await;
        assert!(!result.success);
        assert!(result.message.contains("unsupported file type"));
    }
}
