//! Step executor contract: one async function per `PipelineStepType`,
//! invoked by `PipelinePlanner::execute_pipeline`.

use crate::domain::{PipelineStep, PipelineStepType, StepResult};

use super::PipelinePlanner;

pub async fn run_step(planner: &PipelinePlanner, task_id: &str, project_path: &str, languages: &[String], step: &PipelineStep) -> StepResult {
    match step.step_type {
        PipelineStepType::Retrieve => retrieve(planner, task_id, project_path, step).await,
        // No AST-synthesis collaborator exists among this system's
        // external interfaces; left as a delegated no-op until one is
        // introduced, rather than forcing it onto an unrelated trait.
        PipelineStepType::AstSynth => StepResult { success: true, message: format!("{} delegated", step.step_type) },
        PipelineStepType::Format => format(planner, project_path, languages, step).await,
        PipelineStepType::Validate => validate(planner, task_id, step).await,
        PipelineStepType::Compile => compile(planner, project_path, languages).await,
        PipelineStepType::Test => test(planner, project_path).await,
        PipelineStepType::Static => static_analysis(planner, project_path, languages, step).await,
        PipelineStepType::Repair => repair(planner, project_path, languages, step).await,
    }
}

async fn retrieve(planner: &PipelinePlanner, task_id: &str, project_path: &str, step: &PipelineStep) -> StepResult {
    match planner.context_builder.build_context(task_id, project_path).await {
        Ok(pack) => StepResult {
            success: true,
            message: format!("retrieved context ({} files)", pack.files.len()),
        },
        Err(err) => StepResult {
            success: false,
            message: format!("step {}: {err}", step.id),
        },
    }
}

async fn format(planner: &PipelinePlanner, project_path: &str, languages: &[String], step: &PipelineStep) -> StepResult {
    match planner.formatter.format_project(project_path, languages).await {
        Ok(outcome) => StepResult {
            success: outcome.success,
            message: outcome.message,
        },
        Err(err) => StepResult {
            success: false,
            message: format!("step {}: {err}", step.id),
        },
    }
}

async fn validate(planner: &PipelinePlanner, task_id: &str, step: &PipelineStep) -> StepResult {
    match planner.guardrail.validate_task(task_id, &[], 0).await {
        Ok(validation) => StepResult {
            success: validation.valid,
            message: validation.error.unwrap_or_else(|| "guardrails passed".to_string()),
        },
        Err(err) => StepResult {
            success: false,
            message: format!("step {}: {err}", step.id),
        },
    }
}

async fn compile(planner: &PipelinePlanner, project_path: &str, languages: &[String]) -> StepResult {
    match planner.build.validate_project(project_path, languages).await {
        Ok(report) if report.success => StepResult { success: true, message: "build ok".into() },
        Ok(report) => StepResult {
            success: false,
            message: report.per_language.into_iter().filter(|r| !r.success).map(|r| r.output).collect::<Vec<_>>().join("; "),
        },
        Err(err) => StepResult { success: false, message: err.to_string() },
    }
}

async fn test(planner: &PipelinePlanner, project_path: &str) -> StepResult {
    let config = crate::collaborators::TestRunConfig::default();
    match planner.test.run_tests(project_path, &config).await {
        Ok(results) => {
            let validation = planner.test.validate_test_results(&results);
            if validation.success {
                StepResult { success: true, message: format!("{} tests passed", results.len()) }
            } else {
                StepResult {
                    success: false,
                    message: results.into_iter().filter(|r| !r.passed).map(|r| r.message).collect::<Vec<_>>().join("; "),
                }
            }
        }
        Err(err) => StepResult { success: false, message: err.to_string() },
    }
}

/// Fails only when `failOnError`-equivalent config is set on the step and
/// the report has error-severity issues; otherwise always succeeds (the
/// findings still surface in the message).
async fn static_analysis(planner: &PipelinePlanner, project_path: &str, languages: &[String], step: &PipelineStep) -> StepResult {
    let fail_on_error = step
        .config
        .get("fail_on_error")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    match planner.static_analyzer.analyze_project(project_path, languages).await {
        Ok(report) => {
            let has_errors = report.has_errors();
            StepResult {
                success: !(fail_on_error && has_errors),
                message: format!("{} issues found", report.issues.len()),
            }
        }
        Err(err) => StepResult { success: false, message: err.to_string() },
    }
}

/// No-op success if there is no prior error output to repair against.
async fn repair(planner: &PipelinePlanner, project_path: &str, languages: &[String], step: &PipelineStep) -> StepResult {
    let Some(error_output) = step.config.get("error_output").and_then(|v| v.as_str()) else {
        return StepResult { success: true, message: "nothing to repair".into() };
    };

    let request = crate::collaborators::RepairRequest {
        project_path: project_path.to_string(),
        error_output: error_output.to_string(),
        language: languages.first().cloned().unwrap_or_default(),
        max_attempts: 1,
    };
    match planner.repair.execute_repair(request).await {
        Ok(outcome) => StepResult {
            success: outcome.success,
            message: format!("repair attempted ({} attempt(s))", outcome.attempts),
        },
        Err(err) => StepResult { success: false, message: err.to_string() },
    }
}
