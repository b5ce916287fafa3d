//! Per-stage executors. Each returns `Ok(())` on pass, `Err(message)` with
//! the raw tool output on failure, ready to feed the error analyzer.

use crate::domain::{ProtocolStage, TaskProtocolConfig};

use super::ProtocolExecutor;

pub async fn run_stage(
    executor: &ProtocolExecutor,
    task_id: &str,
    stage: ProtocolStage,
    config: &TaskProtocolConfig,
) -> Result<(), String> {
    match stage {
        ProtocolStage::Linting => linting(executor, config).await,
        ProtocolStage::Building => building(executor, config).await,
        ProtocolStage::Testing => testing(executor, config).await,
        ProtocolStage::Guardrails => guardrails(executor, task_id, config).await,
    }
}

async fn linting(executor: &ProtocolExecutor, config: &TaskProtocolConfig) -> Result<(), String> {
    let report = executor
        .static_analyzer
        .analyze_project(&config.project_path, &config.languages)
        .await
        .map_err(|e| e.to_string())?;
    if report.has_errors() {
        let message = report
            .issues
            .iter()
            .filter(|i| i.severity == crate::collaborators::IssueSeverity::Error)
            .map(|i| format!("{}: {}", i.file, i.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(message);
    }
    Ok(())
}

async fn building(executor: &ProtocolExecutor, config: &TaskProtocolConfig) -> Result<(), String> {
    let timeout = config.timeout_for(ProtocolStage::Building);
    let report = tokio::time::timeout(
        timeout,
        executor.build.validate_project(&config.project_path, &config.languages),
    )
    .await
    .map_err(|_| format!("building timed out after {}s", timeout.as_secs()))?
    .map_err(|e| e.to_string())?;
    if !report.success {
        let message = report
            .per_language
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.output.clone())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(message);
    }
    Ok(())
}

/// Runs `RunSmokeTests` + `ValidateTestResults` once per configured
/// language, stopping at the first language that reports a failure.
async fn testing(executor: &ProtocolExecutor, config: &TaskProtocolConfig) -> Result<(), String> {
    let timeout = config.timeout_for(ProtocolStage::Testing);
    for language in &config.languages {
        let results = tokio::time::timeout(timeout, executor.test.run_smoke_tests(&config.project_path, language))
            .await
            .map_err(|_| format!("testing timed out after {}s", timeout.as_secs()))?
            .map_err(|e| e.to_string())?;
        let validation = executor.test.validate_test_results(&results);
        if !validation.success {
            return Err(format!(
                "{language}: {} failed test(s)",
                validation.failed_tests
            ));
        }
    }
    Ok(())
}

async fn guardrails(executor: &ProtocolExecutor, task_id: &str, _config: &TaskProtocolConfig) -> Result<(), String> {
    let validation = executor
        .guardrail
        .validate_task(task_id, &[], 0)
        .await
        .map_err(|e| e.to_string())?;
    if !validation.valid {
        return Err(validation.error.unwrap_or_else(|| "guardrail validation failed".to_string()));
    }
    Ok(())
}
