//! Shared subprocess runner for the process-backed collaborator adapters
//! (`ProcessBuildService`, `ProcessTestService`, `CommandStaticAnalyzer`).

use std::path::Path;
use std::time::Duration;

use eyre::Result;

pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` through `sh -c` in `cwd`, bounded by `timeout`.
pub async fn run(command: &str, cwd: &Path, timeout: Duration) -> Result<CommandOutput> {
    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new("sh").arg("-c").arg(command).current_dir(cwd).output(),
    )
    .await??;

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let out = run("echo ok", dir.path(), Duration::from_secs(5)).await.unwrap();
        assert!(out.success);
        assert!(out.stdout.contains("ok"));
    }

    #[tokio::test]
    async fn failing_command_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = run("exit 1", dir.path(), Duration::from_secs(5)).await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run("sleep 5", dir.path(), Duration::from_millis(50)).await;
        assert!(result.is_err());
    }
}
