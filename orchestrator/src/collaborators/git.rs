//! Git Repository collaborator, used for observability (diff on finalize)
//! only — the core never generates diffs itself.

use async_trait::async_trait;
use eyre::{Context, Result};
use tokio::process::Command;

#[async_trait]
pub trait GitRepository: Send + Sync {
    async fn check_availability(&self) -> Result<bool>;
    async fn generate_diff(&self, project_path: &str) -> Result<String>;
    async fn get_all_files(&self, project_path: &str) -> Result<Vec<String>>;
    async fn get_uncommitted_files(&self, project_path: &str) -> Result<Vec<String>>;
    async fn get_rich_commit_history(&self, project_path: &str, limit: usize) -> Result<Vec<String>>;
}

/// Shells out to `git`, grounded on the worktree manager's own
/// `Command::new("git")` usage. Treats any non-git-repo as merely
/// unavailable rather than an error.
pub struct ProcessGitRepository;

impl ProcessGitRepository {
    pub fn new() -> Self {
        Self
    }

    async fn run_git(&self, project_path: &str, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .args(args)
            .current_dir(project_path)
            .output()
            .await
            .context("failed to spawn git")
    }
}

impl Default for ProcessGitRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRepository for ProcessGitRepository {
    async fn check_availability(&self) -> Result<bool> {
        let output = Command::new("git").arg("--version").output().await;
        Ok(output.map(|o| o.status.success()).unwrap_or(false))
    }

    async fn generate_diff(&self, project_path: &str) -> Result<String> {
        let output = self.run_git(project_path, &["diff"]).await?;
        if !output.status.success() {
            eyre::bail!(
                "git diff failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn get_all_files(&self, project_path: &str) -> Result<Vec<String>> {
        let output = self.run_git(project_path, &["ls-files"]).await?;
        if !output.status.success() {
            eyre::bail!(
                "git ls-files failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    async fn get_uncommitted_files(&self, project_path: &str) -> Result<Vec<String>> {
        let output = self
            .run_git(project_path, &["status", "--porcelain"])
            .await?;
        if !output.status.success() {
            eyre::bail!(
                "git status failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.get(3..).map(str::to_string))
            .collect())
    }

    async fn get_rich_commit_history(&self, project_path: &str, limit: usize) -> Result<Vec<String>> {
        let output = self
            .run_git(
                project_path,
                &["log", &format!("-{limit}"), "--stat", "--pretty=format:%H %s"],
            )
            .await?;
        if !output.status.success() {
            eyre::bail!(
                "git log failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .split("\n\n")
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}
