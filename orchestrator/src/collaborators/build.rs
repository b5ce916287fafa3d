//! Build Service collaborator.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::collaborators::process;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub language: String,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBuildReport {
    pub success: bool,
    pub per_language: Vec<BuildResult>,
}

#[async_trait]
pub trait BuildService: Send + Sync {
    async fn build(&self, project_path: &str, language: &str) -> Result<BuildResult>;
    async fn validate_project(&self, project_path: &str, languages: &[String]) -> Result<ProjectBuildReport>;
    async fn get_supported_languages(&self) -> Result<Vec<String>>;
    async fn detect_languages(&self, project_path: &str) -> Result<Vec<String>>;
}

/// Runs a per-language shell command, e.g. `go build ./...` or
/// `npm run build`, in the project directory.
pub struct ProcessBuildService {
    commands: HashMap<String, String>,
    timeout: Duration,
}

impl ProcessBuildService {
    pub fn new(commands: HashMap<String, String>, timeout: Duration) -> Self {
        Self { commands, timeout }
    }
}

#[async_trait]
impl BuildService for ProcessBuildService {
    async fn build(&self, project_path: &str, language: &str) -> Result<BuildResult> {
        let Some(command) = self.commands.get(language) else {
            return Ok(BuildResult {
                language: language.to_string(),
                success: false,
                output: format!("no build command configured for language {language}"),
            });
        };
        let output = process::run(command, Path::new(project_path), self.timeout).await?;
        Ok(BuildResult {
            language: language.to_string(),
            success: output.success,
            output: if output.success { output.stdout } else { output.stderr },
        })
    }

    async fn validate_project(&self, project_path: &str, languages: &[String]) -> Result<ProjectBuildReport> {
        let mut per_language = Vec::new();
        let mut success = true;
        for lang in languages {
            let result = self.build(project_path, lang).await?;
            success &= result.success;
            per_language.push(result);
        }
        Ok(ProjectBuildReport { success, per_language })
    }

    async fn get_supported_languages(&self) -> Result<Vec<String>> {
        Ok(self.commands.keys().cloned().collect())
    }

    async fn detect_languages(&self, project_path: &str) -> Result<Vec<String>> {
        let root = Path::new(project_path);
        let mut detected = Vec::new();
        if root.join("go.mod").exists() {
            detected.push("go".to_string());
        }
        if root.join("package.json").exists() {
            detected.push("typescript".to_string());
        }
        if root.join("Cargo.toml").exists() {
            detected.push("rust".to_string());
        }
        Ok(detected)
    }
}
