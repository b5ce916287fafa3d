//! Static Analyzer Service collaborator.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::collaborators::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisIssue {
    pub severity: IssueSeverity,
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticAnalysisReport {
    pub issues: Vec<AnalysisIssue>,
}

impl StaticAnalysisReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }
}

#[async_trait]
pub trait StaticAnalyzerService: Send + Sync {
    async fn analyze_project(&self, project_path: &str, languages: &[String]) -> Result<StaticAnalysisReport>;
}

/// Runs a per-language lint command, e.g. `golangci-lint run` or
/// `eslint .`; a non-zero exit becomes one `Error`-severity issue. The
/// core has no opinion on the linter's own diagnostic format.
pub struct CommandStaticAnalyzer {
    commands: HashMap<String, String>,
    timeout: Duration,
}

impl CommandStaticAnalyzer {
    pub fn new(commands: HashMap<String, String>, timeout: Duration) -> Self {
        Self { commands, timeout }
    }
}

#[async_trait]
impl StaticAnalyzerService for CommandStaticAnalyzer {
    async fn analyze_project(&self, project_path: &str, languages: &[String]) -> Result<StaticAnalysisReport> {
        let mut issues = Vec::new();
        for language in languages {
            let Some(command) = self.commands.get(language) else {
                continue;
            };
            let output = process::run(command, Path::new(project_path), self.timeout).await?;
            if !output.success {
                issues.push(AnalysisIssue {
                    severity: IssueSeverity::Error,
                    file: language.clone(),
                    message: output.stderr,
                });
            }
        }
        Ok(StaticAnalysisReport { issues })
    }
}
