//! Formatter collaborator.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::collaborators::process;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOutcome {
    pub success: bool,
    pub message: String,
}

#[async_trait]
pub trait FormatterService: Send + Sync {
    /// Format one file by extension: `success=false, message="unsupported
    /// file type"` when no formatter is configured for it. Used by the
    /// Correction Engine's `formatCode` action.
    async fn format_file(&self, project_path: &str, relative_path: &str) -> Result<FormatOutcome>;

    /// Format the whole project for each of `languages`, run at the
    /// project root. Used by the Pipeline Planner's `format` step.
    async fn format_project(&self, project_path: &str, languages: &[String]) -> Result<FormatOutcome>;
}

/// Shells out to an extension-keyed command template (`{file}` substituted
/// with the file's path relative to the project root) for single-file
/// formatting, and a language-keyed command run at the project root for
/// project-wide formatting: gofmt and prettier are the canonical
/// external formatters this stands in for.
pub struct ProcessFormatterService {
    file_commands: HashMap<String, String>,
    project_commands: HashMap<String, String>,
    timeout: Duration,
}

impl ProcessFormatterService {
    pub fn new(file_commands: HashMap<String, String>, project_commands: HashMap<String, String>, timeout: Duration) -> Self {
        Self {
            file_commands,
            project_commands,
            timeout,
        }
    }

    /// gofmt for Go, prettier for TypeScript/JavaScript; neither needs a
    /// `{file}` placeholder to format the whole project.
    pub fn with_default_commands(timeout: Duration) -> Self {
        let mut file_commands = HashMap::new();
        file_commands.insert("go".to_string(), "gofmt -w {file}".to_string());
        file_commands.insert("ts".to_string(), "prettier --write {file}".to_string());
        file_commands.insert("tsx".to_string(), "prettier --write {file}".to_string());
        file_commands.insert("js".to_string(), "prettier --write {file}".to_string());
        file_commands.insert("jsx".to_string(), "prettier --write {file}".to_string());

        let mut project_commands = HashMap::new();
        project_commands.insert("go".to_string(), "gofmt -w .".to_string());
        project_commands.insert("typescript".to_string(), "prettier --write .".to_string());
        project_commands.insert("javascript".to_string(), "prettier --write .".to_string());

        Self::new(file_commands, project_commands, timeout)
    }
}

#[async_trait]
impl FormatterService for ProcessFormatterService {
    async fn format_file(&self, project_path: &str, relative_path: &str) -> Result<FormatOutcome> {
        let Some(ext) = Path::new(relative_path).extension().and_then(|e| e.to_str()) else {
            return Ok(FormatOutcome {
                success: false,
                message: "unsupported file type".into(),
            });
        };
        let Some(template) = self.file_commands.get(ext) else {
            return Ok(FormatOutcome {
                success: false,
                message: "unsupported file type".into(),
            });
        };

        let command = template.replace("{file}", relative_path);
        let output = process::run(&command, Path::new(project_path), self.timeout).await?;
        Ok(FormatOutcome {
            success: output.success,
            message: if output.success {
                format!("formatted {relative_path}")
            } else {
                output.stderr
            },
        })
    }

    async fn format_project(&self, project_path: &str, languages: &[String]) -> Result<FormatOutcome> {
        let mut messages = Vec::new();
        let mut success = true;
        for language in languages {
            let Some(command) = self.project_commands.get(language) else {
                continue;
            };
            let output = process::run(command, Path::new(project_path), self.timeout).await?;
            success &= output.success;
            messages.push(if output.success {
                format!("{language} formatted")
            } else {
                output.stderr
            });
        }
        Ok(FormatOutcome {
            success,
            message: messages.join("; "),
        })
    }
}
