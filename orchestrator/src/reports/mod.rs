//! Report Writer: persists `TaskProtocolResult`s as the JSON report files
//! named in the plan/status file format section.

use std::path::{Path, PathBuf};

use chrono::Utc;
use eyre::{Context, Result};
use tracing::info;

use crate::domain::TaskProtocolResult;

pub struct ReportWriter {
    root: PathBuf,
}

impl ReportWriter {
    /// `project_path`-relative `tasks/reports/` is where every report
    /// lands; `protocols/` is a subdirectory of that root.
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            root: project_path.as_ref().join("tasks").join("reports"),
        }
    }

    /// Ad-hoc stage-oriented verification runs, not tied to a specific
    /// task id: `tasks/reports/verification_<UTC-yyyymmdd_HHMMSS>.json`.
    pub async fn write_verification_report(&self, result: &TaskProtocolResult) -> Result<PathBuf> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.root.join(format!("verification_{timestamp}.json"));
        self.write_json(&path, result).await?;
        Ok(path)
    }

    /// Protocol runs executed in the context of a specific task:
    /// `tasks/reports/protocols/task_protocol_<taskId>_<timestamp>.json`.
    pub async fn write_protocol_report(&self, task_id: &str, result: &TaskProtocolResult) -> Result<PathBuf> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.root.join("protocols").join(format!("task_protocol_{task_id}_{timestamp}.json"));
        self.write_json(&path, result).await?;
        Ok(path)
    }

    async fn write_json(&self, path: &Path, result: &TaskProtocolResult) -> Result<()> {
        let parent = path.parent().expect("report path always has a parent");
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create report directory {}", parent.display()))?;

        let body = serde_json::to_vec_pretty(result).context("failed to serialize report")?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &body).await.context("failed to write report")?;
        tokio::fs::rename(&tmp_path, path).await.context("failed to finalize report")?;

        info!(path = %path.display(), "wrote report");
        Ok(())
    }
}
