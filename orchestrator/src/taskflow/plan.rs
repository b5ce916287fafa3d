//! Plan Loader: reads a declarative plan file into in-memory `Task`
//! entities, overlaying current state from the Status Store.

use std::collections::HashMap;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Budgets, Task, TaskState};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanTaskEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub step_file: Option<String>,
    #[serde(default)]
    pub budgets: Budgets,
    #[serde(default)]
    pub status: Option<TaskState>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanFile {
    pub version: u32,
    pub tasks: Vec<PlanTaskEntry>,
}

impl PlanFile {
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse plan file")
    }
}

/// Reads `path`, materializes `Task`s, and overlays `statuses` (current
/// Status Store state) onto each task's initial status hint.
pub async fn load_tasks(path: &Path, statuses: &HashMap<String, TaskState>) -> Result<Vec<Task>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read plan file {}", path.display()))?;
    let plan = PlanFile::parse(&content)?;
    info!(version = plan.version, tasks = plan.tasks.len(), "loaded plan");

    Ok(plan
        .tasks
        .into_iter()
        .map(|entry| {
            let mut task = Task::new(entry.id.clone(), entry.name)
                .with_depends_on(entry.depends_on)
                .with_budgets(entry.budgets);
            if let Some(step_file) = entry.step_file {
                task = task.with_step_file(step_file);
            }
            let overlaid = statuses.get(&entry.id).copied().or(entry.status).unwrap_or_default();
            task.set_status(overlaid);
            task
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_YAML: &str = r#"
version: 1
tasks:
  - id: a
    name: Scaffold module
    dependsOn: []
    stepFile: steps/a.json
    budgets:
      maxFiles: 5
      maxChangedLines: 200
    status: todo
  - id: b
    name: Wire up handler
    dependsOn: [a]
"#;

    #[test]
    fn parses_plan_with_defaults() {
        let plan = PlanFile::parse(PLAN_YAML).unwrap();
        assert_eq!(plan.version, 1);
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[1].depends_on, vec!["a".to_string()]);
        assert!(plan.tasks[1].step_file.is_none());
    }

    #[tokio::test]
    async fn load_tasks_overlays_status_store_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yml");
        tokio::fs::write(&path, PLAN_YAML).await.unwrap();

        let mut statuses = HashMap::new();
        statuses.insert("a".to_string(), TaskState::Done);

        let tasks = load_tasks(&path, &statuses).await.unwrap();
        assert_eq!(tasks[0].status, TaskState::Done, "overlay wins over the plan hint");
        assert_eq!(tasks[1].status, TaskState::Todo, "no overlay falls back to the plan hint");
    }
}
