//! `ValidateTaskflow`: DFS cycle detection over `dependsOn`, plus
//! existence checks for each task's `stepFile`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::domain::Task;
use crate::error::OrchestratorError;

pub fn validate(tasks: &HashMap<String, Task>, project_path: &str) -> Result<(), OrchestratorError> {
    check_acyclic(tasks)?;
    check_step_files_exist(tasks, project_path)?;
    Ok(())
}

fn check_acyclic(tasks: &HashMap<String, Task>) -> Result<(), OrchestratorError> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut recursion_stack: HashSet<&str> = HashSet::new();

    for id in tasks.keys() {
        if !visited.contains(id.as_str()) {
            visit(id, tasks, &mut visited, &mut recursion_stack)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    id: &'a str,
    tasks: &'a HashMap<String, Task>,
    visited: &mut HashSet<&'a str>,
    recursion_stack: &mut HashSet<&'a str>,
) -> Result<(), OrchestratorError> {
    visited.insert(id);
    recursion_stack.insert(id);

    if let Some(task) = tasks.get(id) {
        for dep in &task.depends_on {
            let dep = dep.as_str();
            if recursion_stack.contains(dep) {
                return Err(OrchestratorError::CyclicDependency(format!("{id} -> {dep}")));
            }
            if !visited.contains(dep) {
                visit(dep, tasks, visited, recursion_stack)?;
            }
        }
    }

    recursion_stack.remove(id);
    Ok(())
}

fn check_step_files_exist(tasks: &HashMap<String, Task>, project_path: &str) -> Result<(), OrchestratorError> {
    for task in tasks.values() {
        if let Some(step_file) = &task.step_file {
            let full_path = Path::new(project_path).join(step_file);
            if !full_path.exists() {
                return Err(OrchestratorError::Validation(format!(
                    "task {}: stepFile not found: {}",
                    task.id,
                    full_path.display()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;

    fn tasks_map(pairs: &[(&str, &[&str])]) -> HashMap<String, Task> {
        pairs
            .iter()
            .map(|(id, deps)| {
                let task = Task::new(*id, *id).with_depends_on(deps.iter().map(|d| d.to_string()).collect());
                (id.to_string(), task)
            })
            .collect()
    }

    #[test]
    fn acyclic_plan_validates() {
        let tasks = tasks_map(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        assert!(check_acyclic(&tasks).is_ok());
    }

    #[test]
    fn direct_cycle_is_detected() {
        let tasks = tasks_map(&[("a", &["b"]), ("b", &["a"])]);
        let err = check_acyclic(&tasks).unwrap_err();
        assert_eq!(err.kind(), "cyclicDependency");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = tasks_map(&[("a", &["a"])]);
        assert!(check_acyclic(&tasks).is_err());
    }

    #[test]
    fn missing_step_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = HashMap::new();
        tasks.insert(
            "a".to_string(),
            Task::new("a", "a").with_step_file("does-not-exist.json"),
        );
        let err = check_step_files_exist(&tasks, dir.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
