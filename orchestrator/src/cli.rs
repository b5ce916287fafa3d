//! CLI command definitions and subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// taskctl - autonomous code-change orchestrator
#[derive(Parser)]
#[command(
    name = "taskctl",
    about = "Plans and drives staged verification pipelines with self-correction",
    version,
    after_help = "Reports are written under <project>/tasks/reports"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Taskflow plan operations
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// Autonomous task operations
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Run the task protocol for a project directly
    Protocol {
        /// Project directory
        project_path: PathBuf,

        /// Natural-language task description
        task: String,

        /// Comma-separated stages, e.g. linting,building,testing,guardrails
        #[arg(long, default_value = "linting,building,testing,guardrails")]
        stages: String,
    },
}

#[derive(Subcommand)]
pub enum PlanAction {
    /// Validate a plan file's DAG and referenced step files
    Validate {
        /// Path to the plan YAML file
        plan_path: PathBuf,

        /// Project directory the plan's stepFile paths are relative to
        project_path: PathBuf,
    },

    /// Load a plan and drain its whole DAG
    Run {
        plan_path: PathBuf,
        project_path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Submit a new autonomous task
    Start {
        task: String,
        project_path: PathBuf,

        #[arg(long, default_value = "standard")]
        sla_policy: String,
    },

    /// Pause a running autonomous task
    Pause { task_id: String },

    /// Resume a paused autonomous task
    Resume { task_id: String },

    /// Cancel an autonomous task
    Cancel { task_id: String },

    /// Show an autonomous task's status
    Status { task_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_no_command() {
        let cli = Cli::parse_from(["taskctl"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_plan_validate() {
        let cli = Cli::parse_from(["taskctl", "plan", "validate", "plan.yml", "/proj"]);
        assert!(matches!(
            cli.command,
            Some(Command::Plan {
                action: PlanAction::Validate { .. }
            })
        ));
    }

    #[test]
    fn parse_task_start() {
        let cli = Cli::parse_from(["taskctl", "task", "start", "fix the bug", "/proj"]);
        match cli.command {
            Some(Command::Task {
                action: TaskAction::Start { task, sla_policy, .. },
            }) => {
                assert_eq!(task, "fix the bug");
                assert_eq!(sla_policy, "standard");
            }
            _ => panic!("expected Task::Start"),
        }
    }

    #[test]
    fn parse_with_config() {
        let cli = Cli::parse_from(["taskctl", "-c", "/path/to/config.yml", "task", "status", "t1"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
    }
}
