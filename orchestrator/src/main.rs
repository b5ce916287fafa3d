//! taskctl - autonomous code-change orchestrator
//!
//! CLI entry point: wires the concrete collaborators, loads config, and
//! dispatches to the subsystem the subcommand names.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use orchestrator::cli::{Cli, Command, PlanAction, TaskAction};
use orchestrator::collaborators::{
    BudgetGuardrailService, CommandStaticAnalyzer, DefaultStatusStore, NullLlmRouter, NullRepairService,
    ProcessBuildService, ProcessFormatterService, ProcessGitRepository, ProcessTestService, WalkdirContextBuilder,
};
use orchestrator::config::Config;
use orchestrator::domain::{ProtocolStage, Store, TaskProtocolConfig};
use orchestrator::events::EventBus;
use orchestrator::pipeline::PipelinePlanner;
use orchestrator::supervisor::{AutonomousSupervisor, AutonomousTaskRequest};
use orchestrator::taskflow::TaskflowService;

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskctl")
        .join("logs");
    std::fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(sla_tier = %config.sla.default_tier, "taskctl started");

    let build = Arc::new(ProcessBuildService::new(Default::default(), Duration::from_secs(5 * 60)));
    let test = Arc::new(ProcessTestService::new(Default::default()));
    let static_analyzer = Arc::new(CommandStaticAnalyzer::new(Default::default(), Duration::from_secs(5 * 60)));
    let guardrail = Arc::new(BudgetGuardrailService::new());
    let git = Arc::new(ProcessGitRepository::new());
    let repair = Arc::new(NullRepairService);
    let llm_router = Arc::new(NullLlmRouter);
    let context_builder = Arc::new(WalkdirContextBuilder::new());
    let formatter = Arc::new(ProcessFormatterService::with_default_commands(Duration::from_secs(5 * 60)));

    let taskstore_dir = PathBuf::from(&config.storage.taskstore_dir);
    let store = Arc::new(Store::open(&taskstore_dir).context("Failed to open task store")?);
    let status_store = Arc::new(DefaultStatusStore::new(store));

    let events = EventBus::new(256);
    let planner = Arc::new(PipelinePlanner::new(
        build.clone(),
        test.clone(),
        static_analyzer.clone(),
        repair.clone(),
        context_builder.clone(),
        guardrail.clone(),
        formatter.clone(),
    ));

    match cli.command {
        None => {
            println!("taskctl v{}", env!("CARGO_PKG_VERSION"));
            println!("  SLA tier: {}", config.sla.default_tier);
            println!("  Max concurrent pipelines: {}", config.concurrency.max_concurrent_pipelines);
        }

        Some(Command::Plan { action }) => match action {
            PlanAction::Validate { plan_path, project_path } => {
                let taskflow = TaskflowService::new(status_store, guardrail, git, build, planner, events.emitter());
                taskflow.load_plan(&plan_path).await?;
                taskflow.validate_taskflow(&project_path.to_string_lossy()).await?;
                println!("plan is valid");
            }
            PlanAction::Run { plan_path, project_path } => {
                let taskflow = TaskflowService::new(status_store, guardrail, git, build, planner, events.emitter());
                taskflow.load_plan(&plan_path).await?;
                taskflow.validate_taskflow(&project_path.to_string_lossy()).await?;
                taskflow.execute_taskflow(&project_path.to_string_lossy()).await?;
                println!("taskflow drained");
            }
        },

        Some(Command::Task { action }) => {
            let supervisor = Arc::new(AutonomousSupervisor::new(
                status_store,
                context_builder,
                llm_router,
                git,
                planner,
                events.emitter(),
            ));
            match action {
                TaskAction::Start { task, project_path, sla_policy } => {
                    let response = supervisor
                        .submit_autonomous_task(AutonomousTaskRequest {
                            task,
                            project_path: project_path.to_string_lossy().into_owned(),
                            sla_policy,
                        })
                        .await?;
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                TaskAction::Pause { task_id } => supervisor.pause_task(&task_id).await?,
                TaskAction::Resume { task_id } => supervisor.resume_task(&task_id).await?,
                TaskAction::Cancel { task_id } => supervisor.cancel_task(&task_id).await?,
                TaskAction::Status { task_id } => match supervisor.task_status(&task_id).await {
                    Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
                    None => println!("no such task: {task_id}"),
                },
            }
        }

        Some(Command::Protocol { project_path, task: _task, stages }) => {
            let executor =
                orchestrator::protocol::ProtocolExecutor::new(build, test, static_analyzer, guardrail, formatter, events.emitter());
            let enabled_stages = stages
                .split(',')
                .filter_map(|s| match s.trim() {
                    "linting" => Some(ProtocolStage::Linting),
                    "building" => Some(ProtocolStage::Building),
                    "testing" => Some(ProtocolStage::Testing),
                    "guardrails" => Some(ProtocolStage::Guardrails),
                    _ => None,
                })
                .collect();
            let languages = vec!["go".to_string()];
            let protocol_config = TaskProtocolConfig::new(project_path.to_string_lossy(), languages, enabled_stages);
            let result = executor.execute_protocol("cli-run", &protocol_config).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
