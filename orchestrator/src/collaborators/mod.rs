//! External collaborator contracts.
//!
//! Everything the core coordinates but does not implement: static
//! analysis, builds, tests, guardrails, git, the LLM router, the repair
//! service, and status persistence. Each is an `async_trait` trait
//! (`Send + Sync`), matching the teacher's `LlmClient` shape in
//! `td/src/llm/client.rs`, with a `#[cfg(test)] pub mod mock` fake
//! colocated for unit tests elsewhere in the crate.

pub mod build;
pub mod context;
pub mod formatter;
pub mod git;
pub mod guardrail;
pub mod logger;
pub mod process;
pub mod repair;
pub mod router;
pub mod static_analyzer;
pub mod status_store;
pub mod test_service;

pub use build::{BuildResult, BuildService, ProcessBuildService, ProjectBuildReport};
pub use context::{ContextBuilder, ContextPack, FileContentReader, FileSystemProvider, WalkdirContextBuilder};
pub use formatter::{FormatOutcome, FormatterService, ProcessFormatterService};
pub use git::{GitRepository, ProcessGitRepository};
pub use guardrail::{BudgetGuardrailService, GuardrailService, GuardrailValidation};
pub use logger::Logger;
pub use repair::{NullRepairService, RepairOutcome, RepairRequest, RepairService};
pub use router::{LlmRouter, NullLlmRouter, RouterOutcome};
pub use static_analyzer::{AnalysisIssue, CommandStaticAnalyzer, IssueSeverity, StaticAnalysisReport, StaticAnalyzerService};
pub use status_store::{DefaultStatusStore, StatusStore};
pub use test_service::{ProcessTestService, TestResult, TestRunConfig, TestService, TestValidation};
