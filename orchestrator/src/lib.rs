//! Core library for `taskctl`: an autonomous code-change orchestrator
//! that drives staged verification pipelines with bounded self-correction.

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod correction;
pub mod domain;
pub mod error;
pub mod error_analyzer;
pub mod events;
pub mod pipeline;
pub mod protocol;
pub mod reports;
pub mod supervisor;
pub mod taskflow;

pub use error::{OrchestratorError, Result};
