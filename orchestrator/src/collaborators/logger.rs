//! Logger collaborator.
//!
//! The ambient stack uses `tracing` directly throughout the crate; this
//! trait exists only where a collaborator needs to be swapped out for a
//! test double that captures messages rather than emitting them.

use async_trait::async_trait;

#[async_trait]
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Default logger: forwards to `tracing`.
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}
