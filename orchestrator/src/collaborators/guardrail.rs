//! Guardrail Service collaborator.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::Budgets;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailValidation {
    pub valid: bool,
    pub error: Option<String>,
}

#[async_trait]
pub trait GuardrailService: Send + Sync {
    async fn validate_task(&self, task_id: &str, files: &[String], lines_changed: u32) -> Result<GuardrailValidation>;
    async fn enable_ephemeral_mode(&self, task_id: &str, task_type: &str, duration: Duration) -> Result<()>;
    async fn disable_ephemeral_mode(&self) -> Result<()>;
}

struct EphemeralWindow {
    #[allow(dead_code)]
    task_id: String,
    #[allow(dead_code)]
    task_type: String,
    expires_at: Instant,
}

/// Enforces per-task `Budgets` (max changed files, max changed lines).
/// While an ephemeral window is active and unexpired, every task is
/// waved through regardless of budget — `scaffold`/`deps_fix` tasks are
/// expected to touch more than the ordinary ceiling allows.
pub struct BudgetGuardrailService {
    budgets: RwLock<HashMap<String, Budgets>>,
    ephemeral: RwLock<Option<EphemeralWindow>>,
}

impl BudgetGuardrailService {
    pub fn new() -> Self {
        Self {
            budgets: RwLock::new(HashMap::new()),
            ephemeral: RwLock::new(None),
        }
    }

    pub async fn register_budget(&self, task_id: impl Into<String>, budgets: Budgets) {
        self.budgets.write().await.insert(task_id.into(), budgets);
    }

    async fn ephemeral_active(&self) -> bool {
        match self.ephemeral.read().await.as_ref() {
            Some(window) => window.expires_at > Instant::now(),
            None => false,
        }
    }
}

impl Default for BudgetGuardrailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuardrailService for BudgetGuardrailService {
    async fn validate_task(&self, task_id: &str, files: &[String], lines_changed: u32) -> Result<GuardrailValidation> {
        if self.ephemeral_active().await {
            return Ok(GuardrailValidation { valid: true, error: None });
        }
        let Some(budgets) = self.budgets.read().await.get(task_id).copied() else {
            return Ok(GuardrailValidation { valid: true, error: None });
        };
        if budgets.max_files > 0 && files.len() as u32 > budgets.max_files {
            return Ok(GuardrailValidation {
                valid: false,
                error: Some(format!(
                    "changed {} files, budget allows {}",
                    files.len(),
                    budgets.max_files
                )),
            });
        }
        if budgets.max_changed_lines > 0 && lines_changed > budgets.max_changed_lines {
            return Ok(GuardrailValidation {
                valid: false,
                error: Some(format!(
                    "changed {lines_changed} lines, budget allows {}",
                    budgets.max_changed_lines
                )),
            });
        }
        Ok(GuardrailValidation { valid: true, error: None })
    }

    async fn enable_ephemeral_mode(&self, task_id: &str, task_type: &str, duration: Duration) -> Result<()> {
        *self.ephemeral.write().await = Some(EphemeralWindow {
            task_id: task_id.to_string(),
            task_type: task_type.to_string(),
            expires_at: Instant::now() + duration,
        });
        Ok(())
    }

    async fn disable_ephemeral_mode(&self) -> Result<()> {
        *self.ephemeral.write().await = None;
        Ok(())
    }
}
