//! File System Provider / File Content Reader / Context Builder
//! collaborators.
//!
//! File tree enumeration and file-content reading are out of scope for the
//! core (spec §1); these traits exist only as the contracted seam the
//! Supervisor calls through to build a `ContextPack` before asking the LLM
//! Router for a policy. The core never reads files itself.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &str, bytes: &[u8]) -> Result<()>;
    async fn mkdir_all(&self, path: &str) -> Result<()>;
    async fn stat(&self, path: &str) -> Result<bool>;
}

#[async_trait]
pub trait FileContentReader: Send + Sync {
    /// Read every path relative to `root`, returning `relPath -> content`.
    async fn read_contents(&self, paths: &[String], root: &str) -> Result<HashMap<String, String>>;
}

/// Unfiltered project context handed to the LLM Router. Per the spec's
/// resolved open question, this returns everything; callers enforce
/// budgets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextPack {
    pub task_description: String,
    pub files: HashMap<String, String>,
}

#[async_trait]
pub trait ContextBuilder: Send + Sync {
    async fn build_context(&self, task_description: &str, project_path: &str) -> Result<ContextPack>;
}

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", "dist", "build", ".taskctl"];

/// Walks the project tree and reads every text file verbatim. Per the
/// spec's resolved open question this returns everything unfiltered;
/// budget enforcement happens downstream, not here.
pub struct WalkdirContextBuilder;

impl WalkdirContextBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WalkdirContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextBuilder for WalkdirContextBuilder {
    async fn build_context(&self, task_description: &str, project_path: &str) -> Result<ContextPack> {
        let root = Path::new(project_path);
        let mut files = HashMap::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| !SKIP_DIRS.contains(&name))
                    .unwrap_or(true)
            })
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
                continue;
            };
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            files.insert(rel, content);
        }
        Ok(ContextPack {
            task_description: task_description.to_string(),
            files,
        })
    }
}
