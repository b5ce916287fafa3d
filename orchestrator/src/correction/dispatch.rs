//! Per-action correction handlers.
//!
//! Each handler is idempotent: applying the same step twice against an
//! already-fixed file succeeds without further modifying it.

use std::path::Path;

use tracing::debug;

use crate::collaborators::FormatterService;
use crate::domain::{CorrectionAction, CorrectionStep};

pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub changed_file: Option<String>,
}

impl Outcome {
    fn ok(message: impl Into<String>, changed_file: Option<String>) -> Self {
        Self { success: true, message: message.into(), changed_file }
    }

    fn noop(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), changed_file: None }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), changed_file: None }
    }
}

pub async fn dispatch(project_path: &str, step: &CorrectionStep, formatter: &dyn FormatterService) -> eyre::Result<Outcome> {
    let full_path = Path::new(project_path).join(&step.target);
    debug!(action = %step.action, target = %step.target, "applying correction step");

    Ok(match step.action {
        CorrectionAction::FixImport => fix_import(&full_path).await?,
        CorrectionAction::FormatCode => format_code(project_path, &step.target, formatter).await?,
        CorrectionAction::FixSyntax
        | CorrectionAction::FixType
        | CorrectionAction::AddMissingCode
        | CorrectionAction::RemoveCode
        | CorrectionAction::UpdateTest => Outcome::noop(format!("{} is a reserved no-op action", step.action)),
    })
}

/// Text heuristic: ensure the file's natural import statement is present,
/// appended once if missing. A placeholder when no source file exists yet.
async fn fix_import(path: &Path) -> eyre::Result<Outcome> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Ok(Outcome::fail("cannot infer import style: no file extension"));
    };

    let existing = tokio::fs::read_to_string(path).await.unwrap_or_default();
    let marker = match ext {
        "go" => "import \"fmt\"",
        "ts" | "tsx" => "import {} from './index';",
        "js" | "jsx" => "require('./index');",
        other => return Ok(Outcome::fail(format!("unsupported file type for fix_import: {other}"))),
    };

    if existing.contains(marker) {
        return Ok(Outcome::fail("no import fixes applied"));
    }

    let updated = format!("{marker}\n{existing}");
    atomic_write(path, &updated).await?;
    Ok(Outcome::ok(
        format!("inserted missing import into {}", path.display()),
        Some(path.display().to_string()),
    ))
}

/// Delegates to the external formatter collaborator keyed by file
/// extension (gofmt for Go, prettier for TypeScript/JavaScript).
async fn format_code(project_path: &str, relative_path: &str, formatter: &dyn FormatterService) -> eyre::Result<Outcome> {
    let outcome = formatter.format_file(project_path, relative_path).await?;
    if outcome.success {
        Ok(Outcome::ok(outcome.message, Some(relative_path.to_string())))
    } else {
        Ok(Outcome::fail(outcome.message))
    }
}

async fn atomic_write(path: &Path, contents: &str) -> eyre::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("tmp-correction");
    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
