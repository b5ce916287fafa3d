//! Error Analyzer: classifies a raw error string into `ErrorDetails` with
//! location hints and suggested `CorrectionStep`s.

mod languages;
mod location;

use std::collections::HashSet;

use crate::domain::{CorrectionAction, CorrectionStep, ErrorDetails, ErrorKind, ProtocolStage};

/// Classify `ErrorKind` from raw error text. Order matters: first match
/// wins.
pub fn classify(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if message.contains("TS2304") || lower.contains("cannot find name") {
        ErrorKind::Import
    } else if lower.contains("import") || lower.contains("module") {
        ErrorKind::Import
    } else if lower.contains("compile") || lower.contains("syntax error") {
        ErrorKind::Compilation
    } else if lower.contains("type") || lower.contains("cannot use") {
        ErrorKind::TypeCheck
    } else if lower.contains("lint") || lower.contains("style") {
        ErrorKind::Linting
    } else if lower.contains("test") || lower.contains("spec") {
        ErrorKind::Testing
    } else {
        ErrorKind::Compilation
    }
}

fn stage_default_tool(stage: ProtocolStage) -> &'static str {
    match stage {
        ProtocolStage::Linting => "static-analyzer",
        ProtocolStage::Building => "compiler",
        ProtocolStage::Testing => "test-runner",
        ProtocolStage::Guardrails => "guardrails",
    }
}

/// Analyze a stage failure's raw error text, producing populated
/// `ErrorDetails` per the §4.3 five-step algorithm.
pub fn analyze(stage: ProtocolStage, message: &str) -> ErrorDetails {
    let error_kind = classify(message);
    let location = location::extract(message);

    let mut details = ErrorDetails {
        stage,
        error_kind,
        message: message.to_string(),
        tool: stage_default_tool(stage).to_string(),
        severity: "error".to_string(),
        source_file: location.as_ref().map(|l| l.file.clone()),
        line_number: location.as_ref().map(|l| l.line),
        column: location.as_ref().map(|l| l.column),
        suggestions: Vec::new(),
    };

    languages::refine(&mut details, message);

    details
}

/// Propose correction steps for `details`, delegating to language
/// analyzers first, then adding one generic fallback per detected kind.
pub fn suggest_corrections(details: &ErrorDetails) -> Vec<CorrectionStep> {
    let mut steps: Vec<CorrectionStep> = languages::suggest(details);

    let target = details.source_file.clone().unwrap_or_default();
    let generic_action = match details.error_kind {
        ErrorKind::Import => Some(CorrectionAction::FixImport),
        ErrorKind::Syntax | ErrorKind::Compilation => Some(CorrectionAction::FixSyntax),
        ErrorKind::TypeCheck => Some(CorrectionAction::FixType),
        ErrorKind::Linting => Some(CorrectionAction::FormatCode),
        ErrorKind::Testing | ErrorKind::Guardrail => None,
    };
    if let Some(action) = generic_action {
        steps.push(CorrectionStep::new(action, target, format!("generic fix for {}", details.error_kind)));
    }

    let mut seen = HashSet::new();
    steps.retain(|s| seen.insert((s.action, s.target.clone())));
    steps
}
