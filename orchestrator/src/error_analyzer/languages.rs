//! Per-language refinement of `ErrorDetails` and correction suggestions.
//!
//! Each analyzer may set fields left unset by the generic pass and append
//! suggestions; it must never overwrite a field the generic pass already
//! populated.

use crate::domain::{CorrectionAction, CorrectionStep, ErrorDetails, ErrorKind};

fn looks_like_go(message: &str) -> bool {
    message.contains(".go:") || message.contains("undefined:") || message.contains("gofmt")
}

fn looks_like_typescript(message: &str) -> bool {
    message.contains(".ts:") || message.contains("TS") || message.contains("tsc")
}

fn looks_like_javascript(message: &str) -> bool {
    message.contains(".js:") || message.contains("eslint")
}

/// Refine `details` in place using whichever language analyzer claims the
/// message, without overwriting fields already set.
pub fn refine(details: &mut ErrorDetails, message: &str) {
    if looks_like_go(message) {
        if details.tool == "compiler" || details.tool.is_empty() {
            details.tool = "go build".to_string();
        }
        if message.contains("undefined:") && details.error_kind == ErrorKind::Compilation {
            details.error_kind = ErrorKind::Import;
        }
    } else if looks_like_typescript(message) {
        details.tool = "tsc".to_string();
    } else if looks_like_javascript(message) {
        details.tool = "eslint".to_string();
    }
}

/// Analyzer-specific correction suggestions, returned before the generic
/// fallback in `error_analyzer::suggest_corrections`.
pub fn suggest(details: &ErrorDetails) -> Vec<CorrectionStep> {
    let mut steps = Vec::new();
    let target = details.source_file.clone().unwrap_or_default();

    if details.tool == "go build" && details.error_kind == ErrorKind::Import {
        steps.push(CorrectionStep::new(
            CorrectionAction::FixImport,
            target.clone(),
            "add missing Go import",
        ));
    }
    if details.tool == "tsc" && details.error_kind == ErrorKind::TypeCheck {
        steps.push(CorrectionStep::new(
            CorrectionAction::FixType,
            target,
            "reconcile TypeScript type mismatch",
        ));
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProtocolStage;

    fn details(message: &str) -> ErrorDetails {
        ErrorDetails {
            stage: ProtocolStage::Building,
            error_kind: ErrorKind::Compilation,
            message: message.to_string(),
            tool: "compiler".to_string(),
            severity: "error".to_string(),
            source_file: Some("main.go".to_string()),
            line_number: None,
            column: None,
            suggestions: vec![],
        }
    }

    #[test]
    fn go_undefined_symbol_reclassified_as_import() {
        let mut d = details("./main.go:5:2: undefined: fmt");
        refine(&mut d, "./main.go:5:2: undefined: fmt");
        assert_eq!(d.error_kind, ErrorKind::Import);
        assert_eq!(d.tool, "go build");
    }

    #[test]
    fn typescript_sets_tool() {
        let mut d = details("app.ts:3:1: TS2322 type mismatch");
        refine(&mut d, "app.ts:3:1: TS2322 type mismatch");
        assert_eq!(d.tool, "tsc");
    }
}
