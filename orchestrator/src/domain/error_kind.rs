//! Error classification and correction types shared by the Error Analyzer
//! and Correction Engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::protocol::ProtocolStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Compilation,
    Syntax,
    TypeCheck,
    Import,
    Linting,
    Testing,
    Guardrail,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compilation => write!(f, "compilation"),
            Self::Syntax => write!(f, "syntax"),
            Self::TypeCheck => write!(f, "type_check"),
            Self::Import => write!(f, "import"),
            Self::Linting => write!(f, "linting"),
            Self::Testing => write!(f, "testing"),
            Self::Guardrail => write!(f, "guardrail"),
        }
    }
}

impl ErrorKind {
    /// The kind a stage naturally implies when the analyzer can't tell
    /// anything more specific from the error text.
    pub fn natural_for_stage(stage: ProtocolStage) -> Self {
        match stage {
            ProtocolStage::Linting => Self::Linting,
            ProtocolStage::Building => Self::Compilation,
            ProtocolStage::Testing => Self::Testing,
            ProtocolStage::Guardrails => Self::Guardrail,
        }
    }
}

/// Diagnostic information extracted from a failed stage's raw error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub stage: ProtocolStage,
    pub error_kind: ErrorKind,
    pub message: String,
    pub tool: String,
    pub severity: String,
    pub source_file: Option<String>,
    pub line_number: Option<u32>,
    pub column: Option<u32>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionAction {
    FixImport,
    FixSyntax,
    FixType,
    AddMissingCode,
    RemoveCode,
    FormatCode,
    UpdateTest,
}

impl CorrectionAction {
    /// Higher runs first in the Correction Engine's stable sort.
    pub fn priority(self) -> u32 {
        match self {
            Self::FixImport => 100,
            Self::FixSyntax => 90,
            Self::FormatCode => 80,
            Self::FixType => 70,
            Self::AddMissingCode => 60,
            Self::UpdateTest => 50,
            Self::RemoveCode => 40,
        }
    }
}

impl std::fmt::Display for CorrectionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FixImport => "fix_import",
            Self::FixSyntax => "fix_syntax",
            Self::FixType => "fix_type",
            Self::AddMissingCode => "add_missing_code",
            Self::RemoveCode => "remove_code",
            Self::FormatCode => "format_code",
            Self::UpdateTest => "update_test",
        };
        write!(f, "{s}")
    }
}

/// One proposed (and, after application, recorded) correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionStep {
    pub action: CorrectionAction,
    pub target: String,
    pub description: String,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub result: String,
}

impl CorrectionStep {
    pub fn new(action: CorrectionAction, target: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            description: description.into(),
            applied: false,
            result: String::new(),
        }
    }
}

/// Aggregate outcome of applying a sequence of `CorrectionStep`s.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorrectionResult {
    pub success: bool,
    pub message: String,
    files_changed: BTreeSet<String>,
}

impl CorrectionResult {
    pub fn files_changed(&self) -> &BTreeSet<String> {
        &self.files_changed
    }

    pub fn mark_changed(&mut self, path: impl Into<String>) {
        self.files_changed.insert(path.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_fix_import_first() {
        assert!(CorrectionAction::FixImport.priority() > CorrectionAction::FixSyntax.priority());
        assert!(CorrectionAction::FixSyntax.priority() > CorrectionAction::FormatCode.priority());
        assert!(CorrectionAction::RemoveCode.priority() < CorrectionAction::UpdateTest.priority());
    }

    #[test]
    fn correction_result_files_changed_is_a_set() {
        let mut result = CorrectionResult::default();
        result.mark_changed("a.go");
        result.mark_changed("a.go");
        result.mark_changed("b.go");
        assert_eq!(result.files_changed().len(), 2);
    }

    #[test]
    fn natural_kind_per_stage() {
        assert_eq!(ErrorKind::natural_for_stage(ProtocolStage::Linting), ErrorKind::Linting);
        assert_eq!(ErrorKind::natural_for_stage(ProtocolStage::Building), ErrorKind::Compilation);
        assert_eq!(ErrorKind::natural_for_stage(ProtocolStage::Testing), ErrorKind::Testing);
        assert_eq!(ErrorKind::natural_for_stage(ProtocolStage::Guardrails), ErrorKind::Guardrail);
    }
}
