//! Per-unit extraction.
//!
//! Extraction runs in two stages. Stage one turns each [`UnitBoundary`] into
//! an [`ExtractedUnit`] independently of every other unit. Stage two,
//! [`resolve_called_procedures`], needs the registry of all unit names in
//! the file and only fills `dependencies.called_procedures`.

pub mod boundary;
pub mod builtins;
pub mod checklist;
pub mod dependencies;
pub mod signature;

pub use boundary::{extract_boundaries, UnitBoundary};
pub use builtins::{comment_out_builtins, BuiltinVocabulary, CommentedBuiltin};
pub use checklist::{build_checklist, ChecklistCategory, ChecklistItem};
pub use dependencies::{CursorInfo, UnitDependencies};
pub use signature::{parse_signature, Parameter, ParameterMode, UnitSignature};

use crate::classification::scoring::UnitComplexity;
use crate::core::UnitType;
use crate::patterns::{detect_patterns, SemanticPatternResult};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedUnit {
    pub name: String,
    pub unit_type: UnitType,
    pub start_line: usize,
    pub end_line: usize,
    pub terminated: bool,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub original_code: String,
    pub apex_safe_code: String,
    pub commented_builtins: Vec<CommentedBuiltin>,
    pub dependencies: UnitDependencies,
    pub checklist: Vec<ChecklistItem>,
    pub complexity: UnitComplexity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_patterns: Option<SemanticPatternResult>,
}

impl ExtractedUnit {
    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

/// Stage one for a single unit. `lines` are all lines of the source file.
pub fn extract_unit(
    boundary: &UnitBoundary,
    lines: &[&str],
    vocabulary: &BuiltinVocabulary,
    max_excerpts: usize,
) -> ExtractedUnit {
    let start = boundary.start_line.saturating_sub(1).min(lines.len());
    let end = boundary.end_line.min(lines.len()).max(start);
    let original_code = lines[start..end].join("\n");

    let signature = parse_signature(&original_code, boundary.unit_type);
    let commented = comment_out_builtins(&original_code, boundary.start_line, vocabulary);
    let dependencies =
        UnitDependencies::extract(&original_code, vocabulary.is_called_in(&original_code));
    let semantic_patterns = detect_patterns(&original_code, boundary.start_line, max_excerpts);
    let checklist = build_checklist(
        &boundary.name,
        &commented.builtins,
        &dependencies,
        semantic_patterns
            .as_ref()
            .map_or(&[][..], |result| result.patterns.as_slice()),
    );

    ExtractedUnit {
        name: boundary.name.clone(),
        unit_type: boundary.unit_type,
        start_line: boundary.start_line,
        end_line: boundary.end_line,
        terminated: boundary.terminated,
        parameters: signature.parameters,
        return_type: signature.return_type,
        complexity: UnitComplexity::measure(&original_code),
        original_code,
        apex_safe_code: commented.code,
        commented_builtins: commented.builtins,
        dependencies,
        checklist,
        semantic_patterns,
    }
}

/// Stage two: fill `called_procedures` for every unit from the file's name
/// registry. Self-calls are excluded; nothing else is touched.
pub fn resolve_called_procedures(units: Vec<ExtractedUnit>) -> Vec<ExtractedUnit> {
    let registry: BTreeSet<String> = units.iter().map(|u| u.name.clone()).collect();

    units
        .into_iter()
        .map(|mut unit| {
            unit.dependencies.called_procedures = dependencies::call_sites(&unit.original_code)
                .intersection(&registry)
                .filter(|name| **name != unit.name)
                .cloned()
                .collect();
            unit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_all(source: &str) -> Vec<ExtractedUnit> {
        let vocabulary = BuiltinVocabulary::standard();
        let lines: Vec<&str> = source.lines().collect();
        let units = extract_boundaries(source)
            .iter()
            .map(|b| extract_unit(b, &lines, &vocabulary, 3))
            .collect();
        resolve_called_procedures(units)
    }

    #[test]
    fn test_unit_code_and_safe_code() {
        let source = "PROCEDURE nav IS\nBEGIN\n  GO_BLOCK('EMP');\nEND nav;";
        let units = extract_all(source);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].original_code, source);
        assert!(units[0].apex_safe_code.contains("-- GO_BLOCK('EMP');"));
        assert_eq!(units[0].commented_builtins[0].line, 3);
        assert!(units[0].dependencies.has_forms_builtins);
        assert_eq!(units[0].line_count(), 4);
    }

    #[test]
    fn test_called_procedures_resolved_against_registry() {
        let source = "PROCEDURE a IS\nBEGIN\n  b(1);\n  c;\n  a;\n  unknown_proc(2);\nEND a;\nPROCEDURE b(p NUMBER) IS\nBEGIN\n  NULL;\nEND b;\nPROCEDURE c IS\nBEGIN\n  b(2);\nEND c;";
        let units = extract_all(source);
        assert_eq!(units[0].dependencies.called_procedures, vec!["B", "C"]);
        assert!(units[1].dependencies.called_procedures.is_empty());
        assert_eq!(units[2].dependencies.called_procedures, vec!["B"]);
    }

    #[test]
    fn test_checklist_and_patterns_attached() {
        let source = "PROCEDURE p1 IS BEGIN INSERT INTO t1 VALUES (1); UPDATE t2 SET x = 1; END p1;";
        let units = extract_all(source);
        let patterns = units[0].semantic_patterns.as_ref().unwrap();
        assert!(patterns
            .patterns
            .iter()
            .any(|p| p.label == "Cross-Entity Side Effects"));
        assert!(units[0]
            .checklist
            .iter()
            .any(|item| item.category == ChecklistCategory::Pattern));
    }
}
