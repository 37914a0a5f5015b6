//! Semantic migration pattern detection.
//!
//! Ten independent heuristics scan a unit's lines for control and data flow
//! shapes that do not translate mechanically to page-based processing. Each
//! heuristic reports at most once per unit; severity and the migration hint
//! are fixed per pattern.

pub mod detectors;

use crate::common::text::{code_only, strip_comments};
use crate::core::Severity;
use serde::Serialize;
use std::fmt;

/// Identifies one of the ten semantic patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternId {
    MultiRecordProcessing,
    SelectionDrivenExecution,
    MultipleExecutionModes,
    UserDecisionGated,
    ImplicitAbort,
    CrossEntitySideEffects,
    StateAccumulation,
    OutcomeDependentChaining,
    MixedResponsibilities,
    BusinessOutcomeFeedback,
}

impl PatternId {
    pub fn label(&self) -> &'static str {
        match self {
            PatternId::MultiRecordProcessing => "Multi-Record Processing",
            PatternId::SelectionDrivenExecution => "Selection-Driven Execution",
            PatternId::MultipleExecutionModes => "Multiple Execution Modes",
            PatternId::UserDecisionGated => "User-Decision-Gated Logic",
            PatternId::ImplicitAbort => "Implicit Abort/Early Exit",
            PatternId::CrossEntitySideEffects => "Cross-Entity Side Effects",
            PatternId::StateAccumulation => "State Accumulation",
            PatternId::OutcomeDependentChaining => "Outcome-Dependent Chaining",
            PatternId::MixedResponsibilities => "Mixed Responsibilities",
            PatternId::BusinessOutcomeFeedback => "Business-Outcome UI Feedback",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PatternId::MultiRecordProcessing
            | PatternId::SelectionDrivenExecution
            | PatternId::CrossEntitySideEffects
            | PatternId::StateAccumulation => Severity::Critical,
            PatternId::MultipleExecutionModes
            | PatternId::UserDecisionGated
            | PatternId::ImplicitAbort
            | PatternId::OutcomeDependentChaining => Severity::Important,
            PatternId::MixedResponsibilities | PatternId::BusinessOutcomeFeedback => {
                Severity::Info
            }
        }
    }

    pub fn apex_consideration(&self) -> &'static str {
        match self {
            PatternId::MultiRecordProcessing => {
                "Use an Interactive Grid with row-level processing or a PL/SQL loop over an APEX collection"
            }
            PatternId::SelectionDrivenExecution => {
                "Replace the selection flag with Interactive Grid row selection or a checkbox column read in a page process"
            }
            PatternId::MultipleExecutionModes => {
                "Split each mode into its own page process with a server-side condition"
            }
            PatternId::UserDecisionGated => {
                "Move the confirmation to a Dynamic Action confirm step before submitting the page"
            }
            PatternId::ImplicitAbort => {
                "Raise errors through APEX_ERROR and let page processing stop; replace GOTO with structured blocks"
            }
            PatternId::CrossEntitySideEffects => {
                "Keep the multi-table DML in one page process or a database package so it commits atomically"
            }
            PatternId::StateAccumulation => {
                "Persist accumulated state in application items or APEX collections instead of globals"
            }
            PatternId::OutcomeDependentChaining => {
                "Chain page processes with server-side conditions on a status item"
            }
            PatternId::MixedResponsibilities => {
                "Split validation, DML and messaging into separate validations, processes and notifications"
            }
            PatternId::BusinessOutcomeFeedback => {
                "Report outcomes with APEX_APPLICATION.G_PRINT_SUCCESS_MESSAGE or process success messages"
            }
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticPattern {
    pub id: PatternId,
    pub label: String,
    pub severity: Severity,
    pub description: String,
    pub line_numbers: Vec<usize>,
    pub matched_code: Vec<String>,
    pub apex_consideration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticPatternResult {
    pub patterns: Vec<SemanticPattern>,
    pub critical_count: usize,
    pub important_count: usize,
    pub info_count: usize,
}

impl SemanticPatternResult {
    fn from_patterns(patterns: Vec<SemanticPattern>) -> Self {
        let count = |severity| patterns.iter().filter(|p| p.severity == severity).count();
        Self {
            critical_count: count(Severity::Critical),
            important_count: count(Severity::Important),
            info_count: count(Severity::Info),
            patterns,
        }
    }
}

/// One line of a unit prepared for scanning.
#[derive(Debug, Clone)]
pub struct ScanLine<'a> {
    /// 1-based line number in the source file
    pub number: usize,
    pub original: &'a str,
    /// Comments removed, literals kept, uppercased
    pub code: &'a str,
    /// Comments and literal contents removed, uppercased
    pub bare: &'a str,
}

/// Prepared views of a unit shared by every detector.
#[derive(Debug)]
pub struct PatternContext<'a> {
    pub lines: Vec<ScanLine<'a>>,
    /// The whole unit with comments and literal contents removed
    pub bare_text: &'a str,
    pub first_line: usize,
}

impl<'a> PatternContext<'a> {
    pub fn new(original: &'a str, code: &'a str, bare: &'a str, first_line: usize) -> Self {
        let lines = original
            .lines()
            .zip(code.lines())
            .zip(bare.lines())
            .enumerate()
            .map(|(idx, ((original, code), bare))| ScanLine {
                number: first_line + idx,
                original,
                code,
                bare,
            })
            .collect();
        Self {
            lines,
            bare_text: bare,
            first_line,
        }
    }

    /// Indices of lines satisfying `pred`, in order.
    pub fn matching(&self, mut pred: impl FnMut(&ScanLine<'_>) -> bool) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| pred(line))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// What a detector found: a description and the indices of the lines that
/// produced the signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub description: String,
    pub lines: Vec<usize>,
}

/// Run every detector over `code`. Returns `None` when nothing fires.
pub fn detect_patterns(
    code: &str,
    first_line: usize,
    max_excerpts: usize,
) -> Option<SemanticPatternResult> {
    let stripped = strip_comments(code);
    let bare = code_only(code);
    let ctx = PatternContext::new(code, &stripped, &bare, first_line);

    let patterns: Vec<SemanticPattern> = detectors::DETECTORS
        .iter()
        .filter_map(|(id, detect)| {
            detect(&ctx).map(|finding| to_pattern(*id, finding, &ctx, max_excerpts))
        })
        .collect();

    if patterns.is_empty() {
        None
    } else {
        Some(SemanticPatternResult::from_patterns(patterns))
    }
}

fn to_pattern(
    id: PatternId,
    finding: Finding,
    ctx: &PatternContext<'_>,
    max_excerpts: usize,
) -> SemanticPattern {
    let mut indices = finding.lines;
    indices.sort_unstable();
    indices.dedup();

    SemanticPattern {
        id,
        label: id.label().to_string(),
        severity: id.severity(),
        description: finding.description,
        line_numbers: indices.iter().map(|&i| ctx.lines[i].number).collect(),
        matched_code: indices
            .iter()
            .take(max_excerpts)
            .map(|&i| ctx.lines[i].original.trim().to_string())
            .collect(),
        apex_consideration: id.apex_consideration().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_if_fires_nothing() {
        let code = "PROCEDURE p IS\nBEGIN\n  IF x THEN y; END IF;\nEND p;";
        assert_eq!(detect_patterns(code, 1, 3), None);
    }

    #[test]
    fn test_null_check_on_transaction_id_fires_nothing() {
        let code = "IF v_transaction_id IS NULL THEN x := 1; ELSE x := 2; END IF;";
        assert_eq!(detect_patterns(code, 1, 3), None);
    }

    #[test]
    fn test_counts_by_severity() {
        let code = "PROCEDURE p IS\nBEGIN\n  LOOP\n    EXIT WHEN done;\n  END LOOP;\n  GOTO finish;\nEND p;";
        let result = detect_patterns(code, 1, 3).unwrap();
        assert_eq!(result.critical_count, 1);
        assert_eq!(result.important_count, 1);
        assert_eq!(result.info_count, 0);
    }

    #[test]
    fn test_excerpts_are_capped() {
        let code = "BEGIN\n  RAISE a;\n  RAISE b;\n  RAISE c;\n  RAISE d;\nEND;";
        let result = detect_patterns(code, 20, 2).unwrap();
        let abort = &result.patterns[0];
        assert_eq!(abort.id, PatternId::ImplicitAbort);
        assert_eq!(abort.line_numbers, vec![21, 22, 23, 24]);
        assert_eq!(abort.matched_code, vec!["RAISE a;", "RAISE b;"]);
    }
}
