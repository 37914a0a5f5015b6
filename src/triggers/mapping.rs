//! Target-platform mapping and code rewriting for triggers.

use super::TriggerCategory;
use crate::common::text::code_only;
use crate::config::TargetConfig;
use crate::extraction::BuiltinVocabulary;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static INCOMPATIBLE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(SYNCHRONIZE)\b|\b(FORMS_OLE)\b|\b(HOST)\s*\(").unwrap());

static STATE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(GLOBAL|PARAMETER)\.([A-Z_][A-Z0-9_$#]*)\s*:=").unwrap()
});

static STATE_READ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":(GLOBAL|PARAMETER)\.([A-Z_][A-Z0-9_$#]*)").unwrap());

static ITEM_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9_$#:]):([A-Z_][A-Z0-9_$#]*)\.([A-Z_][A-Z0-9_$#]*)").unwrap()
});

/// Bind prefixes that are not block names.
const RESERVED_PREFIXES: &[&str] = &["GLOBAL", "PARAMETER", "SYSTEM", "NEW", "OLD", "PARENT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetConstruct {
    #[serde(rename = "Page Process")]
    PageProcess,
    Computation,
    Validation,
    #[serde(rename = "Dynamic Action")]
    DynamicAction,
    Branch,
    #[serde(rename = "Error Handler")]
    ErrorHandler,
}

impl fmt::Display for TargetConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetConstruct::PageProcess => "Page Process",
            TargetConstruct::Computation => "Computation",
            TargetConstruct::Validation => "Validation",
            TargetConstruct::DynamicAction => "Dynamic Action",
            TargetConstruct::Branch => "Branch",
            TargetConstruct::ErrorHandler => "Error Handler",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Full,
    Partial,
    Manual,
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportLevel::Full => write!(f, "full"),
            SupportLevel::Partial => write!(f, "partial"),
            SupportLevel::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetMapping {
    pub construct: TargetConstruct,
    pub point: String,
    pub support_level: SupportLevel,
    pub instructions: Vec<String>,
    pub transformed_code: String,
}

struct CategoryTarget {
    construct: TargetConstruct,
    point: &'static str,
    support: SupportLevel,
    instruction: &'static str,
}

fn category_target(category: TriggerCategory) -> CategoryTarget {
    use SupportLevel::*;
    use TargetConstruct::*;

    let (construct, point, support, instruction) = match category {
        TriggerCategory::PreRender => (
            Computation,
            "Before Header",
            Full,
            "Create a Before Header computation or process that sets the initial item values",
        ),
        TriggerCategory::PostQuery => (
            PageProcess,
            "After Header",
            Partial,
            "Fold derived columns into the region query or compute them in an After Header process",
        ),
        TriggerCategory::Validation => (
            Validation,
            "Before Submit",
            Full,
            "Create a PL/SQL Function Body (returning error text) validation on the item",
        ),
        TriggerCategory::UserAction => (
            DynamicAction,
            "On Event",
            Partial,
            "Create a Dynamic Action on the triggering element; move server logic into an Execute Server-side Code action",
        ),
        TriggerCategory::PreDml => (
            PageProcess,
            "Processing",
            Partial,
            "Run the logic in a process sequenced before the Automatic Row Processing process",
        ),
        TriggerCategory::PostDml => (
            PageProcess,
            "After Processing",
            Partial,
            "Run the logic in a process sequenced after the Automatic Row Processing process",
        ),
        TriggerCategory::Commit => (
            PageProcess,
            "Processing",
            Full,
            "Page submission commits automatically; keep any extra logic in a Processing process",
        ),
        TriggerCategory::Navigation => (
            Branch,
            "After Processing",
            Partial,
            "Replace navigation with a page branch or a Dynamic Action that sets focus",
        ),
        TriggerCategory::Error => (
            ErrorHandler,
            "Error Handling Function",
            Manual,
            "Rewrite as an application error handling function",
        ),
        TriggerCategory::Unknown => (
            PageProcess,
            "Processing",
            Manual,
            "Review the trigger and choose a target construct manually",
        ),
    };

    CategoryTarget {
        construct,
        point,
        support,
        instruction,
    }
}

/// Calls with no target equivalent found in `code`, in first-seen order.
pub fn incompatible_calls(code: &str) -> Vec<&'static str> {
    let bare = code_only(code);
    let mut found = Vec::new();
    for caps in INCOMPATIBLE_CALL.captures_iter(&bare) {
        let name = if caps.get(1).is_some() {
            "SYNCHRONIZE"
        } else if caps.get(2).is_some() {
            "FORMS_OLE"
        } else {
            "HOST"
        };
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

pub fn map_trigger(
    category: TriggerCategory,
    code: &str,
    vocabulary: &BuiltinVocabulary,
    target: &TargetConfig,
) -> TargetMapping {
    let base = category_target(category);
    let mut support_level = base.support;
    let mut instructions = vec![base.instruction.to_string()];

    for name in incompatible_calls(code) {
        support_level = SupportLevel::Manual;
        instructions.push(format!(
            "WARNING: {name} has no APEX equivalent; this trigger must be redesigned manually"
        ));
    }

    TargetMapping {
        construct: base.construct,
        point: base.point.to_string(),
        support_level,
        instructions,
        transformed_code: transform_code(code, vocabulary, target),
    }
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

fn session_name(kind: &str, name: &str, target: &TargetConfig) -> String {
    let prefix = if kind == "GLOBAL" {
        &target.global_prefix
    } else {
        &target.parameter_prefix
    };
    format!("{prefix}{name}")
}

/// Rewrite placeholder syntax for the target platform.
///
/// `:GLOBAL.X := e;` becomes a session state setter, other `:GLOBAL.X` and
/// `:PARAMETER.X` reads become `V('...')`, and `:BLOCK.ITEM` becomes the
/// page item with the original kept in a trailing comment. Lines calling a
/// Forms builtin are annotated, never removed.
pub fn transform_code(code: &str, vocabulary: &BuiltinVocabulary, target: &TargetConfig) -> String {
    let bare = code_only(code);
    let mut edits: Vec<Edit> = Vec::new();

    for caps in STATE_ASSIGNMENT.captures_iter(&bare) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(semicolon) = bare[whole.end()..].find(';').map(|p| whole.end() + p) else {
            continue;
        };
        edits.push(Edit {
            start: whole.start(),
            end: whole.end(),
            replacement: format!(
                "APEX_UTIL.SET_SESSION_STATE('{}',",
                session_name(&caps[1], &caps[2], target)
            ),
        });
        edits.push(Edit {
            start: semicolon,
            end: semicolon + 1,
            replacement: ");".to_string(),
        });
    }

    for caps in STATE_READ.captures_iter(&bare) {
        let Some(whole) = caps.get(0) else { continue };
        edits.push(Edit {
            start: whole.start(),
            end: whole.end(),
            replacement: format!("V('{}')", session_name(&caps[1], &caps[2], target)),
        });
    }

    for caps in ITEM_REFERENCE.captures_iter(&bare) {
        let (Some(block), Some(item)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if RESERVED_PREFIXES.contains(&block.as_str()) {
            continue;
        }
        let start = block.start() - 1;
        edits.push(Edit {
            start,
            end: item.end(),
            replacement: format!(
                ":P{}_{} /* {} */",
                target.page_number,
                item.as_str(),
                &code[start..item.end()]
            ),
        });
    }

    // Assignments are pushed first, so a read at the same offset loses.
    edits.sort_by_key(|e| e.start);
    let mut kept: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if kept.last().map_or(true, |last| edit.start >= last.end) {
            kept.push(edit);
        }
    }

    let mut rewritten = code.to_string();
    for edit in kept.iter().rev() {
        rewritten.replace_range(edit.start..edit.end, &edit.replacement);
    }

    annotate_builtins(&rewritten, vocabulary)
}

fn annotate_builtins(code: &str, vocabulary: &BuiltinVocabulary) -> String {
    // Masked as a whole so lines inside a multi-line comment stay blank.
    let masked = code_only(code);
    let mut out: Vec<String> = code
        .lines()
        .zip(masked.lines())
        .map(|(line, masked_line)| match vocabulary.calls_in(masked_line).first() {
            Some(name) => format!(
                "{line}  -- MANUAL REPLACEMENT: {name}: {}",
                vocabulary.reason_for(name)
            ),
            None => line.to_string(),
        })
        .collect();
    if code.ends_with('\n') {
        out.push(String::new());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TargetConfig {
        TargetConfig::default()
    }

    #[test]
    fn test_validation_trigger_maps_to_validation() {
        let mapping = map_trigger(
            TriggerCategory::Validation,
            "IF :EMP.SAL < 0 THEN RAISE FORM_TRIGGER_FAILURE; END IF;",
            &BuiltinVocabulary::standard(),
            &config(),
        );
        assert_eq!(mapping.construct, TargetConstruct::Validation);
        assert_eq!(mapping.point, "Before Submit");
        assert_eq!(mapping.support_level, SupportLevel::Full);
    }

    #[test]
    fn test_incompatible_call_forces_manual() {
        let mapping = map_trigger(
            TriggerCategory::PreRender,
            "BEGIN\n  FORMS_OLE.ACTIVATE_SERVER(:BLK.OLE);\nEND;",
            &BuiltinVocabulary::standard(),
            &config(),
        );
        assert_eq!(mapping.support_level, SupportLevel::Manual);
        assert!(mapping
            .instructions
            .last()
            .is_some_and(|i| i.starts_with("WARNING: FORMS_OLE")));
    }

    #[test]
    fn test_builtins_inside_block_comment_are_not_annotated() {
        let code = "/* old flow:\n   GO_BLOCK('EMP');\n*/\nEXECUTE_QUERY;";
        let out = transform_code(code, &BuiltinVocabulary::standard(), &config());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "   GO_BLOCK('EMP');");
        assert!(lines[3].starts_with("EXECUTE_QUERY;  -- MANUAL REPLACEMENT: EXECUTE_QUERY"));
    }

    #[test]
    fn test_global_assignment_and_reads() {
        let code = ":GLOBAL.user_id := :PARAMETER.p_user;\nx := :global.user_id;";
        let out = transform_code(code, &BuiltinVocabulary::standard(), &config());
        assert_eq!(
            out,
            "APEX_UTIL.SET_SESSION_STATE('G_USER_ID', V('PARAM_P_USER'));\nx := V('G_USER_ID');"
        );
    }

    #[test]
    fn test_item_reference_keeps_original() {
        let target = TargetConfig {
            page_number: 10,
            ..TargetConfig::default()
        };
        let out = transform_code("v := :emp.sal * 2;", &BuiltinVocabulary::standard(), &target);
        assert_eq!(out, "v := :P10_SAL /* :emp.sal */ * 2;");
    }

    #[test]
    fn test_literals_and_system_vars_untouched() {
        let code = "msg := ':EMP.SAL'; IF :SYSTEM.MODE = 'X' THEN NULL; END IF;";
        let out = transform_code(code, &BuiltinVocabulary::standard(), &config());
        assert_eq!(out, code);
    }

    #[test]
    fn test_builtin_lines_annotated() {
        let out = transform_code("GO_BLOCK('EMP');\nNULL;\n", &BuiltinVocabulary::standard(), &config());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("GO_BLOCK('EMP');  -- MANUAL REPLACEMENT: GO_BLOCK:"));
        assert_eq!(lines[1], "NULL;");
        assert!(out.ends_with('\n'));
    }
}
