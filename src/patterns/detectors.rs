//! The ten pattern heuristics.
//!
//! Every detector reads the prepared [`PatternContext`] and returns `None`
//! when its threshold is not met. Detectors never depend on each other.

use super::{Finding, PatternContext, PatternId, ScanLine};
use crate::common::text::LineIndex;
use crate::extraction::dependencies::dml_statements;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

pub type Detector = fn(&PatternContext<'_>) -> Option<Finding>;

/// Detectors in reporting order.
pub const DETECTORS: &[(PatternId, Detector)] = &[
    (PatternId::MultiRecordProcessing, detect_multi_record),
    (PatternId::SelectionDrivenExecution, detect_selection_driven),
    (PatternId::MultipleExecutionModes, detect_execution_modes),
    (PatternId::UserDecisionGated, detect_user_decision),
    (PatternId::ImplicitAbort, detect_implicit_abort),
    (PatternId::CrossEntitySideEffects, detect_cross_entity),
    (PatternId::StateAccumulation, detect_state_accumulation),
    (PatternId::OutcomeDependentChaining, detect_outcome_chaining),
    (PatternId::MixedResponsibilities, detect_mixed_responsibilities),
    (PatternId::BusinessOutcomeFeedback, detect_outcome_feedback),
];

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":?[A-Z_][A-Z0-9_$#]*(?:\.[A-Z_][A-Z0-9_$#]*)*").unwrap());
static LOOP_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bLOOP\b").unwrap());
static LOOP_EXIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bEXIT\b|\bLAST_RECORD\b|\bNO_DATA_FOUND\b|%NOTFOUND\b|\b(?:NEXT_RECORD|FIRST_RECORD|PREVIOUS_RECORD|GO_RECORD|CURSOR_RECORD)\b",
    )
    .unwrap()
});
static CONDITION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:IF|ELSIF|AND|OR|WHEN)\b").unwrap());
static SELECTION_COMPARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(:?[A-Z_][A-Z0-9_$#]*(?:\.[A-Z_][A-Z0-9_$#]*)*)\s*=\s*(?:'Y'|'1'|'TRUE'|1\b|TRUE\b)")
        .unwrap()
});
static BRANCH_CONDITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:IF|ELSIF|WHEN|CASE)\b").unwrap());
static ELSE_BRANCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:ELSIF|ELSE)\b").unwrap());
static ALERT_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:SHOW_ALERT|FND_MESSAGE\.QUESTION)\b|\b[A-Z0-9_$#]*(?:CONFIRM|DIALOG)[A-Z0-9_$#]*\s*\(")
        .unwrap()
});
static IF_CONDITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:IF|ELSIF|CASE|WHEN)\b").unwrap());
static ABORT_FLOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(GOTO)\b|\b(RAISE(?:_APPLICATION_ERROR)?)\b|\b(RETURN)\s*;|(<<)\s*[A-Z_][A-Z0-9_$#]*\s*>>")
        .unwrap()
});
static GLOBAL_WRITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":GLOBAL\.[A-Z_][A-Z0-9_$#]*\s*:=").unwrap());
static COPY_TO_GLOBAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bCOPY\s*\([^;]*'GLOBAL\.").unwrap());
static COLLECTION_OP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(?:DELETE|EXTEND|FIRST|LAST|COUNT|EXISTS)\b").unwrap());
static INCREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z_][A-Z0-9_$#]*)\s*:=\s*([A-Z_][A-Z0-9_$#]*)\s*\+\s*1\b").unwrap()
});
static COLLECTION_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bTABLE\s+OF\b|\bVARRAY\b").unwrap());
static OUTCOME_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%ROWCOUNT\b|%FOUND\b|%NOTFOUND\b").unwrap());
static OUTCOME_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z0-9_$#]*(?:SUCCESS|_OK|STATUS|FLAG|RESULT)[A-Z0-9_$#]*\s*:=").unwrap()
});
static RETURN_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:SQLCODE|RETURN_CODE|RET_CODE|ERR_CODE|ERROR_CODE|[VLP]_RC|RC)\b").unwrap()
});
static VALIDATION_TEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bIS\s+(?:NOT\s+)?NULL\b|\bBETWEEN\b|\bLENGTH\s*\(|\bREGEXP_LIKE\b|\bINSTR\s*\(")
        .unwrap()
});
static VALIDATION_CONDITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:IF|ELSIF)\b").unwrap());
static MESSAGE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:MESSAGE|SHOW_ALERT|FND_MESSAGE\.[A-Z_]+|DBMS_OUTPUT\.PUT_LINE|APEX_ERROR\.ADD_ERROR)\s*\(",
    )
    .unwrap()
});
static PACKAGE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9_$#.:])([A-Z_][A-Z0-9_$#]*)\.[A-Z_][A-Z0-9_$#]*\s*\(").unwrap()
});
static WORKFLOW_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:CALL_FORM|OPEN_FORM|NEW_FORM|EXECUTE_TRIGGER|RUN_PRODUCT)\b").unwrap()
});
static THEN_MESSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:IF|ELSIF|WHEN)\b.*\bTHEN\b.*\b(?:MESSAGE|SHOW_ALERT|FND_MESSAGE\.[A-Z_]+)\s*\(")
        .unwrap()
});

const SELECTION_FRAGMENTS: &[&str] = &[
    "SEL", "SELECT", "SELECTED", "SELECTION", "CHECK", "CHECKED", "CHK", "FLAG", "MARK",
    "MARKED", "PICK", "PICKED", "CHOSEN", "INCLUDE", "INCLUDED",
];
const MODE_FRAGMENTS: &[&str] = &["MODE", "TYPE", "ACCESS", "ACTION", "OPERATION", "OP"];
const RESPONSE_FRAGMENTS: &[&str] = &["ALERT", "BUTTON", "RESPONSE", "ANSWER", "CHOICE", "REPLY"];
/// Packages whose calls are messaging rather than workflow.
const MESSAGING_PACKAGES: &[&str] = &["DBMS_OUTPUT", "FND_MESSAGE", "APEX_ERROR"];

/// Share of a unit, measured from the end, where outcome messages gather.
const TRAILING_SHARE: f64 = 0.3;

fn identifiers(line: &str) -> impl Iterator<Item = &str> {
    IDENTIFIER.find_iter(line).map(|m| m.as_str())
}

/// True when a `_`/`.` separated segment of `identifier` is one of
/// `fragments`, optionally followed by digits (`BUTTON1`).
fn has_fragment(identifier: &str, fragments: &[&str]) -> bool {
    identifier
        .trim_start_matches(':')
        .split(['_', '.'])
        .any(|segment| {
            fragments.iter().any(|f| {
                segment
                    .strip_prefix(f)
                    .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
            })
        })
}

/// `LOOP` that opens a loop rather than closing one with `END LOOP`.
fn opens_loop(line: &ScanLine<'_>) -> bool {
    LOOP_KEYWORD
        .find_iter(line.bare)
        .any(|m| !line.bare[..m.start()].trim_end().ends_with("END"))
}

fn merged(groups: &[&[usize]]) -> Vec<usize> {
    groups
        .iter()
        .flat_map(|g| g.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn detect_multi_record(ctx: &PatternContext<'_>) -> Option<Finding> {
    let loops = ctx.matching(opens_loop);
    let exits = ctx.matching(|l| LOOP_EXIT.is_match(l.bare));
    if loops.is_empty() || exits.is_empty() {
        return None;
    }

    Some(Finding {
        description: format!(
            "{} loop(s) iterate over records with {} exit or navigation point(s)",
            loops.len(),
            exits.len()
        ),
        lines: merged(&[&loops, &exits]),
    })
}

pub fn detect_selection_driven(ctx: &PatternContext<'_>) -> Option<Finding> {
    let mut flags = BTreeSet::new();
    let lines = ctx.matching(|l| {
        if !CONDITION_LINE.is_match(l.bare) {
            return false;
        }
        let mut hit = false;
        for caps in SELECTION_COMPARE.captures_iter(l.code) {
            let name = caps[1].trim_start_matches(':');
            if has_fragment(name, SELECTION_FRAGMENTS) {
                flags.insert(name.to_string());
                hit = true;
            }
        }
        hit
    });
    if lines.is_empty() {
        return None;
    }

    Some(Finding {
        description: format!(
            "Execution is gated on selection flag(s): {}",
            flags.into_iter().collect::<Vec<_>>().join(", ")
        ),
        lines,
    })
}

pub fn detect_execution_modes(ctx: &PatternContext<'_>) -> Option<Finding> {
    let conditions = ctx.matching(|l| {
        BRANCH_CONDITION.is_match(l.bare)
            && identifiers(l.bare)
                .filter(|id| *id != "TYPE")
                .any(|id| has_fragment(id, MODE_FRAGMENTS))
    });
    let branches = ctx.matching(|l| ELSE_BRANCH.is_match(l.bare));
    if conditions.is_empty() || branches.is_empty() {
        return None;
    }

    Some(Finding {
        description: format!(
            "Behavior branches on a mode or type value across {} alternative branch(es)",
            branches.len()
        ),
        lines: merged(&[&conditions, &branches]),
    })
}

pub fn detect_user_decision(ctx: &PatternContext<'_>) -> Option<Finding> {
    let prompts = ctx.matching(|l| ALERT_CALL.is_match(l.bare));
    if prompts.is_empty() {
        return None;
    }
    let decisions = ctx.matching(|l| {
        IF_CONDITION.is_match(l.bare)
            && (ALERT_CALL.is_match(l.bare)
                || identifiers(l.bare).any(|id| has_fragment(id, RESPONSE_FRAGMENTS)))
    });
    if decisions.is_empty() {
        return None;
    }

    Some(Finding {
        description: "Processing continues only after the user answers a prompt".to_string(),
        lines: merged(&[&prompts, &decisions]),
    })
}

pub fn detect_implicit_abort(ctx: &PatternContext<'_>) -> Option<Finding> {
    let mut kinds = BTreeSet::new();
    let lines = ctx.matching(|l| {
        let mut hit = false;
        for caps in ABORT_FLOW.captures_iter(l.bare) {
            let kind = if caps.get(1).is_some() {
                "GOTO"
            } else if let Some(raise) = caps.get(2) {
                raise.as_str()
            } else if caps.get(3).is_some() {
                "RETURN"
            } else {
                "labeled block"
            };
            kinds.insert(kind.to_string());
            hit = true;
        }
        hit
    });
    if lines.is_empty() {
        return None;
    }

    Some(Finding {
        description: format!(
            "Control leaves the normal flow via {}",
            kinds.into_iter().collect::<Vec<_>>().join(", ")
        ),
        lines,
    })
}

pub fn detect_cross_entity(ctx: &PatternContext<'_>) -> Option<Finding> {
    let statements = dml_statements(ctx.bare_text);
    let tables: BTreeSet<&str> = statements.iter().map(|s| s.table.as_str()).collect();
    if tables.len() < 2 {
        return None;
    }

    let index = LineIndex::new(ctx.bare_text, 0);
    let lines = statements.iter().map(|s| index.line_of(s.offset)).collect();

    Some(Finding {
        description: format!(
            "DML modifies {} tables in one unit: {}",
            tables.len(),
            tables.into_iter().collect::<Vec<_>>().join(", ")
        ),
        lines,
    })
}

pub fn detect_state_accumulation(ctx: &PatternContext<'_>) -> Option<Finding> {
    let mut signals = BTreeSet::new();
    let lines = ctx.matching(|l| {
        let mut found = Vec::new();
        if GLOBAL_WRITE.is_match(l.bare) || COPY_TO_GLOBAL.is_match(l.code) {
            found.push("global variable writes");
        }
        if COLLECTION_OP.is_match(l.bare) {
            found.push("collection operations");
        }
        if INCREMENT.captures_iter(l.bare).any(|caps| caps[1] == caps[2]) {
            found.push("counter increments");
        }
        if COLLECTION_DECL.is_match(l.bare) {
            found.push("collection declarations");
        }
        let hit = !found.is_empty();
        signals.extend(found);
        hit
    });
    if lines.is_empty() {
        return None;
    }

    Some(Finding {
        description: format!(
            "State accumulates across statements through {}",
            signals.into_iter().collect::<Vec<_>>().join(", ")
        ),
        lines,
    })
}

pub fn detect_outcome_chaining(ctx: &PatternContext<'_>) -> Option<Finding> {
    const MIN_SIGNALS: usize = 2;

    let lines = ctx.matching(|l| {
        OUTCOME_CHECK.is_match(l.bare) || OUTCOME_FLAG.is_match(l.bare) || RETURN_CODE.is_match(l.bare)
    });
    if lines.len() < MIN_SIGNALS {
        return None;
    }

    Some(Finding {
        description: format!(
            "Later steps depend on the outcome of earlier ones ({} outcome check(s))",
            lines.len()
        ),
        lines,
    })
}

fn is_workflow_call(line: &ScanLine<'_>) -> bool {
    WORKFLOW_CALL.is_match(line.bare)
        || PACKAGE_CALL
            .captures_iter(line.bare)
            .any(|caps| !MESSAGING_PACKAGES.contains(&&caps[1]))
}

pub fn detect_mixed_responsibilities(ctx: &PatternContext<'_>) -> Option<Finding> {
    const MIN_CATEGORIES: usize = 3;

    let validation = ctx.matching(|l| {
        (VALIDATION_CONDITION.is_match(l.bare) && VALIDATION_TEST.is_match(l.bare))
            || l.bare.contains("FORM_TRIGGER_FAILURE")
    });
    let index = LineIndex::new(ctx.bare_text, 0);
    let dml: Vec<usize> = dml_statements(ctx.bare_text)
        .iter()
        .map(|s| index.line_of(s.offset))
        .collect();
    let messaging = ctx.matching(|l| MESSAGE_CALL.is_match(l.bare));
    let workflow = ctx.matching(is_workflow_call);

    let present: Vec<&str> = [
        ("validation", &validation),
        ("data manipulation", &dml),
        ("messaging", &messaging),
        ("workflow calls", &workflow),
    ]
    .iter()
    .filter(|(_, lines)| !lines.is_empty())
    .map(|(name, _)| *name)
    .collect();

    if present.len() < MIN_CATEGORIES {
        return None;
    }

    Some(Finding {
        description: format!("One unit combines {}", present.join(", ")),
        lines: merged(&[&validation, &dml, &messaging, &workflow]),
    })
}

fn is_conditional_message(ctx: &PatternContext<'_>, idx: usize) -> bool {
    if THEN_MESSAGE.is_match(ctx.lines[idx].bare) {
        return true;
    }
    ctx.lines[..idx]
        .iter()
        .rev()
        .map(|l| l.bare.trim())
        .find(|text| !text.is_empty())
        .is_some_and(|prev| prev.ends_with("THEN") || prev.ends_with("ELSE"))
}

pub fn detect_outcome_feedback(ctx: &PatternContext<'_>) -> Option<Finding> {
    let messages = ctx.matching(|l| MESSAGE_CALL.is_match(l.bare));
    if messages.is_empty() {
        return None;
    }

    let trailing_start = ((ctx.lines.len() as f64) * (1.0 - TRAILING_SHARE)).floor() as usize;
    let trailing = messages.iter().filter(|&&idx| idx >= trailing_start).count();
    let conditional: Vec<usize> = messages
        .iter()
        .copied()
        .filter(|&idx| is_conditional_message(ctx, idx))
        .collect();

    if trailing * 2 > messages.len() {
        Some(Finding {
            description: format!(
                "{} of {} message(s) report the outcome at the end of the unit",
                trailing,
                messages.len()
            ),
            lines: messages,
        })
    } else if !conditional.is_empty() {
        Some(Finding {
            description: format!(
                "{} message(s) are shown conditionally on a business outcome",
                conditional.len()
            ),
            lines: conditional,
        })
    } else {
        None
    }
}
