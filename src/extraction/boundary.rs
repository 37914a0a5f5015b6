//! Program unit boundary detection.
//!
//! Boundaries are found with line-oriented heuristics rather than a full
//! PL/SQL grammar. Each `PROCEDURE`/`FUNCTION` declaration starts a
//! candidate; its end is the line where the `BEGIN`/`END` nesting returns to
//! zero, or the line carrying its own `END <name>;`. The search for one unit
//! never runs past the start of the next candidate.

use crate::common::text::code_only;
use crate::core::UnitType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

static SUBPROGRAM_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:NON)?EDITIONABLE\s+)?)?(PROCEDURE|FUNCTION)\s+([A-Z][A-Z0-9_$#]*(?:\s*\.\s*[A-Z][A-Z0-9_$#]*)?)",
    )
    .unwrap()
});

static PACKAGE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:NON)?EDITIONABLE\s+)?)?PACKAGE\s+(BODY\s+)?([A-Z][A-Z0-9_$#]*(?:\s*\.\s*[A-Z][A-Z0-9_$#]*)?)",
    )
    .unwrap()
});

static HEADER_TERMINATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:IS|AS)\b|;").unwrap());

static BLOCK_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:BEGIN|END|CASE)\b").unwrap());

static INNER_BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+(?:IF|LOOP)\b").unwrap());

/// How far ahead a declaration header is searched for `IS`/`AS`.
const MAX_HEADER_LINES: usize = 40;

/// Line range occupied by one program unit (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitBoundary {
    pub name: String,
    pub unit_type: UnitType,
    pub start_line: usize,
    pub end_line: usize,
    /// False when no terminating `END` was found and the unit was closed at
    /// the next candidate or end of file.
    pub terminated: bool,
}

#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    unit_type: UnitType,
    line: usize,
}

/// Locate every procedure, function and self-contained package section in
/// `source`, in file order.
pub fn extract_boundaries(source: &str) -> Vec<UnitBoundary> {
    let masked = code_only(source);
    let lines: Vec<&str> = masked.lines().collect();
    let candidates = find_candidates(&lines);

    candidates
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| {
            let bound = candidates
                .get(i + 1)
                .map_or(lines.len(), |next| next.line);
            close_candidate(&lines, candidate, bound)
        })
        .collect()
}

fn close_candidate(lines: &[&str], candidate: &Candidate, bound: usize) -> Option<UnitBoundary> {
    match find_unit_end(lines, candidate, bound) {
        Some(end) => Some(UnitBoundary {
            name: candidate.name.clone(),
            unit_type: candidate.unit_type,
            start_line: candidate.line + 1,
            end_line: end + 1,
            terminated: true,
        }),
        // A package header that is not closed before the next subprogram
        // contains members; the members are the units.
        None if candidate.unit_type.is_package() => {
            debug!(package = %candidate.name, "package contains subprograms, not emitted as a unit");
            None
        }
        None => {
            warn!(
                unit = %candidate.name,
                line = candidate.line + 1,
                "no terminating END found, closing unit at next boundary"
            );
            Some(UnitBoundary {
                name: candidate.name.clone(),
                unit_type: candidate.unit_type,
                start_line: candidate.line + 1,
                end_line: bound,
                terminated: false,
            })
        }
    }
}

fn find_candidates(lines: &[&str]) -> Vec<Candidate> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            if let Some(caps) = SUBPROGRAM_DECL.captures(line) {
                let header_start = caps.get(0).map_or(0, |m| m.end());
                if is_forward_declaration(lines, idx, header_start) {
                    return None;
                }
                let unit_type = if &caps[1] == "PROCEDURE" {
                    UnitType::Procedure
                } else {
                    UnitType::Function
                };
                return Some(Candidate {
                    name: normalize_name(&caps[2]),
                    unit_type,
                    line: idx,
                });
            }

            PACKAGE_DECL.captures(line).map(|caps| Candidate {
                name: normalize_name(&caps[2]),
                unit_type: if caps.get(1).is_some() {
                    UnitType::PackageBody
                } else {
                    UnitType::PackageSpec
                },
                line: idx,
            })
        })
        .collect()
}

/// Strip a schema qualifier and surrounding whitespace from a unit name.
fn normalize_name(raw: &str) -> String {
    raw.rsplit('.').next().unwrap_or(raw).trim().to_string()
}

/// A declaration whose header reaches `;` before `IS`/`AS` is a forward
/// declaration or a package-spec signature, never a unit body.
fn is_forward_declaration(lines: &[&str], idx: usize, column: usize) -> bool {
    lines
        .iter()
        .enumerate()
        .skip(idx)
        .take(MAX_HEADER_LINES)
        .find_map(|(i, line)| {
            let segment = if i == idx {
                line.get(column..).unwrap_or("")
            } else {
                line
            };
            HEADER_TERMINATOR.find(segment).map(|m| m.as_str() == ";")
        })
        .unwrap_or(false)
}

/// True when the keyword at `pos` is directly preceded by the word `END`.
fn preceded_by_end(line: &str, pos: usize) -> bool {
    let before = line[..pos].trim_end();
    before.ends_with("END")
        && !before[..before.len() - 3]
            .chars()
            .next_back()
            .is_some_and(crate::common::text::is_ident_char)
}

fn find_unit_end(lines: &[&str], candidate: &Candidate, bound: usize) -> Option<usize> {
    let named_end = Regex::new(&format!(
        r"\bEND\s+{}\s*;",
        regex::escape(&candidate.name)
    ))
    .ok();
    let mut depth: i32 = 0;
    // Open CASE expressions; their END never closes a unit.
    let mut case_depth: usize = 0;
    let mut opened = candidate.unit_type.is_package();

    for (idx, line) in lines.iter().enumerate().take(bound).skip(candidate.line) {
        if named_end.as_ref().is_some_and(|re| re.is_match(line)) {
            return Some(idx);
        }

        for token in BLOCK_TOKEN.find_iter(line) {
            match token.as_str() {
                "BEGIN" => {
                    depth += 1;
                    opened = true;
                }
                "CASE" if preceded_by_end(line, token.start()) => {}
                "CASE" => case_depth += 1,
                _ => {
                    // END IF / END LOOP close inner blocks.
                    if INNER_BLOCK_CLOSE.is_match(&line[token.end()..]) {
                        continue;
                    }
                    if case_depth > 0 {
                        case_depth -= 1;
                        continue;
                    }
                    depth -= 1;
                    if opened && depth <= 0 {
                        return Some(idx);
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(source: &str) -> Vec<(String, usize, usize)> {
        extract_boundaries(source)
            .into_iter()
            .map(|b| (b.name, b.start_line, b.end_line))
            .collect()
    }

    #[test]
    fn test_two_units_with_inner_blocks() {
        let source = "PROCEDURE a IS\nBEGIN\n  IF x THEN\n    NULL;\n  END IF;\nEND;\nFUNCTION b(p IN NUMBER) RETURN NUMBER IS\nBEGIN\n  RETURN p;\nEND b;\n";
        assert_eq!(
            spans(source),
            vec![("A".to_string(), 1, 6), ("B".to_string(), 7, 10)]
        );
    }

    #[test]
    fn test_single_line_unit_closed_by_name() {
        let source =
            "PROCEDURE P1 IS BEGIN INSERT INTO T1 VALUES (1); UPDATE T2 SET X=1; END P1;";
        let units = extract_boundaries(source);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "P1");
        assert_eq!((units[0].start_line, units[0].end_line), (1, 1));
        assert!(units[0].terminated);
    }

    #[test]
    fn test_loops_and_case_do_not_close_unit() {
        let source = "PROCEDURE p IS\nBEGIN\n  LOOP\n    CASE v\n      WHEN 1 THEN NULL;\n    END CASE;\n    x := CASE WHEN y THEN 1 ELSE 2 END;\n    EXIT;\n  END LOOP;\n  BEGIN\n    NULL;\n  END;\nEND;\n";
        assert_eq!(spans(source), vec![("P".to_string(), 1, 13)]);
    }

    #[test]
    fn test_keywords_in_strings_and_comments_ignored() {
        let source = "PROCEDURE p IS\nBEGIN\n  msg := 'END;';\n  -- END;\n  /* PROCEDURE fake IS */\n  NULL;\nEND;\n";
        assert_eq!(spans(source), vec![("P".to_string(), 1, 7)]);
    }

    #[test]
    fn test_malformed_unit_closed_before_next_candidate() {
        let source = "PROCEDURE broken IS\nBEGIN\n  NULL;\nPROCEDURE next_one IS\nBEGIN\n  NULL;\nEND next_one;\n";
        let units = extract_boundaries(source);
        assert_eq!(units.len(), 2);
        assert_eq!((units[0].start_line, units[0].end_line), (1, 3));
        assert!(!units[0].terminated);
        assert_eq!((units[1].start_line, units[1].end_line), (4, 7));
        assert!(units[1].terminated);
    }

    #[test]
    fn test_malformed_last_unit_runs_to_eof() {
        let source = "PROCEDURE p IS\nBEGIN\n  NULL;\n";
        let units = extract_boundaries(source);
        assert_eq!((units[0].start_line, units[0].end_line), (1, 3));
        assert!(!units[0].terminated);
    }

    #[test]
    fn test_create_or_replace_and_schema_prefix() {
        let source = "CREATE OR REPLACE PROCEDURE hr.raise_salary(p_id NUMBER) AS\nBEGIN\n  NULL;\nEND raise_salary;\n";
        assert_eq!(spans(source), vec![("RAISE_SALARY".to_string(), 1, 4)]);
    }

    #[test]
    fn test_forward_declarations_are_skipped() {
        let source = "PACKAGE BODY pkg IS\n  PROCEDURE helper(p NUMBER);\n  PROCEDURE main IS\n  BEGIN\n    helper(1);\n  END main;\n  PROCEDURE helper(p NUMBER) IS\n  BEGIN\n    NULL;\n  END helper;\nEND pkg;\n";
        assert_eq!(
            spans(source),
            vec![("MAIN".to_string(), 3, 6), ("HELPER".to_string(), 7, 10)]
        );
    }

    #[test]
    fn test_package_spec_is_a_unit() {
        let source = "PACKAGE order_api IS\n  FUNCTION total(p_id NUMBER)\n    RETURN NUMBER;\n  g_count NUMBER;\nEND order_api;\n";
        let units = extract_boundaries(source);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_type, UnitType::PackageSpec);
        assert_eq!((units[0].start_line, units[0].end_line), (1, 5));
    }

    #[test]
    fn test_case_expression_in_package_declarations() {
        let source = "PACKAGE BODY pkg IS\n  g_rate NUMBER := CASE WHEN 1 = 1 THEN 1 ELSE 2 END;\n  PROCEDURE a IS\n  BEGIN\n    NULL;\n  END a;\nEND pkg;\n";
        let units: Vec<_> = extract_boundaries(source)
            .into_iter()
            .map(|b| (b.name, b.unit_type, b.start_line, b.end_line))
            .collect();
        assert_eq!(units, vec![("A".to_string(), UnitType::Procedure, 3, 6)]);
    }

    #[test]
    fn test_package_spec_closed_by_bare_end() {
        let source = "PACKAGE api IS\n  g_total NUMBER := CASE WHEN 1 = 1 THEN 0 END;\nEND;\n";
        let units = extract_boundaries(source);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_type, UnitType::PackageSpec);
        assert_eq!((units[0].start_line, units[0].end_line), (1, 3));
        assert!(units[0].terminated);
    }

    #[test]
    fn test_ranges_never_overlap() {
        let source = "PROCEDURE a IS\nBEGIN\n  BEGIN\n    NULL;\nPROCEDURE b IS\nBEGIN\n  NULL;\nEND;\nFUNCTION c RETURN NUMBER IS\nBEGIN\n  RETURN 1;\nEND;\n";
        let units = extract_boundaries(source);
        assert_eq!(units.len(), 3);
        for pair in units.windows(2) {
            assert!(pair[0].end_line < pair[1].start_line);
        }
    }
}
