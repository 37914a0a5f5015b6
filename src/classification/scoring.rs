//! Complexity, impact and risk scoring for program units.

use crate::common::text::{code_only, contains_keyword};
use crate::core::ImpactScore;
use crate::extraction::builtins::BuiltinVocabulary;
use crate::extraction::dependencies::{dml_statements, DmlKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

static CONTROL_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bEND\s+IF\b|\bEND\s+LOOP\b|\bEND\s+CASE\b|\bIF\b|\bLOOP\b|\bCASE\b").unwrap()
});

static DYNAMIC_SQL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bEXECUTE\s+IMMEDIATE\b|\bDBMS_SQL\b").unwrap());

static EXTERNAL_PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:UTL|DBMS)_[A-Z0-9_$#]+)\s*\.").unwrap());

/// Builtins that each add one impact point.
const UI_IMPACT_BUILTINS: &[&str] = &[
    "COMMIT_FORM",
    "EXECUTE_QUERY",
    "CLEAR_FORM",
    "CALL_FORM",
    "OPEN_FORM",
    "NEW_FORM",
    "GO_BLOCK",
];

const COMMIT_POINTS: u32 = 3;
const ROLLBACK_POINTS: u32 = 2;
const DML_KIND_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 7 => ComplexityLevel::High,
            s if s >= 4 => ComplexityLevel::Medium,
            _ => ComplexityLevel::Low,
        }
    }
}

/// Control-flow counts and the derived 1-10 complexity score of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitComplexity {
    pub score: u8,
    pub level: ComplexityLevel,
    pub line_count: usize,
    pub if_count: usize,
    pub loop_count: usize,
    pub case_count: usize,
    pub nested_if_count: usize,
    pub dml_count: usize,
    /// Deepest IF/LOOP nesting
    pub nesting_depth: usize,
}

#[derive(Debug, Default)]
struct ControlCounts {
    ifs: usize,
    loops: usize,
    cases: usize,
    nested_ifs: usize,
    max_depth: usize,
}

fn count_control_flow(bare: &str) -> ControlCounts {
    let mut counts = ControlCounts::default();
    // true for IF, false for LOOP
    let mut stack: Vec<bool> = Vec::new();

    for token in CONTROL_TOKEN.find_iter(bare) {
        let text = token.as_str();
        if text.starts_with("END") {
            if text.ends_with("IF") || text.ends_with("LOOP") {
                stack.pop();
            }
            continue;
        }
        match text {
            "IF" => {
                counts.ifs += 1;
                if stack.iter().any(|is_if| *is_if) {
                    counts.nested_ifs += 1;
                }
                stack.push(true);
            }
            "LOOP" => {
                counts.loops += 1;
                stack.push(false);
            }
            _ => counts.cases += 1,
        }
        counts.max_depth = counts.max_depth.max(stack.len());
    }

    counts
}

/// Deepest IF/LOOP nesting in `code`.
pub fn max_nesting_depth(code: &str) -> usize {
    count_control_flow(&code_only(code)).max_depth
}

fn line_bucket(lines: usize) -> f64 {
    match lines {
        l if l > 100 => 3.0,
        l if l > 50 => 2.0,
        l if l > 20 => 1.0,
        _ => 0.0,
    }
}

impl UnitComplexity {
    pub fn measure(code: &str) -> Self {
        let bare = code_only(code);
        let counts = count_control_flow(&bare);
        let line_count = code.lines().count().max(1);
        let dml_count = dml_statements(&bare).len();

        let raw = 1.0
            + 0.5 * counts.ifs as f64
            + counts.loops as f64
            + 0.5 * counts.cases as f64
            + line_bucket(line_count)
            + 1.5 * counts.nested_ifs as f64
            + 0.5 * dml_count as f64;
        let score = raw.round().clamp(1.0, 10.0) as u8;

        Self {
            score,
            level: ComplexityLevel::from_score(score),
            line_count,
            if_count: counts.ifs,
            loop_count: counts.loops,
            case_count: counts.cases,
            nested_if_count: counts.nested_ifs,
            dml_count,
            nesting_depth: counts.max_depth,
        }
    }
}

/// Weighted impact points before thresholding.
pub fn impact_points(code: &str) -> u32 {
    let bare = code_only(code);
    let mut points = 0;

    if contains_keyword(&bare, "COMMIT") {
        points += COMMIT_POINTS;
    }
    if contains_keyword(&bare, "ROLLBACK") {
        points += ROLLBACK_POINTS;
    }

    let kinds: BTreeSet<DmlKind> = dml_statements(&bare).iter().map(|s| s.kind).collect();
    points += DML_KIND_POINTS * kinds.len() as u32;

    points += UI_IMPACT_BUILTINS
        .iter()
        .filter(|name| contains_keyword(&bare, name))
        .count() as u32;

    points += match code.lines().count() {
        l if l > 100 => 2,
        l if l > 50 => 1,
        _ => 0,
    };

    points
}

pub fn impact_score(code: &str) -> ImpactScore {
    ImpactScore::from_points(impact_points(code))
}

/// True when the unit itself ends or undoes a transaction.
pub fn controls_transaction(code: &str) -> bool {
    let bare = code_only(code);
    ["COMMIT", "ROLLBACK", "COMMIT_FORM"]
        .iter()
        .any(|k| contains_keyword(&bare, k))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RiskFlag {
    FormsBuiltin { name: String },
    DmlWithoutCommit,
    DynamicSql,
    ExternalPackage { name: String },
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFlag::FormsBuiltin { name } => write!(f, "Forms builtin: {name}"),
            RiskFlag::DmlWithoutCommit => write!(f, "DML without COMMIT"),
            RiskFlag::DynamicSql => write!(f, "Dynamic SQL"),
            RiskFlag::ExternalPackage { name } => write!(f, "External package: {name}"),
        }
    }
}

impl Serialize for RiskFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn risk_flags(code: &str, vocabulary: &BuiltinVocabulary) -> Vec<RiskFlag> {
    let bare = code_only(code);
    let mut flags: Vec<RiskFlag> = vocabulary
        .calls_in(code)
        .into_iter()
        .map(|name| RiskFlag::FormsBuiltin { name })
        .collect();

    let commits = contains_keyword(&bare, "COMMIT") || contains_keyword(&bare, "COMMIT_FORM");
    if !commits && !dml_statements(&bare).is_empty() {
        flags.push(RiskFlag::DmlWithoutCommit);
    }

    if DYNAMIC_SQL.is_match(&bare) {
        flags.push(RiskFlag::DynamicSql);
    }

    let packages: BTreeSet<&str> = EXTERNAL_PACKAGE
        .captures_iter(&bare)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|name| *name != "DBMS_SQL")
        .collect();
    flags.extend(packages.into_iter().map(|name| RiskFlag::ExternalPackage {
        name: name.to_string(),
    }));

    flags
}
