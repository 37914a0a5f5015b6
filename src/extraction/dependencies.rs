//! Dependency extraction for a single unit's source text.
//!
//! Stage one fills everything except `called_procedures`, which needs the
//! full registry of unit names and is resolved by
//! [`crate::extraction::resolve_called_procedures`] once every unit in the
//! file is known.

use crate::common::text::{code_only, strip_comments};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

static BIND_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9_$#:]):([A-Z][A-Z0-9_$#]*(?:\.[A-Z][A-Z0-9_$#]*)?)").unwrap()
});

static SESSION_ACCESSOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^A-Z0-9_$#.])(?:V|NV|NAME_IN|APEX_UTIL\.GET_SESSION_STATE|APEX_UTIL\.GET_NUMERIC_SESSION_STATE|APEX_UTIL\.SET_SESSION_STATE)\s*\(\s*'([A-Z][A-Z0-9_$#]*(?:\.[A-Z][A-Z0-9_$#]*)?)'",
    )
    .unwrap()
});

static QUOTED_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^A-Z0-9_$#.])(?:COPY|DEFAULT_VALUE)\s*\([^;]*?,\s*'([A-Z][A-Z0-9_$#]*(?:\.[A-Z][A-Z0-9_$#]*)?)'\s*\)",
    )
    .unwrap()
});

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":[A-Z][A-Z0-9_$#.]*|[A-Z_][A-Z0-9_$#]*(?:\.[A-Z_][A-Z0-9_$#]*)*|[(),;]").unwrap()
});

static CURSOR_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bCURSOR\s+([A-Z][A-Z0-9_$#]*)").unwrap());

static IS_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bIS\b").unwrap());

static CALL_SITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Z0-9_$#]*)\s*[(;]").unwrap());

static DML_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^A-Z0-9_$#.])(INSERT\s+INTO|UPDATE|DELETE(?:\s+FROM)?|MERGE\s+INTO)\s+([A-Z][A-Z0-9_$#]*(?:\.[A-Z][A-Z0-9_$#]*)?)",
    )
    .unwrap()
});

/// Bind prefixes that are runtime records rather than session state.
const NON_STATE_PREFIXES: &[&str] = &["NEW", "OLD", "PARENT", "SYSTEM"];

/// Identifiers that follow FROM/INTO/UPDATE but never name a table.
const TABLE_STOPLIST: &[&str] = &[
    "DUAL", "SELECT", "SET", "WHERE", "VALUES", "TABLE", "THE", "ONLY", "LATERAL", "NULL", "OF",
    "NOWAIT", "WAIT", "SKIP", "FROM",
];

/// Words that end a `FROM a x, b y` list instead of aliasing a table.
const CLAUSE_KEYWORDS: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "ON",
    "CONNECT", "START", "UNION", "MINUS", "INTERSECT", "HAVING", "FOR", "SET", "VALUES", "USING",
    "WHEN", "INTO", "RETURNING", "LOOP", "PARTITION", "THEN", "AND", "OR",
];

/// Keywords that decide what a following `INTO` means.
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "MERGE",
    "FETCH",
    "RETURNING",
    "COLLECT",
    "IMMEDIATE",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorInfo {
    pub name: String,
    pub uses_page_items: bool,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitDependencies {
    pub page_items: Vec<String>,
    pub tables: Vec<String>,
    pub cursors: Vec<CursorInfo>,
    pub called_procedures: Vec<String>,
    pub has_forms_builtins: bool,
}

impl UnitDependencies {
    /// Stage-one extraction; `called_procedures` is left empty.
    pub fn extract(text: &str, has_forms_builtins: bool) -> Self {
        Self {
            page_items: extract_page_items(text),
            tables: extract_tables(text),
            cursors: extract_cursors(text),
            called_procedures: Vec::new(),
            has_forms_builtins,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DmlKind {
    Insert,
    Update,
    Delete,
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmlStatement {
    pub kind: DmlKind,
    pub table: String,
    /// Byte offset of the DML keyword in the scanned text
    pub offset: usize,
}

/// Session-state placeholders referenced by `text`, uppercased, deduplicated
/// and sorted.
pub fn extract_page_items(text: &str) -> Vec<String> {
    let code = code_only(text);
    let with_literals = strip_comments(text);
    let mut items = BTreeSet::new();

    for caps in BIND_REFERENCE.captures_iter(&code) {
        let reference = &caps[1];
        let prefix = reference.split('.').next().unwrap_or(reference);
        if !NON_STATE_PREFIXES.contains(&prefix) {
            items.insert(reference.to_string());
        }
    }

    for pattern in [&*SESSION_ACCESSOR, &*QUOTED_TARGET] {
        for caps in pattern.captures_iter(&with_literals) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // The accessor itself must be code, not text inside a literal.
            let head_end = whole.start() + whole.as_str().find('(').unwrap_or(0);
            if code[whole.start()..head_end] == with_literals[whole.start()..head_end] {
                items.insert(name.as_str().to_string());
            }
        }
    }

    items.into_iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Bind,
    Punct(char),
}

fn tokenize(code: &str) -> Vec<Token<'_>> {
    TOKEN
        .find_iter(code)
        .map(|m| {
            let text = m.as_str();
            match text.chars().next() {
                Some(':') => Token::Bind,
                Some(c @ ('(' | ')' | ',' | ';')) => Token::Punct(c),
                _ => Token::Word(text),
            }
        })
        .collect()
}

fn word_at<'a>(tokens: &[Token<'a>], idx: usize) -> Option<&'a str> {
    match tokens.get(idx) {
        Some(Token::Word(w)) => Some(*w),
        _ => None,
    }
}

fn take_table(tokens: &[Token<'_>], idx: usize, tables: &mut BTreeSet<String>) -> Option<usize> {
    let word = word_at(tokens, idx)?;
    if TABLE_STOPLIST.contains(&word) {
        return None;
    }
    tables.insert(word.to_string());
    Some(idx + 1)
}

fn take_table_list(tokens: &[Token<'_>], mut idx: usize, tables: &mut BTreeSet<String>) {
    while let Some(mut next) = take_table(tokens, idx, tables) {
        if word_at(tokens, next).is_some_and(|w| !CLAUSE_KEYWORDS.contains(&w)) {
            next += 1;
        }
        if tokens.get(next) != Some(&Token::Punct(',')) {
            break;
        }
        idx = next + 1;
    }
}

/// `FROM` inside `EXTRACT(x FROM y)` or `TRIM(... FROM y)`.
fn is_function_from(tokens: &[Token<'_>], idx: usize) -> bool {
    tokens[idx.saturating_sub(3)..idx]
        .iter()
        .any(|t| matches!(t, Token::Word("EXTRACT") | Token::Word("TRIM")))
}

/// Tables referenced by SQL in `text`, deduplicated and sorted.
pub fn extract_tables(text: &str) -> Vec<String> {
    let code = code_only(text);
    let tokens = tokenize(&code);
    let mut tables = BTreeSet::new();
    let mut statement: Option<&str> = None;

    for (idx, token) in tokens.iter().enumerate() {
        match *token {
            Token::Punct(';') => statement = None,
            Token::Word(word) => {
                match word {
                    "FROM" if !is_function_from(&tokens, idx) => {
                        take_table_list(&tokens, idx + 1, &mut tables)
                    }
                    "JOIN" => {
                        take_table(&tokens, idx + 1, &mut tables);
                    }
                    "INTO" if matches!(statement, Some("INSERT") | Some("MERGE")) => {
                        take_table(&tokens, idx + 1, &mut tables);
                    }
                    "UPDATE" if idx == 0 || word_at(&tokens, idx - 1) != Some("FOR") => {
                        take_table(&tokens, idx + 1, &mut tables);
                    }
                    "DELETE" if word_at(&tokens, idx + 1) != Some("FROM") => {
                        take_table(&tokens, idx + 1, &mut tables);
                    }
                    _ => {}
                }
                if STATEMENT_KEYWORDS.contains(&word) {
                    statement = Some(word);
                }
            }
            _ => {}
        }
    }

    tables.into_iter().collect()
}

/// Explicit cursors declared in `text` with the state and tables their
/// query touches.
pub fn extract_cursors(text: &str) -> Vec<CursorInfo> {
    let code = code_only(text);
    let mut cursors = Vec::new();

    for caps in CURSOR_DECL.captures_iter(&code) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if name.as_str() == "RETURN" {
            continue;
        }
        let span_end = code[whole.end()..]
            .find(';')
            .map_or(code.len(), |pos| whole.end() + pos + 1);
        // `CURSOR c RETURN rec;` or a ref-cursor type has no query
        if !IS_KEYWORD.is_match(&code[whole.end()..span_end]) {
            continue;
        }

        let span = &text[whole.start()..span_end];
        cursors.push(CursorInfo {
            name: name.as_str().to_string(),
            uses_page_items: !extract_page_items(span).is_empty(),
            tables: extract_tables(span),
        });
    }

    cursors
}

/// Identifiers used in call position (`name(` or `name;`).
pub fn call_sites(text: &str) -> BTreeSet<String> {
    let code = code_only(text);
    CALL_SITE
        .captures_iter(&code)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// DML statements in already-masked, uppercased code.
pub fn dml_statements(code: &str) -> Vec<DmlStatement> {
    DML_STATEMENT
        .captures_iter(code)
        .filter_map(|caps| {
            let keyword = caps.get(1)?;
            let table = caps[2].to_string();
            let kind = match keyword.as_str().split_whitespace().next()? {
                "INSERT" => DmlKind::Insert,
                "UPDATE" => DmlKind::Update,
                "DELETE" => DmlKind::Delete,
                _ => DmlKind::Merge,
            };
            let for_update = kind == DmlKind::Update
                && code[..keyword.start()].trim_end().ends_with("FOR");
            if for_update || TABLE_STOPLIST.contains(&table.as_str()) {
                return None;
            }
            Some(DmlStatement {
                kind,
                table,
                offset: keyword.start(),
            })
        })
        .collect()
}
