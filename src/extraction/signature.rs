//! Parameter list and return type parsing for unit headers.

use crate::common::text::{code_only, contains_keyword};
use crate::core::UnitType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static DECL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:PROCEDURE|FUNCTION)\s+[A-Z][A-Z0-9_$#]*(?:\s*\.\s*[A-Z][A-Z0-9_$#]*)?")
        .unwrap()
});

static RETURN_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*RETURN\s+([A-Z][A-Z0-9_$#]*(?:\.[A-Z][A-Z0-9_$#]*)*(?:%[A-Z]+)?)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub mode: ParameterMode,
    pub data_type: String,
    pub has_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitSignature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

/// Parse the header of a unit's source text.
///
/// Default-value literals are blanked before parsing, so a default such as
/// `'A,B'` never splits a parameter.
pub fn parse_signature(unit_code: &str, unit_type: UnitType) -> UnitSignature {
    let masked = code_only(unit_code);
    let Some(decl) = DECL_KEYWORD.find(&masked) else {
        return UnitSignature::default();
    };

    let mut rest = &masked[decl.end()..];
    let mut parameters = Vec::new();

    if rest.trim_start().starts_with('(') {
        if let Some(open) = rest.find('(') {
            if let Some(close) = matching_paren(rest, open) {
                parameters = split_top_level(&rest[open + 1..close])
                    .into_iter()
                    .filter_map(parse_parameter)
                    .collect();
                rest = &rest[close + 1..];
            }
        }
    }

    let return_type = match unit_type {
        UnitType::Function => RETURN_TYPE.captures(rest).map(|caps| caps[1].to_string()),
        _ => None,
    };

    UnitSignature {
        parameters,
        return_type,
    }
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_parameter(text: &str) -> Option<Parameter> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let has_default = text.contains(":=") || contains_keyword(text, "DEFAULT");
    let declaration = text.split(":=").next().unwrap_or(text);
    let tokens: Vec<&str> = declaration
        .split_whitespace()
        .take_while(|t| *t != "DEFAULT")
        .collect();
    let (name, rest) = tokens.split_first()?;

    let (mode, skip) = match rest {
        ["IN", "OUT", ..] => (ParameterMode::InOut, 2),
        ["IN", ..] => (ParameterMode::In, 1),
        ["OUT", ..] => (ParameterMode::Out, 1),
        _ => (ParameterMode::In, 0),
    };
    let data_type = rest[skip..]
        .iter()
        .filter(|t| **t != "NOCOPY")
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    Some(Parameter {
        name: name.to_string(),
        mode,
        data_type,
        has_default,
    })
}
