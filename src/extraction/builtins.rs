//! Forms runtime builtin detection and commenting.
//!
//! The vocabulary is an explicit rule table that callers may extend or
//! replace.

use crate::common::text::{code_only, indentation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinCategory {
    Navigation,
    Query,
    Clear,
    Commit,
    Property,
    Record,
    Lov,
    Alert,
    Timer,
    Window,
    Misc,
}

impl BuiltinCategory {
    pub fn default_reason(&self) -> &'static str {
        match self {
            BuiltinCategory::Navigation => "Forms navigation has no equivalent; use page branches or Dynamic Actions",
            BuiltinCategory::Query => "Block querying is handled by region data sources",
            BuiltinCategory::Clear => "Clearing blocks maps to page item resets or Clear Cache",
            BuiltinCategory::Commit => "Commit processing is automatic page submission",
            BuiltinCategory::Property => "Item and block properties map to server-side conditions or JavaScript",
            BuiltinCategory::Record => "Record-level operations belong to the grid or form region",
            BuiltinCategory::Lov => "LOVs become shared components or popup LOV items",
            BuiltinCategory::Alert => "Alerts become JavaScript confirm dialogs or inline notifications",
            BuiltinCategory::Timer => "Timers require JavaScript (setInterval) or scheduler jobs",
            BuiltinCategory::Window => "Windows and canvases map to pages, regions and modal dialogs",
            BuiltinCategory::Misc => "Forms runtime call must be replaced manually",
        }
    }
}

/// Reason used when a builtin has neither a specific nor a category reason.
pub const GENERIC_REASON: &str = "Oracle Forms builtin with no direct APEX equivalent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinRule {
    pub name: &'static str,
    pub category: BuiltinCategory,
    pub reason: Option<&'static str>,
    /// Builtin package invoked as `NAME.member(...)` rather than `NAME(...)`.
    pub package: bool,
}

impl BuiltinRule {
    pub fn reason(&self) -> &'static str {
        self.reason.unwrap_or_else(|| self.category.default_reason())
    }
}

const fn rule(name: &'static str, category: BuiltinCategory) -> BuiltinRule {
    BuiltinRule {
        name,
        category,
        reason: None,
        package: false,
    }
}

const fn rule_with(
    name: &'static str,
    category: BuiltinCategory,
    reason: &'static str,
) -> BuiltinRule {
    BuiltinRule {
        name,
        category,
        reason: Some(reason),
        package: false,
    }
}

const fn package(
    name: &'static str,
    category: BuiltinCategory,
    reason: &'static str,
) -> BuiltinRule {
    BuiltinRule {
        name,
        category,
        reason: Some(reason),
        package: true,
    }
}

use BuiltinCategory::*;

const STANDARD_RULES: &[BuiltinRule] = &[
    // Navigation
    rule("GO_BLOCK", Navigation),
    rule("GO_ITEM", Navigation),
    rule("GO_RECORD", Navigation),
    rule("GO_FORM", Navigation),
    rule("NEXT_BLOCK", Navigation),
    rule("PREVIOUS_BLOCK", Navigation),
    rule("NEXT_ITEM", Navigation),
    rule("PREVIOUS_ITEM", Navigation),
    rule("NEXT_RECORD", Navigation),
    rule("PREVIOUS_RECORD", Navigation),
    rule("FIRST_RECORD", Navigation),
    rule("LAST_RECORD", Navigation),
    rule("NEXT_FORM", Navigation),
    rule("PREVIOUS_FORM", Navigation),
    rule("UP", Navigation),
    rule("DOWN", Navigation),
    rule_with("CALL_FORM", Navigation, "Calling another form becomes a modal page or branch"),
    rule_with("OPEN_FORM", Navigation, "Opening another form becomes a branch or new tab"),
    rule_with("NEW_FORM", Navigation, "Replacing the form becomes a page branch"),
    rule_with("EXIT_FORM", Navigation, "Exiting the form becomes a branch or Cancel button"),
    // Query
    rule("EXECUTE_QUERY", Query),
    rule("ENTER_QUERY", Query),
    rule("COUNT_QUERY", Query),
    rule("ABORT_QUERY", Query),
    rule("LAST_QUERY", Query),
    // Clear
    rule("CLEAR_BLOCK", Clear),
    rule("CLEAR_FORM", Clear),
    rule("CLEAR_RECORD", Clear),
    rule("CLEAR_ITEM", Clear),
    rule("CLEAR_EOL", Clear),
    rule("CLEAR_MESSAGE", Clear),
    // Commit
    rule("COMMIT_FORM", Commit),
    rule("POST", Commit),
    rule("FORMS_DDL", Commit),
    rule_with("ISSUE_ROLLBACK", Commit, "Rollback is handled by page processing error handling"),
    rule_with("ISSUE_SAVEPOINT", Commit, "Savepoints are not exposed by page processing"),
    rule("ENFORCE_COLUMN_SECURITY", Commit),
    // Property
    rule("SET_ITEM_PROPERTY", Property),
    rule("GET_ITEM_PROPERTY", Property),
    rule("SET_BLOCK_PROPERTY", Property),
    rule("GET_BLOCK_PROPERTY", Property),
    rule("SET_FORM_PROPERTY", Property),
    rule("GET_FORM_PROPERTY", Property),
    rule("SET_RECORD_PROPERTY", Property),
    rule("GET_RECORD_PROPERTY", Property),
    rule("SET_ITEM_INSTANCE_PROPERTY", Property),
    rule("GET_ITEM_INSTANCE_PROPERTY", Property),
    rule("SET_APPLICATION_PROPERTY", Property),
    rule("GET_APPLICATION_PROPERTY", Property),
    rule("SET_RADIO_BUTTON_PROPERTY", Property),
    rule("SET_RELATION_PROPERTY", Property),
    rule("FIND_ITEM", Property),
    rule("FIND_BLOCK", Property),
    rule("ID_NULL", Property),
    // Record
    rule("CREATE_RECORD", Record),
    rule("DELETE_RECORD", Record),
    rule("DUPLICATE_RECORD", Record),
    rule("DUPLICATE_ITEM", Record),
    rule("INSERT_RECORD", Record),
    rule("UPDATE_RECORD", Record),
    rule("LOCK_RECORD", Record),
    rule("SELECT_RECORDS", Record),
    // LOV
    rule("SHOW_LOV", Lov),
    rule("LIST_VALUES", Lov),
    rule("SET_LOV_PROPERTY", Lov),
    rule("GET_LOV_PROPERTY", Lov),
    rule("POPULATE_GROUP", Lov),
    rule("POPULATE_LIST", Lov),
    rule("CLEAR_LIST", Lov),
    // Alert
    rule("SHOW_ALERT", Alert),
    rule("SET_ALERT_PROPERTY", Alert),
    rule("SET_ALERT_BUTTON_PROPERTY", Alert),
    rule("FIND_ALERT", Alert),
    // Timer
    rule("CREATE_TIMER", Timer),
    rule("DELETE_TIMER", Timer),
    rule("SET_TIMER", Timer),
    rule("FIND_TIMER", Timer),
    // Window and canvas
    rule("SHOW_WINDOW", Window),
    rule("HIDE_WINDOW", Window),
    rule("SET_WINDOW_PROPERTY", Window),
    rule("GET_WINDOW_PROPERTY", Window),
    rule("SHOW_VIEW", Window),
    rule("HIDE_VIEW", Window),
    rule("SET_VIEW_PROPERTY", Window),
    rule("SET_CANVAS_PROPERTY", Window),
    rule("SET_TAB_PAGE_PROPERTY", Window),
    rule("SHOW_EDITOR", Window),
    rule("EDIT_TEXTITEM", Window),
    // Misc
    rule_with("SYNCHRONIZE", Misc, "Screen synchronization is meaningless in a web page"),
    rule_with("HOST", Misc, "Host commands cannot run from the browser; use a scheduler job or external service"),
    rule_with("MESSAGE", Misc, "Messages become APEX_ERROR or page notifications"),
    rule("BELL", Misc),
    rule("PAUSE", Misc),
    rule_with("COPY", Misc, "Copy into an item becomes APEX_UTIL.SET_SESSION_STATE"),
    rule_with("DEFAULT_VALUE", Misc, "Item defaults are set declaratively on the page item"),
    rule("EXECUTE_TRIGGER", Misc),
    rule("DO_KEY", Misc),
    rule("CALL_INPUT", Misc),
    rule("REDISPLAY", Misc),
    rule_with("RUN_PRODUCT", Misc, "Reports integration becomes a report query or REST call"),
    rule_with("WEB.SHOW_DOCUMENT", Misc, "Opening documents becomes a URL branch or JavaScript window.open"),
    package("FORMS_OLE", Misc, "OLE automation has no browser equivalent; redesign with a REST service or file upload"),
    package("OLE2", Misc, "OLE automation has no browser equivalent; redesign with a REST service or file upload"),
    package("TEXT_IO", Misc, "Client file I/O becomes file browse items, APEX_DATA_PARSER or UTL_FILE"),
];

/// The Forms builtin vocabulary with precompiled matchers.
#[derive(Debug, Clone)]
pub struct BuiltinVocabulary {
    rules: Vec<BuiltinRule>,
    at_line_start: Regex,
    anywhere: Regex,
}

impl BuiltinVocabulary {
    pub fn standard() -> Self {
        Self::from_rules(STANDARD_RULES.to_vec())
    }

    pub fn from_rules(rules: Vec<BuiltinRule>) -> Self {
        let calls = alternation(rules.iter().filter(|r| !r.package).map(|r| r.name));
        let packages = alternation(rules.iter().filter(|r| r.package).map(|r| r.name));
        // Group 1 is a plain call, group 2 a package member call.
        let callee = format!(r"(?:({calls})\s*[(;]|({packages})\s*\.\s*[A-Z_])");

        let at_line_start = Regex::new(&format!(r"^\s*{callee}"))
            .unwrap_or_else(|_| NEVER_MATCHING.clone());
        let anywhere = Regex::new(&format!(r"(?:^|[^A-Z0-9_$#.]){callee}"))
            .unwrap_or_else(|_| NEVER_MATCHING.clone());

        Self {
            rules,
            at_line_start,
            anywhere,
        }
    }

    pub fn rules(&self) -> &[BuiltinRule] {
        &self.rules
    }

    pub fn lookup(&self, name: &str) -> Option<&BuiltinRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn reason_for(&self, name: &str) -> &'static str {
        self.lookup(name).map_or(GENERIC_REASON, BuiltinRule::reason)
    }

    /// Builtin called at the start of an already masked, uppercased line.
    pub fn match_line_start<'a>(&self, masked_line: &'a str) -> Option<&'a str> {
        self.at_line_start
            .captures(masked_line)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str())
    }

    /// Every distinct builtin called anywhere in `text`, in first-seen order.
    pub fn calls_in(&self, text: &str) -> Vec<String> {
        let code = code_only(text);
        let mut found: Vec<String> = Vec::new();
        for caps in self.anywhere.captures_iter(&code) {
            let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
                continue;
            };
            if !found.iter().any(|f| f == name) {
                found.push(name.to_string());
            }
        }
        found
    }

    pub fn is_called_in(&self, text: &str) -> bool {
        self.anywhere.is_match(&code_only(text))
    }
}

/// Names joined longest first so GO_BLOCK never loses to a shorter prefix.
/// An empty set yields a pattern that never matches.
fn alternation<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = names.collect();
    if names.is_empty() {
        return r"[^\s\S]".to_string();
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|")
}

static NEVER_MATCHING: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\s\S]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentedBuiltin {
    pub name: String,
    pub line: usize,
    pub original: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentedSource {
    pub code: String,
    pub builtins: Vec<CommentedBuiltin>,
}

/// Comment out every line that starts with a builtin call.
///
/// `first_line` is the 1-based line number of the first line of `code`.
/// Lines of a call that spans several lines are commented until the line
/// carrying its terminating `;`.
pub fn comment_out_builtins(
    code: &str,
    first_line: usize,
    vocabulary: &BuiltinVocabulary,
) -> CommentedSource {
    let masked = code_only(code);
    let mut out = String::with_capacity(code.len() + 64);
    let mut builtins = Vec::new();
    let mut continuing = false;

    for (idx, (line, masked_line)) in code.lines().zip(masked.lines()).enumerate() {
        if !out.is_empty() {
            out.push('\n');
        }
        let indent = indentation(line);

        if continuing {
            out.push_str(&format!("{indent}-- {}", line.trim_start()));
            continuing = !masked_line.contains(';');
            continue;
        }

        match vocabulary.match_line_start(masked_line) {
            Some(name) => {
                let reason = vocabulary.reason_for(name);
                out.push_str(&format!("{indent}-- {}\n", line.trim_start()));
                out.push_str(&format!("{indent}-- FORMS BUILTIN: {reason}"));
                builtins.push(CommentedBuiltin {
                    name: name.to_string(),
                    line: first_line + idx,
                    original: line.to_string(),
                    reason: reason.to_string(),
                });
                continuing = !masked_line.contains(';');
            }
            None => out.push_str(line),
        }
    }

    if code.ends_with('\n') {
        out.push('\n');
    }

    CommentedSource {
        code: out,
        builtins,
    }
}
