//! Trigger lifecycle classification and analysis.

pub mod mapping;

pub use mapping::{map_trigger, transform_code, SupportLevel, TargetConstruct, TargetMapping};

use crate::classification::scoring::{impact_score, max_nesting_depth};
use crate::common::text::code_only;
use crate::config::TargetConfig;
use crate::core::ImpactScore;
use crate::extraction::dependencies::{call_sites, dml_statements};
use crate::extraction::BuiltinVocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A trigger as decoded from the form's trigger list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTrigger {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerCategory {
    PreRender,
    PostQuery,
    Validation,
    UserAction,
    PreDml,
    PostDml,
    Commit,
    Navigation,
    Error,
    Unknown,
}

impl fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerCategory::PreRender => "pre-render",
            TriggerCategory::PostQuery => "post-query",
            TriggerCategory::Validation => "validation",
            TriggerCategory::UserAction => "user-action",
            TriggerCategory::PreDml => "pre-dml",
            TriggerCategory::PostDml => "post-dml",
            TriggerCategory::Commit => "commit",
            TriggerCategory::Navigation => "navigation",
            TriggerCategory::Error => "error",
            TriggerCategory::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Name fragments per category, tried in order; first hit wins.
const CATEGORY_RULES: &[(TriggerCategory, &[&str])] = &[
    (
        TriggerCategory::PreRender,
        &[
            "WHEN-NEW-",
            "WHEN-CREATE-RECORD",
            "PRE-FORM",
            "PRE-BLOCK",
            "PRE-RECORD",
            "PRE-TEXT-ITEM",
            "PRE-QUERY",
        ],
    ),
    (
        TriggerCategory::PostQuery,
        &["POST-QUERY", "POST-SELECT", "ON-FETCH", "ON-POPULATE-DETAILS"],
    ),
    (TriggerCategory::Validation, &["WHEN-VALIDATE", "POST-CHANGE"]),
    (
        TriggerCategory::UserAction,
        &[
            "WHEN-BUTTON",
            "WHEN-CHECKBOX",
            "WHEN-RADIO",
            "WHEN-LIST",
            "WHEN-MOUSE",
            "WHEN-TIMER",
            "WHEN-TAB",
            "WHEN-IMAGE",
            "WHEN-WINDOW",
            "WHEN-CUSTOM",
            "KEY-",
        ],
    ),
    (
        TriggerCategory::PreDml,
        &[
            "PRE-INSERT",
            "PRE-UPDATE",
            "PRE-DELETE",
            "ON-INSERT",
            "ON-UPDATE",
            "ON-DELETE",
            "ON-LOCK",
        ],
    ),
    (
        TriggerCategory::PostDml,
        &["POST-INSERT", "POST-UPDATE", "POST-DELETE"],
    ),
    (
        TriggerCategory::Commit,
        &["PRE-COMMIT", "POST-FORMS-COMMIT", "POST-DATABASE-COMMIT", "ON-COMMIT"],
    ),
    (
        TriggerCategory::Navigation,
        &[
            "POST-TEXT-ITEM",
            "POST-ITEM",
            "POST-RECORD",
            "POST-BLOCK",
            "POST-FORM",
            "PRE-ITEM",
        ],
    ),
    (TriggerCategory::Error, &["ON-ERROR", "ON-MESSAGE"]),
];

/// Triggers that start a user-visible interaction or a transaction.
const ENTRY_POINTS: &[&str] = &[
    "WHEN-NEW-FORM-INSTANCE",
    "PRE-FORM",
    "PRE-QUERY",
    "WHEN-BUTTON-PRESSED",
    "KEY-COMMIT",
    "PRE-COMMIT",
    "ON-COMMIT",
    "POST-FORMS-COMMIT",
];

/// Uppercase with `_` folded to `-`, so `when_validate_item` and
/// `WHEN-VALIDATE-ITEM` compare equal.
pub fn normalize_trigger_name(name: &str) -> String {
    name.trim().to_ascii_uppercase().replace('_', "-")
}

pub fn classify_trigger(name: &str) -> TriggerCategory {
    let normalized = normalize_trigger_name(name);
    CATEGORY_RULES
        .iter()
        .find(|(_, fragments)| fragments.iter().any(|f| normalized.contains(f)))
        .map_or(TriggerCategory::Unknown, |(category, _)| *category)
}

pub fn is_entry_point(name: &str) -> bool {
    let normalized = normalize_trigger_name(name);
    ENTRY_POINTS.contains(&normalized.as_str())
}

fn responsibility(category: TriggerCategory, scope: &str) -> String {
    match category {
        TriggerCategory::PreRender => format!("Initializes {scope} before it is displayed"),
        TriggerCategory::PostQuery => format!("Derives display values after {scope} is queried"),
        TriggerCategory::Validation => format!("Validates {scope} when it changes"),
        TriggerCategory::UserAction => format!("Responds to a user action on {scope}"),
        TriggerCategory::PreDml => format!("Prepares or overrides DML for {scope}"),
        TriggerCategory::PostDml => format!("Applies follow-up changes after DML on {scope}"),
        TriggerCategory::Commit => format!("Coordinates the commit of {scope}"),
        TriggerCategory::Navigation => format!("Handles navigation out of {scope}"),
        TriggerCategory::Error => format!("Handles errors and messages raised in {scope}"),
        TriggerCategory::Unknown => format!("Runs custom logic for {scope}"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerAnalysis {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub category: TriggerCategory,
    pub is_entry_point: bool,
    /// Program units from the registry called by this trigger, sorted
    pub called_program_units: Vec<String>,
    pub direct_dml: bool,
    pub logic_depth: usize,
    pub responsibility: String,
    pub impact_score: ImpactScore,
    pub mapping: TargetMapping,
}

impl TriggerAnalysis {
    /// Where the trigger is attached, for display.
    pub fn scope(&self) -> String {
        match (&self.block, &self.item) {
            (Some(block), Some(item)) => format!("{block}.{item}"),
            (Some(block), None) => block.clone(),
            (None, Some(item)) => item.clone(),
            (None, None) => "the form".to_string(),
        }
    }

    /// Name qualified by its attachment point, e.g.
    /// `CTRL.BTN_A.WHEN-BUTTON-PRESSED`. Same-named triggers on different
    /// items stay distinct.
    pub fn qualified_name(&self) -> String {
        match (&self.block, &self.item) {
            (None, None) => self.name.clone(),
            _ => format!("{}.{}", self.scope(), self.name),
        }
    }

    pub fn calls(&self, unit_name: &str) -> bool {
        self.called_program_units.iter().any(|u| u == unit_name)
    }
}

pub fn analyze_trigger(
    trigger: &FormTrigger,
    registry: &BTreeSet<String>,
    vocabulary: &BuiltinVocabulary,
    target: &TargetConfig,
) -> TriggerAnalysis {
    let category = classify_trigger(&trigger.name);
    let called_program_units = call_sites(&trigger.code)
        .intersection(registry)
        .cloned()
        .collect();

    let mut analysis = TriggerAnalysis {
        name: normalize_trigger_name(&trigger.name),
        block: trigger.block.as_ref().map(|b| b.to_ascii_uppercase()),
        item: trigger.item.as_ref().map(|i| i.to_ascii_uppercase()),
        category,
        is_entry_point: is_entry_point(&trigger.name),
        called_program_units,
        direct_dml: !dml_statements(&code_only(&trigger.code)).is_empty(),
        logic_depth: max_nesting_depth(&trigger.code),
        responsibility: String::new(),
        impact_score: impact_score(&trigger.code),
        mapping: map_trigger(category, &trigger.code, vocabulary, target),
    };
    analysis.responsibility = responsibility(category, &analysis.scope());
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_categories() {
        let cases = [
            ("WHEN-NEW-FORM-INSTANCE", TriggerCategory::PreRender),
            ("PRE-QUERY", TriggerCategory::PreRender),
            ("POST-QUERY", TriggerCategory::PostQuery),
            ("WHEN-VALIDATE-ITEM", TriggerCategory::Validation),
            ("when_button_pressed", TriggerCategory::UserAction),
            ("KEY-COMMIT", TriggerCategory::UserAction),
            ("PRE-INSERT", TriggerCategory::PreDml),
            ("POST-UPDATE", TriggerCategory::PostDml),
            ("ON-COMMIT", TriggerCategory::Commit),
            ("POST-TEXT-ITEM", TriggerCategory::Navigation),
            ("ON-ERROR", TriggerCategory::Error),
            ("MY-CUSTOM-THING", TriggerCategory::Unknown),
        ];
        for (name, expected) in cases {
            assert_eq!(classify_trigger(name), expected, "{name}");
        }
    }

    #[test]
    fn test_entry_points() {
        assert!(is_entry_point("WHEN-NEW-FORM-INSTANCE"));
        assert!(is_entry_point("key_commit"));
        assert!(!is_entry_point("POST-QUERY"));
    }

    #[test]
    fn test_analyze_trigger() {
        let registry: BTreeSet<String> = ["SAVE_ORDER".to_string(), "LOG_IT".to_string()].into();
        let trigger = FormTrigger {
            name: "WHEN-BUTTON-PRESSED".into(),
            code: "BEGIN\n  IF :ORD.ID IS NOT NULL THEN\n    save_order(:ORD.ID);\n  END IF;\n  other_proc;\nEND;".into(),
            block: Some("ord".into()),
            item: Some("btn_save".into()),
        };
        let analysis = analyze_trigger(
            &trigger,
            &registry,
            &BuiltinVocabulary::standard(),
            &TargetConfig::default(),
        );
        assert_eq!(analysis.category, TriggerCategory::UserAction);
        assert!(analysis.is_entry_point);
        assert_eq!(analysis.called_program_units, vec!["SAVE_ORDER"]);
        assert!(!analysis.direct_dml);
        assert_eq!(analysis.logic_depth, 1);
        assert_eq!(analysis.responsibility, "Responds to a user action on ORD.BTN_SAVE");
        assert_eq!(analysis.qualified_name(), "ORD.BTN_SAVE.WHEN-BUTTON-PRESSED");
        assert!(analysis.calls("SAVE_ORDER"));
    }

    #[test]
    fn test_unscoped_trigger_keeps_plain_name() {
        let trigger = FormTrigger {
            name: "when-new-form-instance".into(),
            code: "NULL;".into(),
            block: None,
            item: None,
        };
        let analysis = analyze_trigger(
            &trigger,
            &BTreeSet::new(),
            &BuiltinVocabulary::standard(),
            &TargetConfig::default(),
        );
        assert_eq!(analysis.qualified_name(), "WHEN-NEW-FORM-INSTANCE");
    }
}
