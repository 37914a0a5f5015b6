//! Per-unit migration checklist.

use super::builtins::CommentedBuiltin;
use super::dependencies::UnitDependencies;
use crate::core::Severity;
use crate::patterns::SemanticPattern;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecklistCategory {
    Builtin,
    PageItems,
    Table,
    Cursor,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub id: String,
    pub category: ChecklistCategory,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Build the checklist for one unit. Item ids are `<UNIT>-<n>` numbered in
/// generation order.
pub fn build_checklist(
    unit_name: &str,
    builtins: &[CommentedBuiltin],
    dependencies: &UnitDependencies,
    patterns: &[SemanticPattern],
) -> Vec<ChecklistItem> {
    let mut entries: Vec<(ChecklistCategory, String, Option<usize>)> = Vec::new();

    for builtin in builtins {
        entries.push((
            ChecklistCategory::Builtin,
            format!("Replace {} ({})", builtin.name, builtin.reason),
            Some(builtin.line),
        ));
    }

    if !dependencies.page_items.is_empty() {
        entries.push((
            ChecklistCategory::PageItems,
            format!(
                "Map item references to page items: {}",
                dependencies.page_items.join(", ")
            ),
            None,
        ));
    }

    for table in &dependencies.tables {
        entries.push((
            ChecklistCategory::Table,
            format!("Verify table {table} exists in the target schema"),
            None,
        ));
    }

    for cursor in &dependencies.cursors {
        let note = if cursor.uses_page_items {
            " and bind its item references"
        } else {
            ""
        };
        entries.push((
            ChecklistCategory::Cursor,
            format!("Review cursor {}{note}", cursor.name),
            None,
        ));
    }

    for pattern in patterns.iter().filter(|p| p.severity == Severity::Critical) {
        entries.push((
            ChecklistCategory::Pattern,
            format!("Address {}: {}", pattern.label, pattern.apex_consideration),
            pattern.line_numbers.first().copied(),
        ));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, (category, description, line))| ChecklistItem {
            id: format!("{unit_name}-{}", idx + 1),
            category,
            description,
            line,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::dependencies::CursorInfo;

    #[test]
    fn test_items_in_generation_order() {
        let builtins = vec![CommentedBuiltin {
            name: "GO_BLOCK".into(),
            line: 4,
            original: "GO_BLOCK('X');".into(),
            reason: "navigation".into(),
        }];
        let deps = UnitDependencies {
            page_items: vec!["EMP.SAL".into()],
            tables: vec!["EMP".into()],
            cursors: vec![CursorInfo {
                name: "C1".into(),
                uses_page_items: true,
                tables: vec!["EMP".into()],
            }],
            called_procedures: vec![],
            has_forms_builtins: true,
        };

        let items = build_checklist("P", &builtins, &deps, &[]);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["P-1", "P-2", "P-3", "P-4"]);
        assert_eq!(items[0].category, ChecklistCategory::Builtin);
        assert_eq!(items[0].line, Some(4));
        assert!(items[3].description.contains("bind its item references"));
    }

    #[test]
    fn test_empty_unit_has_no_items() {
        assert!(build_checklist("P", &[], &UnitDependencies::default(), &[]).is_empty());
    }
}
