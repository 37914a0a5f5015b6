//! Main function identification and responsibility summaries.

use super::ProgramUnitEnriched;
use crate::core::{ImpactScore, LogicCategory};
use crate::triggers::TriggerAnalysis;
use std::collections::BTreeSet;

const MIN_TRIGGER_CALLERS: usize = 2;
const MIN_DEPENDENCIES: usize = 3;
const HIGH_COMPLEXITY: u8 = 7;
const LARGE_BUSINESS_UNIT_LINES: usize = 50;

/// Every reason `unit` qualifies as a main function. Empty when it does
/// not.
pub fn main_function_reasons(unit: &ProgramUnitEnriched, trigger_callers: usize) -> Vec<String> {
    let mut reasons = Vec::new();

    if trigger_callers >= MIN_TRIGGER_CALLERS {
        reasons.push(format!("Called by {trigger_callers} triggers"));
    }
    if unit.classification == LogicCategory::TransactionLogic && unit.controls_transaction {
        reasons.push("Controls transaction boundaries".to_string());
    }
    if unit.dependencies.len() >= MIN_DEPENDENCIES {
        reasons.push(format!(
            "Orchestrates {} other program units",
            unit.dependencies.len()
        ));
    }
    if unit.complexity >= HIGH_COMPLEXITY && unit.impact_score == ImpactScore::High {
        reasons.push(format!(
            "High complexity ({}) with high impact",
            unit.complexity
        ));
    }
    if unit.classification == LogicCategory::BusinessLogic
        && unit.line_count > LARGE_BUSINESS_UNIT_LINES
    {
        reasons.push(format!("Substantial business logic ({} lines)", unit.line_count));
    }

    reasons
}

/// Number of distinct triggers that call `unit_name`. Triggers are told
/// apart by name and attachment point.
pub fn trigger_callers(unit_name: &str, triggers: &[TriggerAnalysis]) -> usize {
    triggers
        .iter()
        .filter(|t| t.calls(unit_name))
        .map(TriggerAnalysis::qualified_name)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Flag main functions across all enriched units. Only `is_main_function`
/// and `main_function_reason` change.
pub fn identify_main_functions(
    units: Vec<ProgramUnitEnriched>,
    triggers: &[TriggerAnalysis],
) -> Vec<ProgramUnitEnriched> {
    units
        .into_iter()
        .map(|mut unit| {
            let reasons = main_function_reasons(&unit, trigger_callers(&unit.name, triggers));
            unit.is_main_function = !reasons.is_empty();
            unit.main_function_reason = if reasons.is_empty() {
                None
            } else {
                Some(reasons.join("; "))
            };
            unit
        })
        .collect()
}

/// One-sentence summary of what a unit is responsible for.
pub fn business_responsibility(name: &str, category: LogicCategory) -> String {
    let readable = name.replace('_', " ").to_lowercase();
    match category {
        LogicCategory::UiLogic => format!("Controls screen behavior and navigation for {readable}"),
        LogicCategory::TransactionLogic => {
            format!("Persists and commits data changes for {readable}")
        }
        LogicCategory::ValidationLogic => {
            format!("Enforces data validation rules for {readable}")
        }
        LogicCategory::IntegrationLogic => {
            format!("Exchanges data with external systems for {readable}")
        }
        LogicCategory::SecurityAccessControl => {
            format!("Restricts access and checks privileges for {readable}")
        }
        LogicCategory::BusinessLogic => {
            format!("Implements business rules and calculations for {readable}")
        }
        LogicCategory::UtilityHelper => format!("Provides a reusable helper for {readable}"),
        LogicCategory::Unknown => format!("Performs {readable}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnitType;

    fn unit(classification: LogicCategory) -> ProgramUnitEnriched {
        ProgramUnitEnriched {
            name: "SAVE_ORDER".into(),
            unit_type: UnitType::Procedure,
            parameters: vec![],
            return_type: None,
            line_count: 10,
            dependencies: vec![],
            called_by: vec![],
            is_main_function: false,
            main_function_reason: None,
            business_responsibility: String::new(),
            classification,
            impact_score: ImpactScore::Low,
            complexity: 1,
            risk_flags: vec![],
            controls_transaction: false,
        }
    }

    #[test]
    fn test_plain_unit_is_not_main() {
        assert!(main_function_reasons(&unit(LogicCategory::Unknown), 1).is_empty());
    }

    #[test]
    fn test_reasons_accumulate() {
        let mut u = unit(LogicCategory::TransactionLogic);
        u.controls_transaction = true;
        u.dependencies = vec!["A".into(), "B".into(), "C".into()];
        let reasons = main_function_reasons(&u, 2);
        assert_eq!(reasons.len(), 3);

        let flagged = identify_main_functions(vec![u], &[]);
        assert!(flagged[0].is_main_function);
        assert_eq!(
            flagged[0].main_function_reason.as_deref(),
            Some("Controls transaction boundaries; Orchestrates 3 other program units")
        );
    }

    #[test]
    fn test_large_business_unit() {
        let mut u = unit(LogicCategory::BusinessLogic);
        u.line_count = 51;
        assert_eq!(main_function_reasons(&u, 0).len(), 1);
        u.line_count = 50;
        assert!(main_function_reasons(&u, 0).is_empty());
    }

    #[test]
    fn test_responsibility_templates() {
        assert_eq!(
            business_responsibility("CHECK_CREDIT", LogicCategory::ValidationLogic),
            "Enforces data validation rules for check credit"
        );
    }
}
