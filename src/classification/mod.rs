//! Program unit classification and scoring.
//!
//! Turns extracted units into [`ProgramUnitEnriched`] records: logic
//! category, complexity, impact, risk flags and the callers of each unit.
//! Main-function identification runs last because it needs every unit's
//! callers.

pub mod main_function;
pub mod rules;
pub mod scoring;

pub use main_function::{business_responsibility, identify_main_functions};
pub use rules::{ClassificationRule, ClassificationRules};
pub use scoring::{ComplexityLevel, RiskFlag, UnitComplexity};

use crate::core::{ImpactScore, LogicCategory, UnitType};
use crate::extraction::{BuiltinVocabulary, ExtractedUnit, Parameter};
use crate::triggers::TriggerAnalysis;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramUnitEnriched {
    pub name: String,
    pub unit_type: UnitType,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub line_count: usize,
    /// Other units this unit calls
    pub dependencies: Vec<String>,
    /// Triggers and units that call this unit
    pub called_by: Vec<String>,
    pub is_main_function: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_function_reason: Option<String>,
    pub business_responsibility: String,
    pub classification: LogicCategory,
    pub impact_score: ImpactScore,
    pub complexity: u8,
    pub risk_flags: Vec<RiskFlag>,
    pub controls_transaction: bool,
}

/// Enrich a single unit. `called_by` is supplied by the caller because it
/// depends on the rest of the form.
pub fn enrich_unit(
    unit: &ExtractedUnit,
    called_by: Vec<String>,
    rules: &ClassificationRules,
    vocabulary: &BuiltinVocabulary,
) -> ProgramUnitEnriched {
    let code = &unit.original_code;
    let classification = rules.classify(&unit.name, unit.unit_type, code);

    ProgramUnitEnriched {
        name: unit.name.clone(),
        unit_type: unit.unit_type,
        parameters: unit.parameters.clone(),
        return_type: unit.return_type.clone(),
        line_count: unit.line_count(),
        dependencies: unit.dependencies.called_procedures.clone(),
        called_by,
        is_main_function: false,
        main_function_reason: None,
        business_responsibility: business_responsibility(&unit.name, classification),
        classification,
        impact_score: scoring::impact_score(code),
        complexity: unit.complexity.score,
        risk_flags: scoring::risk_flags(code, vocabulary),
        controls_transaction: scoring::controls_transaction(code),
    }
}

/// Callers of `name` among triggers and other units, sorted.
fn callers_of(name: &str, units: &[ExtractedUnit], triggers: &[TriggerAnalysis]) -> Vec<String> {
    let from_triggers = triggers
        .iter()
        .filter(|t| t.calls(name))
        .map(TriggerAnalysis::qualified_name);
    let from_units = units
        .iter()
        .filter(|u| u.name != name && u.dependencies.called_procedures.iter().any(|c| c == name))
        .map(|u| u.name.clone());

    from_triggers
        .chain(from_units)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Enrich every unit and flag main functions.
pub fn enrich_units(
    units: &[ExtractedUnit],
    triggers: &[TriggerAnalysis],
    rules: &ClassificationRules,
    vocabulary: &BuiltinVocabulary,
) -> Vec<ProgramUnitEnriched> {
    let enriched = units
        .iter()
        .map(|unit| {
            enrich_unit(
                unit,
                callers_of(&unit.name, units, triggers),
                rules,
                vocabulary,
            )
        })
        .collect();
    identify_main_functions(enriched, triggers)
}
