//! End-to-end analysis of one form.
//!
//! Phase one extracts every unit independently and may run on the rayon
//! pool. Everything after it needs the whole file: call resolution,
//! trigger analysis, enrichment, hierarchy and readiness run in that order
//! over immutable inputs.

use crate::classification::{enrich_units, ClassificationRules, ProgramUnitEnriched};
use crate::config::FormsmapConfig;
use crate::extraction::{
    extract_boundaries, extract_unit, resolve_called_procedures, BuiltinVocabulary,
    ExtractedUnit, UnitBoundary,
};
use crate::hierarchy::{build_hierarchy, FormLogicHierarchy};
use crate::readiness::{assess_readiness, MigrationReadiness};
use crate::triggers::{analyze_trigger, FormTrigger, TriggerAnalysis};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, debug_span, info, info_span};

/// Rule tables shared by every stage.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub builtins: BuiltinVocabulary,
    pub classification: ClassificationRules,
}

impl RuleSet {
    pub fn standard() -> Self {
        Self {
            builtins: BuiltinVocabulary::standard(),
            classification: ClassificationRules::standard(),
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Input for one form: its program-unit source and decoded triggers.
#[derive(Debug, Clone, Default)]
pub struct FormSource {
    pub name: String,
    pub program_units: String,
    pub triggers: Vec<FormTrigger>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormAnalysis {
    pub form: String,
    pub units: Vec<ExtractedUnit>,
    pub program_units: Vec<ProgramUnitEnriched>,
    pub triggers: Vec<TriggerAnalysis>,
    pub hierarchy: FormLogicHierarchy,
    pub readiness: MigrationReadiness,
}

impl FormAnalysis {
    /// True when neither program units nor triggers were found.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.triggers.is_empty()
    }
}

pub struct Engine {
    rules: RuleSet,
    config: FormsmapConfig,
}

impl Engine {
    pub fn new(rules: RuleSet, config: FormsmapConfig) -> Self {
        Self { rules, config }
    }

    pub fn with_config(config: FormsmapConfig) -> Self {
        Self::new(RuleSet::standard(), config)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &FormsmapConfig {
        &self.config
    }

    /// Phase one and two over a single source text. Units come back in file
    /// order with `called_procedures` resolved.
    pub fn extract_units(&self, source: &str) -> Vec<ExtractedUnit> {
        let boundaries = extract_boundaries(source);
        let lines: Vec<&str> = source.lines().collect();

        let units = {
            let _span = debug_span!("extract", units = boundaries.len()).entered();
            self.extract_all(&boundaries, &lines)
        };

        let _span = debug_span!("resolve").entered();
        resolve_called_procedures(units)
    }

    fn extract_all(&self, boundaries: &[UnitBoundary], lines: &[&str]) -> Vec<ExtractedUnit> {
        let vocabulary = &self.rules.builtins;
        let max_excerpts = self.config.analysis.max_excerpts;

        if self.config.analysis.parallel {
            boundaries
                .par_iter()
                .map(|boundary| extract_unit(boundary, lines, vocabulary, max_excerpts))
                .collect()
        } else {
            boundaries
                .iter()
                .map(|boundary| extract_unit(boundary, lines, vocabulary, max_excerpts))
                .collect()
        }
    }

    pub fn analyze(&self, form: &FormSource) -> FormAnalysis {
        let span = info_span!("analyze_form", form = %form.name);
        let _guard = span.enter();

        let units = self.extract_units(&form.program_units);
        let registry: BTreeSet<String> = units.iter().map(|u| u.name.clone()).collect();
        info!(
            units = units.len(),
            triggers = form.triggers.len(),
            "Extracted program units"
        );

        let triggers: Vec<TriggerAnalysis> = form
            .triggers
            .iter()
            .map(|trigger| {
                analyze_trigger(
                    trigger,
                    &registry,
                    &self.rules.builtins,
                    &self.config.target,
                )
            })
            .collect();

        let program_units = {
            let _span = debug_span!("enrich").entered();
            enrich_units(
                &units,
                &triggers,
                &self.rules.classification,
                &self.rules.builtins,
            )
        };
        debug!(
            main_functions = program_units.iter().filter(|u| u.is_main_function).count(),
            "Enriched program units"
        );

        let hierarchy = {
            let _span = debug_span!("hierarchy").entered();
            build_hierarchy(&triggers, &program_units)
        };

        let readiness = {
            let _span = debug_span!("readiness").entered();
            assess_readiness(&program_units, &self.config.effort)
        };

        FormAnalysis {
            form: form.name.clone(),
            units,
            program_units,
            triggers,
            hierarchy,
            readiness,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_config(FormsmapConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use indoc::indoc;

    const SOURCE: &str = indoc! {"
        PROCEDURE save_order IS
        BEGIN
          validate_order;
          INSERT INTO orders VALUES (1);
          COMMIT;
        END save_order;

        PROCEDURE validate_order IS
        BEGIN
          IF :ORDERS.QTY < 0 THEN
            RAISE FORM_TRIGGER_FAILURE;
          END IF;
        END validate_order;
    "};

    fn form() -> FormSource {
        FormSource {
            name: "ORDERS".into(),
            program_units: SOURCE.into(),
            triggers: vec![FormTrigger {
                name: "WHEN-BUTTON-PRESSED".into(),
                code: "save_order;".into(),
                block: Some("CONTROL".into()),
                item: Some("SAVE".into()),
            }],
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let parallel = Engine::default().analyze(&form());
        let sequential = Engine::with_config(FormsmapConfig {
            analysis: AnalysisConfig {
                parallel: false,
                ..AnalysisConfig::default()
            },
            ..FormsmapConfig::default()
        })
        .analyze(&form());
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_trigger_calls_feed_called_by() {
        let analysis = Engine::default().analyze(&form());
        let save = analysis
            .program_units
            .iter()
            .find(|u| u.name == "SAVE_ORDER")
            .unwrap();
        assert_eq!(
            save.called_by,
            vec!["CONTROL.SAVE.WHEN-BUTTON-PRESSED".to_string()]
        );
        assert_eq!(save.dependencies, vec!["VALIDATE_ORDER".to_string()]);

        let entry = &analysis.hierarchy.entry_points[0];
        assert_eq!(entry.children[0].name, "SAVE_ORDER");
        assert_eq!(entry.children[0].children[0].name, "VALIDATE_ORDER");
    }

    #[test]
    fn test_empty_form() {
        let analysis = Engine::default().analyze(&FormSource::default());
        assert!(analysis.is_empty());
        assert_eq!(analysis.readiness.total_units, 0);
    }
}
