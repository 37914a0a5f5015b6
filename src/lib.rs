// Export modules for library usage
pub mod classification;
pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod core;
pub mod extraction;
pub mod hierarchy;
pub mod io;
pub mod patterns;
pub mod pipeline;
pub mod readiness;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{Error, ImpactScore, LogicCategory, Result, Severity, UnitType};

pub use crate::extraction::{
    extract_boundaries, extract_unit, resolve_called_procedures, BuiltinVocabulary,
    ExtractedUnit, UnitBoundary, UnitDependencies,
};

pub use crate::patterns::{detect_patterns, PatternId, SemanticPattern, SemanticPatternResult};

pub use crate::classification::{enrich_units, ClassificationRules, ProgramUnitEnriched};

pub use crate::triggers::{analyze_trigger, classify_trigger, FormTrigger, TriggerAnalysis};

pub use crate::hierarchy::{build_hierarchy, FormLogicHierarchy, HierarchyNode};

pub use crate::readiness::{assess_readiness, MigrationReadiness};

pub use crate::config::FormsmapConfig;

pub use crate::pipeline::{Engine, FormAnalysis, FormSource, RuleSet};

pub use crate::io::output::{create_writer, OutputFormat, OutputWriter};
