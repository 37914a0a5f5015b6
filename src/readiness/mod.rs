//! Migration readiness aggregation.
//!
//! Rolls per-unit scores into complexity buckets, a critical-risk list and
//! a ranked remediation plan with effort estimates.

use crate::classification::{ProgramUnitEnriched, RiskFlag};
use crate::config::EffortConfig;
use crate::core::{ImpactScore, LogicCategory};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

/// Builtins whose replacement always needs a redesign.
const MANUAL_BUILTINS: &[&str] = &[
    "HOST",
    "SYNCHRONIZE",
    "FORMS_OLE",
    "CALL_FORM",
    "OPEN_FORM",
    "NEW_FORM",
    "RUN_PRODUCT",
];

const HOURS_PER_DAY: f64 = 8.0;
const MAX_HOURS_DISPLAY: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Critical => write!(f, "critical"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskItem {
    pub unit: String,
    pub risk: String,
    pub severity: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityItem {
    /// Rank in the plan, 1 = do first
    pub priority: usize,
    pub name: String,
    pub classification: LogicCategory,
    pub impact_score: ImpactScore,
    pub complexity: u8,
    pub reason: String,
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReadiness {
    pub overall_complexity: u8,
    pub high_complexity_count: usize,
    pub medium_complexity_count: usize,
    pub low_complexity_count: usize,
    pub total_units: usize,
    pub classification_counts: BTreeMap<LogicCategory, usize>,
    pub critical_risks: Vec<RiskItem>,
    pub priority_list: Vec<PriorityItem>,
    pub total_estimated_hours: f64,
    pub estimated_effort: String,
}

/// Remediation tier; lower tiers are scheduled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityTier {
    HighImpactRisky,
    HighImpact,
    MediumImpactRisky,
    MediumImpact,
    LowImpactRisky,
    LowImpact,
}

impl PriorityTier {
    pub fn for_unit(unit: &ProgramUnitEnriched) -> Self {
        let risky = !unit.risk_flags.is_empty();
        match (unit.impact_score, risky) {
            (ImpactScore::High, true) => PriorityTier::HighImpactRisky,
            (ImpactScore::High, false) => PriorityTier::HighImpact,
            (ImpactScore::Medium, true) => PriorityTier::MediumImpactRisky,
            (ImpactScore::Medium, false) => PriorityTier::MediumImpact,
            (ImpactScore::Low, true) => PriorityTier::LowImpactRisky,
            (ImpactScore::Low, false) => PriorityTier::LowImpact,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriorityTier::HighImpactRisky => "High impact with migration risks",
            PriorityTier::HighImpact => "High impact",
            PriorityTier::MediumImpactRisky => "Medium impact with migration risks",
            PriorityTier::MediumImpact => "Medium impact",
            PriorityTier::LowImpactRisky => "Low impact with migration risks",
            PriorityTier::LowImpact => "Low impact",
        }
    }
}

pub fn risk_severity(flag: &RiskFlag, impact: ImpactScore) -> RiskLevel {
    let base = match flag {
        RiskFlag::DynamicSql | RiskFlag::DmlWithoutCommit => RiskLevel::High,
        RiskFlag::ExternalPackage { name } if name.starts_with("UTL_") => RiskLevel::High,
        RiskFlag::ExternalPackage { .. } => RiskLevel::Medium,
        RiskFlag::FormsBuiltin { name } if MANUAL_BUILTINS.contains(&name.as_str()) => {
            RiskLevel::High
        }
        RiskFlag::FormsBuiltin { .. } => RiskLevel::Medium,
    };
    if base == RiskLevel::High && impact == ImpactScore::High {
        RiskLevel::Critical
    } else {
        base
    }
}

fn risk_description(flag: &RiskFlag) -> String {
    match flag {
        RiskFlag::FormsBuiltin { name } => {
            format!("{name} is a Forms runtime call with no direct APEX equivalent")
        }
        RiskFlag::DmlWithoutCommit => {
            "Performs DML but relies on a caller to commit".to_string()
        }
        RiskFlag::DynamicSql => "Builds SQL at runtime; review for injection and bind usage".to_string(),
        RiskFlag::ExternalPackage { name } => {
            format!("Depends on {name}, which may need grants or a different integration")
        }
    }
}

pub fn estimated_hours(unit: &ProgramUnitEnriched, effort: &EffortConfig) -> f64 {
    let bonus = if unit.impact_score == ImpactScore::High {
        effort.high_impact_bonus_hours
    } else {
        0.0
    };
    effort.base_hours
        + effort.hours_per_complexity_point * f64::from(unit.complexity)
        + effort.hours_per_risk_flag * unit.risk_flags.len() as f64
        + bonus
}

/// Textual range around a point estimate.
pub fn effort_range(total_hours: f64) -> String {
    let low = total_hours * 0.8;
    let high = total_hours * 1.25;
    if high <= MAX_HOURS_DISPLAY {
        format!("{:.0}-{:.0} hours", low.floor(), high.ceil())
    } else {
        format!(
            "{:.0}-{:.0} days",
            (low / HOURS_PER_DAY).floor(),
            (high / HOURS_PER_DAY).ceil()
        )
    }
}

fn priority_reason(unit: &ProgramUnitEnriched, tier: PriorityTier) -> String {
    let mut reason = tier.label().to_string();
    if unit.is_main_function {
        reason.push_str("; main function");
    }
    if !unit.risk_flags.is_empty() {
        reason.push_str(&format!("; {} risk flag(s)", unit.risk_flags.len()));
    }
    reason
}

pub fn assess_readiness(units: &[ProgramUnitEnriched], effort: &EffortConfig) -> MigrationReadiness {
    let count_if = |pred: fn(u8) -> bool| units.iter().filter(|u| pred(u.complexity)).count();

    let overall_complexity = if units.is_empty() {
        1
    } else {
        let sum: u32 = units.iter().map(|u| u32::from(u.complexity)).sum();
        (f64::from(sum) / units.len() as f64).round().clamp(1.0, 10.0) as u8
    };

    let mut classification_counts = BTreeMap::new();
    for unit in units {
        *classification_counts.entry(unit.classification).or_insert(0) += 1;
    }

    let critical_risks = units
        .iter()
        .flat_map(|unit| {
            unit.risk_flags.iter().map(move |flag| RiskItem {
                unit: unit.name.clone(),
                risk: flag.to_string(),
                severity: risk_severity(flag, unit.impact_score),
                description: risk_description(flag),
            })
        })
        .collect();

    let mut ranked: Vec<(PriorityTier, &ProgramUnitEnriched)> =
        units.iter().map(|u| (PriorityTier::for_unit(u), u)).collect();
    ranked.sort_by_key(|(tier, u)| (*tier, !u.is_main_function, Reverse(u.complexity), u.name.clone()));

    let priority_list: Vec<PriorityItem> = ranked
        .into_iter()
        .enumerate()
        .map(|(idx, (tier, unit))| PriorityItem {
            priority: idx + 1,
            name: unit.name.clone(),
            classification: unit.classification,
            impact_score: unit.impact_score,
            complexity: unit.complexity,
            reason: priority_reason(unit, tier),
            estimated_hours: estimated_hours(unit, effort),
        })
        .collect();

    let total_estimated_hours: f64 = priority_list.iter().map(|p| p.estimated_hours).sum();

    MigrationReadiness {
        overall_complexity,
        high_complexity_count: count_if(|c| c >= 7),
        medium_complexity_count: count_if(|c| (4..=6).contains(&c)),
        low_complexity_count: count_if(|c| c <= 3),
        total_units: units.len(),
        classification_counts,
        critical_risks,
        priority_list,
        estimated_effort: effort_range(total_estimated_hours),
        total_estimated_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnitType;

    fn unit(name: &str, impact: ImpactScore, complexity: u8, flags: Vec<RiskFlag>) -> ProgramUnitEnriched {
        ProgramUnitEnriched {
            name: name.into(),
            unit_type: UnitType::Procedure,
            parameters: vec![],
            return_type: None,
            line_count: 10,
            dependencies: vec![],
            called_by: vec![],
            is_main_function: false,
            main_function_reason: None,
            business_responsibility: String::new(),
            classification: LogicCategory::BusinessLogic,
            impact_score: impact,
            complexity,
            risk_flags: flags,
            controls_transaction: false,
        }
    }

    #[test]
    fn test_empty_form() {
        let readiness = assess_readiness(&[], &EffortConfig::default());
        assert_eq!(readiness.overall_complexity, 1);
        assert_eq!(readiness.total_units, 0);
        assert!(readiness.priority_list.is_empty());
        assert_eq!(readiness.estimated_effort, "0-0 hours");
    }

    #[test]
    fn test_buckets_and_overall() {
        let units = vec![
            unit("A", ImpactScore::Low, 2, vec![]),
            unit("B", ImpactScore::Low, 5, vec![]),
            unit("C", ImpactScore::Low, 8, vec![]),
        ];
        let readiness = assess_readiness(&units, &EffortConfig::default());
        assert_eq!(readiness.low_complexity_count, 1);
        assert_eq!(readiness.medium_complexity_count, 1);
        assert_eq!(readiness.high_complexity_count, 1);
        assert_eq!(readiness.overall_complexity, 5);
        assert_eq!(readiness.classification_counts[&LogicCategory::BusinessLogic], 3);
    }

    #[test]
    fn test_priority_order() {
        let units = vec![
            unit("LOW", ImpactScore::Low, 9, vec![]),
            unit("HIGH", ImpactScore::High, 2, vec![]),
            unit("HIGH_RISKY", ImpactScore::High, 1, vec![RiskFlag::DynamicSql]),
            unit("MED_A", ImpactScore::Medium, 3, vec![]),
            unit("MED_B", ImpactScore::Medium, 6, vec![]),
        ];
        let readiness = assess_readiness(&units, &EffortConfig::default());
        let order: Vec<_> = readiness.priority_list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["HIGH_RISKY", "HIGH", "MED_B", "MED_A", "LOW"]);
        let ranks: Vec<_> = readiness.priority_list.iter().map(|p| p.priority).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_risk_severity_upgrades_on_high_impact() {
        assert_eq!(risk_severity(&RiskFlag::DynamicSql, ImpactScore::High), RiskLevel::Critical);
        assert_eq!(risk_severity(&RiskFlag::DynamicSql, ImpactScore::Low), RiskLevel::High);
        let go_block = RiskFlag::FormsBuiltin { name: "GO_BLOCK".into() };
        assert_eq!(risk_severity(&go_block, ImpactScore::High), RiskLevel::Medium);
        let host = RiskFlag::FormsBuiltin { name: "HOST".into() };
        assert_eq!(risk_severity(&host, ImpactScore::Medium), RiskLevel::High);
    }

    #[test]
    fn test_forms_ole_call_is_a_manual_redesign_risk() {
        let vocab = crate::extraction::BuiltinVocabulary::standard();
        let code = "v_app := FORMS_OLE.GET_INTERFACE_POINTER('CTRL.DOC');\nFORMS_OLE.INVOKE_METHOD(v_app, 'Save');";
        let flags = crate::classification::scoring::risk_flags(code, &vocab);
        assert_eq!(flags, vec![RiskFlag::FormsBuiltin { name: "FORMS_OLE".into() }]);

        let readiness = assess_readiness(
            &[unit("EXPORT_DOC", ImpactScore::High, 3, flags)],
            &EffortConfig::default(),
        );
        assert_eq!(readiness.critical_risks.len(), 1);
        assert_eq!(readiness.critical_risks[0].risk, "Forms builtin: FORMS_OLE");
        assert_eq!(readiness.critical_risks[0].severity, RiskLevel::Critical);
        let ole = RiskFlag::FormsBuiltin { name: "FORMS_OLE".into() };
        assert_eq!(risk_severity(&ole, ImpactScore::Low), RiskLevel::High);
    }

    #[test]
    fn test_hours_and_effort_range() {
        let u = unit("A", ImpactScore::High, 4, vec![RiskFlag::DynamicSql]);
        // 2 + 1.5 * 4 + 2 + 4
        assert_eq!(estimated_hours(&u, &EffortConfig::default()), 14.0);
        assert_eq!(effort_range(14.0), "11-18 hours");
        assert_eq!(effort_range(100.0), "10-16 days");
    }
}
