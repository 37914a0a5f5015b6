use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of program unit found in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Procedure,
    Function,
    PackageSpec,
    PackageBody,
}

impl UnitType {
    pub fn is_package(&self) -> bool {
        matches!(self, UnitType::PackageSpec | UnitType::PackageBody)
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitType::Procedure => "Procedure",
            UnitType::Function => "Function",
            UnitType::PackageSpec => "Package Spec",
            UnitType::PackageBody => "Package Body",
        };
        write!(f, "{label}")
    }
}

/// Coarse estimate of how consequential a unit is to data integrity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactScore {
    High,
    Medium,
    Low,
}

impl ImpactScore {
    pub fn from_points(points: u32) -> Self {
        match points {
            p if p >= 5 => ImpactScore::High,
            p if p >= 2 => ImpactScore::Medium,
            _ => ImpactScore::Low,
        }
    }
}

impl fmt::Display for ImpactScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactScore::High => write!(f, "high"),
            ImpactScore::Medium => write!(f, "medium"),
            ImpactScore::Low => write!(f, "low"),
        }
    }
}

/// Logic category assigned to a program unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicCategory {
    #[serde(rename = "UI Logic")]
    UiLogic,
    #[serde(rename = "Transaction Logic")]
    TransactionLogic,
    #[serde(rename = "Validation Logic")]
    ValidationLogic,
    #[serde(rename = "Integration Logic")]
    IntegrationLogic,
    #[serde(rename = "Security/Access Control")]
    SecurityAccessControl,
    #[serde(rename = "Business Logic")]
    BusinessLogic,
    #[serde(rename = "Utility/Helper")]
    UtilityHelper,
    Unknown,
}

impl LogicCategory {
    pub fn label(&self) -> &'static str {
        match self {
            LogicCategory::UiLogic => "UI Logic",
            LogicCategory::TransactionLogic => "Transaction Logic",
            LogicCategory::ValidationLogic => "Validation Logic",
            LogicCategory::IntegrationLogic => "Integration Logic",
            LogicCategory::SecurityAccessControl => "Security/Access Control",
            LogicCategory::BusinessLogic => "Business Logic",
            LogicCategory::UtilityHelper => "Utility/Helper",
            LogicCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LogicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Severity of a semantic migration pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Important,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Important => write!(f, "IMPORTANT"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}
