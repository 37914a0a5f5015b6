//! Core types shared by every analysis stage.

pub mod errors;
pub mod types;

pub use errors::{Error, Result, ResultExt};
pub use types::{ImpactScore, LogicCategory, Severity, UnitType};
