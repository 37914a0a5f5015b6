use serde::{Deserialize, Serialize};

/// Root configuration structure for formsmap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormsmapConfig {
    /// How item and state references are rewritten for the target app
    #[serde(default)]
    pub target: TargetConfig,

    /// Per-unit effort estimation weights
    #[serde(default)]
    pub effort: EffortConfig,

    /// Engine behavior
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Page used when rewriting `:BLOCK.ITEM` to `:P<n>_ITEM`
    #[serde(default = "default_page_number")]
    pub page_number: u32,

    /// Application item prefix for `:GLOBAL.*` variables
    #[serde(default = "default_global_prefix")]
    pub global_prefix: String,

    /// Application item prefix for `:PARAMETER.*` variables
    #[serde(default = "default_parameter_prefix")]
    pub parameter_prefix: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            page_number: default_page_number(),
            global_prefix: default_global_prefix(),
            parameter_prefix: default_parameter_prefix(),
        }
    }
}

impl TargetConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.page_number == 0 {
            return Err("target.page_number must be at least 1".to_string());
        }
        for (key, prefix) in [
            ("global_prefix", &self.global_prefix),
            ("parameter_prefix", &self.parameter_prefix),
        ] {
            if !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(format!(
                    "target.{key} may only contain letters, digits and '_' (got {prefix:?})"
                ));
            }
        }
        Ok(())
    }
}

fn default_page_number() -> u32 {
    1
}

fn default_global_prefix() -> String {
    "G_".to_string()
}

fn default_parameter_prefix() -> String {
    "PARAM_".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortConfig {
    #[serde(default = "default_base_hours")]
    pub base_hours: f64,

    #[serde(default = "default_hours_per_complexity_point")]
    pub hours_per_complexity_point: f64,

    #[serde(default = "default_hours_per_risk_flag")]
    pub hours_per_risk_flag: f64,

    /// Added once for every high-impact unit
    #[serde(default = "default_high_impact_bonus_hours")]
    pub high_impact_bonus_hours: f64,
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            base_hours: default_base_hours(),
            hours_per_complexity_point: default_hours_per_complexity_point(),
            hours_per_risk_flag: default_hours_per_risk_flag(),
            high_impact_bonus_hours: default_high_impact_bonus_hours(),
        }
    }
}

impl EffortConfig {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("base_hours", self.base_hours),
            ("hours_per_complexity_point", self.hours_per_complexity_point),
            ("hours_per_risk_flag", self.hours_per_risk_flag),
            ("high_impact_bonus_hours", self.high_impact_bonus_hours),
        ];
        match fields
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            Some((key, value)) => Err(format!(
                "effort.{key} must be a non-negative number (got {value})"
            )),
            None => Ok(()),
        }
    }
}

fn default_base_hours() -> f64 {
    2.0
}

fn default_hours_per_complexity_point() -> f64 {
    1.5
}

fn default_hours_per_risk_flag() -> f64 {
    2.0
}

fn default_high_impact_bonus_hours() -> f64 {
    4.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Run per-unit extraction on the rayon thread pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Matched lines kept per semantic pattern
    #[serde(default = "default_max_excerpts")]
    pub max_excerpts: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            max_excerpts: default_max_excerpts(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_excerpts == 0 {
            return Err("analysis.max_excerpts must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_parallel() -> bool {
    true
}

fn default_max_excerpts() -> usize {
    3
}
