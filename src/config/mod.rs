//! Configuration loading.
//!
//! Settings come from `.formsmap.toml`, found by walking up from the
//! working directory, or from an explicit `--config` path. Every field has
//! a default so an empty or missing file is valid.

mod core;
mod loader;

pub use self::core::{AnalysisConfig, EffortConfig, FormsmapConfig, TargetConfig};
pub use loader::{
    directory_ancestors, discover_config, load_config, load_config_from,
    parse_and_validate_config, CONFIG_FILE_NAME,
};

/// Template written by `formsmap init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# formsmap configuration

[target]
# Page number used when rewriting :BLOCK.ITEM references to :P<n>_ITEM
page_number = 1
# Application item prefixes for :GLOBAL.* and :PARAMETER.* variables
global_prefix = "G_"
parameter_prefix = "PARAM_"

[effort]
base_hours = 2.0
hours_per_complexity_point = 1.5
hours_per_risk_flag = 2.0
high_impact_bonus_hours = 4.0

[analysis]
# Extract program units in parallel
parallel = true
# Matched lines kept for each semantic pattern
max_excerpts = 3
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_matches_defaults() {
        let parsed = parse_and_validate_config(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, FormsmapConfig::default());
    }
}
