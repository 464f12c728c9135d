//! Selection configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a selection config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Rounding applied to expected-space figures before comparing against
/// section limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rounding {
    None,
    Ceil,
    Floor,
    #[default]
    Round,
}

impl Rounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::None => value,
            Rounding::Ceil => value.ceil(),
            Rounding::Floor => value.floor(),
            Rounding::Round => value.round(),
        }
    }
}

/// Tuning knobs of the branch-and-bound selection and the criterion tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Wall-clock budget per student; zero disables the timeout.
    pub timeout_ms: u64,
    /// Stop exploring other values once a selected section fits without
    /// conflict.
    pub branch_when_selected_has_no_conflict: bool,
    /// Disable the `can_improve` bound and search the full tree. Slower,
    /// but exact even for criterion tiers that are not monotonic.
    pub exhaustive: bool,
    /// Multiplier on expected space when deciding over-expectedness.
    pub over_expected_percentage: f64,
    pub rounding: Rounding,
    /// Sections further apart than this, back to back, are a distance
    /// conflict.
    pub distance_limit: f64,
    /// Weight of course-course overlaps in the quality tier.
    pub course_overlap_weight: f64,
    /// Weight of free-time overlaps in the quality tier.
    pub free_time_overlap_weight: f64,
    /// Weight of unavailability overlaps in the quality tier.
    pub unavailability_weight: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            timeout_ms: 1000,
            branch_when_selected_has_no_conflict: false,
            exhaustive: false,
            over_expected_percentage: 1.0,
            rounding: Rounding::Round,
            distance_limit: 670.0,
            course_overlap_weight: 0.5,
            free_time_overlap_weight: 0.5,
            unavailability_weight: 0.5,
        }
    }
}

impl SelectionConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = SelectionConfig::from_toml_str(
            r#"
            timeout_ms = 250
            rounding = "ceil"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.rounding, Rounding::Ceil);
        assert_eq!(config.over_expected_percentage, 1.0);
        assert!(!config.exhaustive);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(SelectionConfig::from_toml_str("no_such_switch = true").is_err());
    }

    #[test]
    fn rounding_modes() {
        assert_eq!(Rounding::Ceil.apply(1.2), 2.0);
        assert_eq!(Rounding::Floor.apply(1.8), 1.0);
        assert_eq!(Rounding::Round.apply(1.5), 2.0);
        assert_eq!(Rounding::None.apply(1.5), 1.5);
    }
}
