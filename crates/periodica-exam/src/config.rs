//! Objective weight configuration.
//!
//! Weights are plain data loaded from TOML; the defaults reproduce the
//! established examination timetabling weighting (direct conflicts dominate,
//! room size is nearly free). Loading policy beyond TOML parsing belongs to
//! the driver, not this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a weights file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-category objective weights.
///
/// The total objective is the weighted sum of every category counter; see
/// [`ExamTimetable::total_value`](crate::model::ExamTimetable::total_value).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExamWeights {
    /// Student enrolled in two exams at the same period (or scheduled while
    /// unavailable).
    pub direct_conflict: f64,
    /// Student with more than two exams on one day.
    pub more_than_two_a_day: f64,
    /// Student with exams in consecutive periods.
    pub back_to_back_conflict: f64,
    /// Back-to-back conflict with rooms further apart than the distance
    /// limit.
    pub distance_back_to_back_conflict: f64,
    pub instructor_direct_conflict: f64,
    pub instructor_more_than_two_a_day: f64,
    pub instructor_back_to_back_conflict: f64,
    pub instructor_distance_back_to_back_conflict: f64,
    /// Period placement penalties.
    pub period: f64,
    /// Seats above the exam's size.
    pub room_size: f64,
    /// Splitting an exam across several rooms.
    pub room_split: f64,
    /// Average distance between the rooms of a split exam.
    pub room_split_distance: f64,
    /// Room placement penalties.
    pub room: f64,
    /// Soft distribution constraint violations.
    pub distribution: f64,
    /// Exam rotation (prefer early periods for exams that sat late before).
    pub rotation: f64,
    /// Distance from the initial assignment (minimal perturbation).
    pub perturbation: f64,
    /// Large exam placed on or after the front-load cutoff period.
    pub large: f64,
}

impl Default for ExamWeights {
    fn default() -> Self {
        ExamWeights {
            direct_conflict: 1000.0,
            more_than_two_a_day: 100.0,
            back_to_back_conflict: 10.0,
            distance_back_to_back_conflict: 25.0,
            instructor_direct_conflict: 1000.0,
            instructor_more_than_two_a_day: 100.0,
            instructor_back_to_back_conflict: 10.0,
            instructor_distance_back_to_back_conflict: 25.0,
            period: 1.0,
            room_size: 0.0001,
            room_split: 10.0,
            room_split_distance: 0.01,
            room: 0.1,
            distribution: 1.0,
            rotation: 0.001,
            perturbation: 0.01,
            large: 1.0,
        }
    }
}

/// Model configuration: weights plus the global switches that change what
/// counts as a conflict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExamConfig {
    pub weights: ExamWeights,
    /// Count adjacency across a day break as back-to-back.
    pub day_break_back_to_back: bool,
    /// Distance limit for distance back-to-back conflicts; `None` disables
    /// the criterion.
    pub back_to_back_distance: Option<f64>,
    /// Exams of at least this size are subject to the front-load penalty;
    /// `None` disables it.
    pub large_size: Option<u32>,
    /// Fraction of the period sequence after which large exams are
    /// penalized.
    pub large_period: Option<f64>,
    /// Minimal perturbation mode: penalize moving away from the initial
    /// assignment.
    pub minimal_perturbation: bool,
}

impl ExamConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// The front-load cutoff fraction, defaulting to two thirds of the
    /// period sequence.
    pub fn large_period(&self) -> f64 {
        self.large_period.unwrap_or(0.67)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_established_weighting() {
        let w = ExamWeights::default();
        assert_eq!(w.direct_conflict, 1000.0);
        assert_eq!(w.back_to_back_conflict, 10.0);
        assert_eq!(w.room_size, 0.0001);
        assert_eq!(w.room, 0.1);
    }

    #[test]
    fn partial_toml_overrides_only_named_weights() {
        let config = ExamConfig::from_toml_str(
            r#"
            day_break_back_to_back = true
            back_to_back_distance = 67.0

            [weights]
            direct_conflict = 500.0
            "#,
        )
        .unwrap();
        assert!(config.day_break_back_to_back);
        assert_eq!(config.back_to_back_distance, Some(67.0));
        assert_eq!(config.weights.direct_conflict, 500.0);
        assert_eq!(config.weights.more_than_two_a_day, 100.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ExamConfig::from_toml_str("no_such_switch = 1").is_err());
    }
}
