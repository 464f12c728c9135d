//! Load-time error types.
//!
//! Only model construction can fail; once a model is built, conflict
//! detection returns sets and booleans, never errors.

use thiserror::Error;

/// Errors raised while building an exam timetabling model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Periods must be added in strictly increasing (day, time) order.
    #[error("period (day {day}, time {time}) is not after the previous period")]
    PeriodOrder { day: u32, time: u32 },

    /// Two entities of the same kind were given the same external id.
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },

    /// A distribution constraint name did not match any known type.
    #[error("unknown distribution type {0:?}")]
    UnknownDistributionType(String),

    /// A builder argument referenced an entity that does not exist.
    #[error("unknown {kind} index {index}")]
    UnknownReference { kind: &'static str, index: usize },

    /// An exam referenced a room group that was never added.
    #[error("unknown room group {0:?}")]
    UnknownRoomGroup(String),

    /// A per-period table does not cover every period.
    #[error("{kind} table for {name:?} has {got} entries, expected {expected}")]
    TableLength {
        kind: &'static str,
        name: String,
        expected: usize,
        got: usize,
    },

    /// A distribution constraint needs at least two member exams.
    #[error("distribution constraint needs at least two exams, got {0}")]
    TooFewMembers(usize),
}

/// Result alias for model construction.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;
