//! Load-time error types.
//!
//! Only model construction can fail; selection and conflict checks return
//! results and booleans, never errors.

use thiserror::Error;

/// Errors raised while building a sectioning model.
#[derive(Debug, Error)]
pub enum SctError {
    /// Two entities of the same kind were given the same external id.
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },

    /// A builder argument referenced an entity that does not exist.
    #[error("unknown {kind} index {index}")]
    UnknownReference { kind: &'static str, index: usize },

    /// A course request needs at least one course.
    #[error("course request of student {student} names no courses")]
    EmptyCourseList { student: i64 },

    /// A linked-sections rule must span at least two courses.
    #[error("linked sections rule spans {0} courses, need at least two")]
    LinkTooSmall(usize),

    /// A time was given a zero length or no days.
    #[error("degenerate time: days {days:#04x}, length {length}")]
    DegenerateTime { days: u8, length: u32 },
}

/// Result alias for model construction.
pub type Result<T, E = SctError> = std::result::Result<T, E>;
