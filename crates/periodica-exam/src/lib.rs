//! Examination timetabling on the periodica framework.
//!
//! An [`ExamTimetable`] assigns each exam a period and a set of rooms,
//! subject to hard constraints (room occupancy, student and instructor
//! clashes, hard distribution rules) and a weighted multi-criteria
//! objective (direct and back-to-back conflicts, room size and split,
//! period and room preferences, rotation, front load).
//!
//! Models are built once through [`ExamModelBuilder`]; candidate placements
//! are precomputed into per-exam domains at build time, including the
//! branch-and-bound room-subset enumeration in [`domain`]. Searching
//! happens through any number of framework
//! [`Assignment`](periodica_core::Assignment)s over the shared model.

pub mod builder;
pub mod config;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod exam;
pub mod instructor;
pub mod model;
pub mod period;
pub mod placement;
pub mod room;
pub mod student;

#[cfg(test)]
mod model_tests;

pub use builder::ExamModelBuilder;
pub use config::{ConfigError, ExamConfig, ExamWeights};
pub use distribution::{Distribution, DistributionId, DistributionType};
pub use domain::DomainOptions;
pub use error::{ModelError, Result};
pub use exam::{Exam, ExamSpec, PeriodPlacement};
pub use instructor::{Instructor, InstructorId};
pub use model::{ExamContext, ExamTimetable, PenaltyCounters};
pub use period::{Period, PeriodId};
pub use placement::ExamPlacement;
pub use room::{Room, RoomGroup, RoomId, RoomPlacement, RoomSpec};
pub use student::{Student, StudentId};
