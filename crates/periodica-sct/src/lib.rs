//! Student sectioning on the periodica framework.
//!
//! A [`SectioningModel`] holds courses (configurations, subparts,
//! sections), students and their prioritized requests; the values are
//! [`Enrollment`]s, one section per subpart of a chosen configuration, or
//! a free time. Hard constraints cover section seat limits, per-student
//! time overlaps and credit caps, and linked-sections rules.
//!
//! Schedules for one student are found by [`BranchBoundSelection`], a
//! branch-and-bound over the student's requests in priority order, ranked
//! by a lexicographic multi-criteria [`SelectionCriterion`] such as
//! [`OnlineCriterion`]. Models are built once through [`SctModelBuilder`];
//! enrollment domains are precomputed at build time, and searching happens
//! through any number of framework
//! [`Assignment`](periodica_core::Assignment)s over the shared model.

pub mod builder;
pub mod config;
pub mod course;
pub mod criterion;
pub mod enrollment;
pub mod error;
pub mod linked;
pub mod model;
pub mod request;
pub mod selection;
pub mod student;
pub mod time;

#[cfg(test)]
mod selection_tests;

pub use builder::SctModelBuilder;
pub use config::{ConfigError, Rounding, SelectionConfig};
pub use course::{
    ConfigId, Course, CourseConfig, CourseId, Section, SectionId, SectionSpec, Subpart, SubpartId,
};
pub use criterion::{BestPenaltyCriterion, OnlineCriterion, Schedule, SelectionCriterion};
pub use enrollment::Enrollment;
pub use error::{Result, SctError};
pub use linked::{LinkedId, LinkedSections};
pub use model::{SctContext, SectioningModel};
pub use request::{CourseRequestSpec, Request, RequestKind};
pub use selection::{BranchBoundResult, BranchBoundSelection, SelectionRequirements};
pub use student::{SctStudent, SctStudentId};
pub use time::TimeLocation;
