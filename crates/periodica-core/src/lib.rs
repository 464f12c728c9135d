//! Incremental constraint and assignment framework for periodica.
//!
//! The framework separates three concerns:
//!
//! - a [`Model`](model::Model) holds the read-only problem structure
//!   (variables, constraints) and dispatches constraint callbacks;
//! - an [`Assignment`](assignment::Assignment) holds variable values plus a
//!   per-assignment [`Model::Context`](model::Model::Context) carrying every
//!   constraint's incremental state;
//! - [`AssignmentStore`](assignment::AssignmentStore) implementations trade
//!   off lookup, iteration and snapshot cost.
//!
//! Because all mutable state lives in the assignment, one model can be
//! solved by many assignments at once, and a speculative
//! [`overlay`](assignment::Assignment::overlay) can branch off a solution
//! without copying or locking it.
//!
//! Dispatch is fully generic. Models and constraints are parameterized by
//! the store type, so constraint callbacks compile down to direct calls
//! with no trait objects on the hot path.

pub mod assignment;
pub mod model;

pub use assignment::{
    Assignment, AssignmentStore, DenseAssignment, DenseStore, Entry, MapAssignment, MapStore,
    OverlayAssignment, OverlayStore,
};
pub use model::{ConflictSet, ConstraintId, Model, Value, VariableId};
