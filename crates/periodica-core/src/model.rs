//! Variable/value model traits.
//!
//! A timetabling model is a read-only graph of variables and constraints;
//! everything that changes during search lives in an [`Assignment`] and its
//! per-assignment context. The [`Model`] trait is the seam between the
//! generic assignment protocol and a concrete problem: it owns the variable
//! and constraint structure and dispatches assignment events to the
//! constraints that reference the changed variable.
//!
//! [`Assignment`]: crate::assignment::Assignment

use crate::assignment::AssignmentStore;

/// Index of a variable within its model.
///
/// Variables are created once at model build time and identified by a dense
/// index, so assignment stores can use plain arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub usize);

impl VariableId {
    /// Returns the dense index of this variable.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Index of a constraint within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub usize);

impl ConstraintId {
    /// Returns the dense index of this constraint.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A candidate assignment of exactly one variable.
///
/// Values are immutable once constructed and compare structurally: two
/// values are equal when they assign the same variable to the same compound
/// content (period and room set, or configuration and section set), not when
/// they are the same allocation.
pub trait Value: Clone + PartialEq {
    /// The variable this value assigns.
    fn variable(&self) -> VariableId;
}

/// A read-only problem shared by any number of concurrent assignments.
///
/// The model never mutates itself after construction; all incremental state
/// (occupancy tables, penalty counters) is kept in `Self::Context`, one
/// instance per [`Assignment`], so independent searches over the same model
/// cannot observe each other.
///
/// The `constraint_*` methods dispatch by [`ConstraintId`] into the model's
/// closed set of constraint kinds; implementations are expected to match on
/// an enum rather than go through virtual calls, keeping `in_conflict`
/// cheap on the hot path.
///
/// [`Assignment`]: crate::assignment::Assignment
pub trait Model: Sized {
    /// The value type of this model's variables.
    type Value: Value;
    /// Per-assignment incremental state (occupancy tables, counters).
    type Context;

    /// Number of variables in the model.
    fn variable_count(&self) -> usize;

    /// Creates an empty context for a fresh assignment.
    fn new_context(&self) -> Self::Context;

    /// Constraints referencing the given variable.
    fn constraints_of(&self, variable: VariableId) -> &[ConstraintId];

    /// Notifies one constraint that a value was assigned. The store already
    /// holds the new value when this is called.
    fn constraint_assigned<S: AssignmentStore<Self::Value>>(
        &self,
        store: &S,
        cx: &mut Self::Context,
        constraint: ConstraintId,
        iteration: u64,
        value: &Self::Value,
    );

    /// Notifies one constraint that a value was unassigned. The store no
    /// longer holds the value when this is called.
    fn constraint_unassigned<S: AssignmentStore<Self::Value>>(
        &self,
        store: &S,
        cx: &mut Self::Context,
        constraint: ConstraintId,
        iteration: u64,
        value: &Self::Value,
    );

    /// Adds to `conflicts` every currently assigned value that the given
    /// constraint would force out if `value` were assigned.
    fn constraint_conflicts<S: AssignmentStore<Self::Value>>(
        &self,
        store: &S,
        cx: &Self::Context,
        constraint: ConstraintId,
        value: &Self::Value,
        conflicts: &mut ConflictSet<Self::Value>,
    );

    /// Like [`Model::constraint_conflicts`] but without materializing the
    /// set. Implementations should short-circuit on the first hit.
    fn constraint_in_conflict<S: AssignmentStore<Self::Value>>(
        &self,
        store: &S,
        cx: &Self::Context,
        constraint: ConstraintId,
        value: &Self::Value,
    ) -> bool {
        let mut conflicts = ConflictSet::new();
        self.constraint_conflicts(store, cx, constraint, value, &mut conflicts);
        !conflicts.is_empty()
    }

    /// True if two hypothetical values could coexist under the given
    /// constraint. Neither value needs to be assigned; no state is read.
    fn constraint_consistent(
        &self,
        constraint: ConstraintId,
        first: &Self::Value,
        second: &Self::Value,
    ) -> bool;

    /// True if the given constraint must never be violated.
    fn constraint_is_hard(&self, constraint: ConstraintId) -> bool;

    /// Called before a value is removed; the store still holds it and all
    /// constraint tables still include it.
    fn before_unassigned<S: AssignmentStore<Self::Value>>(
        &self,
        _store: &S,
        _cx: &mut Self::Context,
        _iteration: u64,
        _value: &Self::Value,
    ) {
    }

    /// Called after a value was removed and all constraints were notified.
    fn after_unassigned<S: AssignmentStore<Self::Value>>(
        &self,
        _store: &S,
        _cx: &mut Self::Context,
        _iteration: u64,
        _value: &Self::Value,
    ) {
    }

    /// Called before a value is stored.
    fn before_assigned<S: AssignmentStore<Self::Value>>(
        &self,
        _store: &S,
        _cx: &mut Self::Context,
        _iteration: u64,
        _value: &Self::Value,
    ) {
    }

    /// Called after a value was stored and all constraints were notified;
    /// the constraint tables already include it. Objective counters are
    /// typically updated here.
    fn after_assigned<S: AssignmentStore<Self::Value>>(
        &self,
        _store: &S,
        _cx: &mut Self::Context,
        _iteration: u64,
        _value: &Self::Value,
    ) {
    }
}

/// A small deduplicated set of conflicting values.
///
/// Conflict sets are almost always tiny (one or two values), so this is a
/// `SmallVec` with linear membership checks rather than a hash set; values
/// only need `PartialEq`.
#[derive(Debug, Clone)]
pub struct ConflictSet<V: PartialEq> {
    values: smallvec::SmallVec<[V; 4]>,
}

impl<V: PartialEq> ConflictSet<V> {
    /// Creates an empty conflict set.
    pub fn new() -> Self {
        ConflictSet {
            values: smallvec::SmallVec::new(),
        }
    }

    /// Adds a value unless an equal one is already present.
    pub fn add(&mut self, value: V) {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    /// True if no conflicts were recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct conflicting values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if an equal value was recorded.
    pub fn contains(&self, value: &V) -> bool {
        self.values.contains(value)
    }

    /// Iterates the recorded conflicts.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }
}

impl<V: PartialEq> Default for ConflictSet<V> {
    fn default() -> Self {
        ConflictSet::new()
    }
}

impl<V: PartialEq> IntoIterator for ConflictSet<V> {
    type Item = V;
    type IntoIter = smallvec::IntoIter<[V; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
