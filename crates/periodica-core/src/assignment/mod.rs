//! Assignment stores and the assignment protocol.
//!
//! An [`Assignment`] maps variables to their current values, decoupled from
//! the model itself so several assignments of one shared model can coexist
//! (one per worker thread during parallel search or suggestion generation).
//! The store backing is swappable:
//!
//! - [`DenseStore`]: array indexed by variable index, the default for
//!   solver threads;
//! - [`MapStore`]: hash map, cheap iteration over assigned variables when
//!   only a few of many variables are assigned;
//! - [`OverlayStore`]: copy-on-write deltas over a frozen parent snapshot,
//!   for speculative branches that must not disturb the parent.

mod dense;
mod map;
mod overlay;

#[cfg(test)]
mod tests;

pub use dense::DenseStore;
pub use map::MapStore;
pub use overlay::OverlayStore;

use crate::model::{ConflictSet, Model, Value, VariableId};

/// A stored value together with the iteration it was assigned at.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The assigned value.
    pub value: V,
    /// Iteration counter at the time of assignment.
    pub iteration: u64,
}

/// Raw storage of variable-to-value bindings.
///
/// Stores only hold data; the assignment protocol (constraint notification
/// ordering) lives in [`Assignment`]. All implementations satisfy the same
/// contract and differ only in lookup/iteration/memory trade-offs.
pub trait AssignmentStore<V: Value> {
    /// Returns the current value of a variable, if assigned.
    fn get(&self, variable: VariableId) -> Option<&V>;

    /// Returns the iteration a variable was last assigned at, zero if it
    /// was never assigned.
    fn last_iteration(&self, variable: VariableId) -> u64;

    /// Stores a value for its variable, replacing any previous binding.
    fn set(&mut self, iteration: u64, value: V);

    /// Removes the binding of a variable, if any.
    fn remove(&mut self, variable: VariableId);

    /// Number of currently assigned variables.
    fn assigned_count(&self) -> usize;

    /// Ids of all currently assigned variables, in unspecified order.
    fn assigned_variables(&self) -> Vec<VariableId>;
}

/// An assignment of a model: a value store plus the per-assignment context
/// holding every constraint's incremental state.
///
/// The context belongs to this assignment alone. Constraints keep their
/// occupancy tables and the model keeps its objective counters in it, so
/// two assignments of the same model never share mutable state.
pub struct Assignment<M: Model, S> {
    store: S,
    context: M::Context,
}

/// Assignment backed by a dense array store.
pub type DenseAssignment<M> = Assignment<M, DenseStore<<M as Model>::Value>>;
/// Assignment backed by a hash map store.
pub type MapAssignment<M> = Assignment<M, MapStore<<M as Model>::Value>>;
/// Assignment layering local changes over a frozen parent snapshot.
pub type OverlayAssignment<M> = Assignment<M, OverlayStore<<M as Model>::Value>>;

impl<M: Model> DenseAssignment<M> {
    /// Creates an empty dense assignment, preallocated for the model's
    /// variable count.
    pub fn new(model: &M) -> Self {
        Assignment {
            store: DenseStore::with_capacity(model.variable_count()),
            context: model.new_context(),
        }
    }

    /// Creates a speculative assignment over a frozen snapshot of this one.
    ///
    /// The parent is read once here; afterwards the overlay mutates
    /// independently. The context is cloned so the incremental constraint
    /// state starts out consistent with the snapshot.
    pub fn overlay(&self) -> OverlayAssignment<M>
    where
        M::Context: Clone,
        M::Value: Clone,
    {
        Assignment {
            store: OverlayStore::new(self.store.snapshot()),
            context: self.context.clone(),
        }
    }
}

impl<M: Model> MapAssignment<M> {
    /// Creates an empty map-backed assignment.
    pub fn new_map(model: &M) -> Self {
        Assignment {
            store: MapStore::new(),
            context: model.new_context(),
        }
    }
}

impl<M: Model, S: AssignmentStore<M::Value>> Assignment<M, S> {
    /// Returns the current value of a variable, if assigned.
    #[inline]
    pub fn value(&self, variable: VariableId) -> Option<&M::Value> {
        self.store.get(variable)
    }

    /// Returns the iteration the variable was last assigned at.
    #[inline]
    pub fn last_iteration(&self, variable: VariableId) -> u64 {
        self.store.last_iteration(variable)
    }

    /// The per-assignment context (constraint tables, counters).
    #[inline]
    pub fn context(&self) -> &M::Context {
        &self.context
    }

    /// The backing store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of currently assigned variables.
    pub fn assigned_count(&self) -> usize {
        self.store.assigned_count()
    }

    /// Ids of all currently assigned variables.
    pub fn assigned_variables(&self) -> Vec<VariableId> {
        self.store.assigned_variables()
    }

    /// Ids of all variables without a value.
    pub fn unassigned_variables(&self, model: &M) -> Vec<VariableId> {
        (0..model.variable_count())
            .map(VariableId)
            .filter(|&v| self.store.get(v).is_none())
            .collect()
    }

    /// Assigns a value to its variable, returning the previous value.
    ///
    /// If the variable already holds a different value, the full
    /// unassignment protocol runs first (model `before_unassigned`, store
    /// removal, per-constraint `unassigned`, model `after_unassigned`),
    /// then the symmetric assignment protocol. Constraints therefore always
    /// observe one old value removed before the new value appears.
    ///
    /// Re-assigning the value that is already current is a no-op returning
    /// that value. Feasibility is not checked here; callers are expected to
    /// consult [`Assignment::compute_conflicts`] first.
    pub fn assign(&mut self, model: &M, iteration: u64, value: M::Value) -> Option<M::Value> {
        self.reassign(model, iteration, value.variable(), Some(value))
    }

    /// Removes the value of a variable, returning it.
    pub fn unassign(&mut self, model: &M, iteration: u64, variable: VariableId) -> Option<M::Value> {
        self.reassign(model, iteration, variable, None)
    }

    /// Removes the value of a variable only if it equals `expected`.
    ///
    /// Used during conflict resolution so a stale conflict value cannot
    /// knock out a newer assignment of the same variable.
    pub fn unassign_if(
        &mut self,
        model: &M,
        iteration: u64,
        variable: VariableId,
        expected: &M::Value,
    ) -> Option<M::Value> {
        match self.store.get(variable) {
            Some(current) if current == expected => self.reassign(model, iteration, variable, None),
            _ => None,
        }
    }

    fn reassign(
        &mut self,
        model: &M,
        iteration: u64,
        variable: VariableId,
        value: Option<M::Value>,
    ) -> Option<M::Value> {
        let old = self.store.get(variable).cloned();

        if let Some(old) = &old {
            if value.as_ref() == Some(old) {
                return Some(old.clone());
            }
            model.before_unassigned(&self.store, &mut self.context, iteration, old);
            self.store.remove(variable);
            for &constraint in model.constraints_of(variable) {
                model.constraint_unassigned(&self.store, &mut self.context, constraint, iteration, old);
            }
            model.after_unassigned(&self.store, &mut self.context, iteration, old);
        }

        if let Some(value) = value {
            model.before_assigned(&self.store, &mut self.context, iteration, &value);
            self.store.set(iteration, value.clone());
            for &constraint in model.constraints_of(variable) {
                model.constraint_assigned(&self.store, &mut self.context, constraint, iteration, &value);
            }
            model.after_assigned(&self.store, &mut self.context, iteration, &value);
        }

        old
    }

    /// Collects every currently assigned value that would become infeasible
    /// if `value` were assigned, across all constraints of its variable.
    pub fn compute_conflicts(&self, model: &M, value: &M::Value) -> ConflictSet<M::Value> {
        let mut conflicts = ConflictSet::new();
        for &constraint in model.constraints_of(value.variable()) {
            if model.constraint_is_hard(constraint) {
                model.constraint_conflicts(&self.store, &self.context, constraint, value, &mut conflicts);
            }
        }
        conflicts
    }

    /// True if assigning `value` now would violate any hard constraint of
    /// its variable. Short-circuits on the first conflicting constraint.
    pub fn in_conflict(&self, model: &M, value: &M::Value) -> bool {
        model.constraints_of(value.variable()).iter().any(|&constraint| {
            model.constraint_is_hard(constraint)
                && model.constraint_in_conflict(&self.store, &self.context, constraint, value)
        })
    }
}
