use std::collections::HashMap;

use crate::assignment::{Assignment, AssignmentStore, DenseAssignment, MapStore};
use crate::model::{ConflictSet, ConstraintId, Model, Value, VariableId};

/// A variable placed into one of a few slots; at most one variable per slot.
#[derive(Debug, Clone, PartialEq)]
struct SlotValue {
    variable: VariableId,
    slot: usize,
}

impl SlotValue {
    fn new(variable: usize, slot: usize) -> Self {
        SlotValue {
            variable: VariableId(variable),
            slot,
        }
    }
}

impl Value for SlotValue {
    fn variable(&self) -> VariableId {
        self.variable
    }
}

#[derive(Debug, Clone, Default)]
struct SlotContext {
    occupants: HashMap<usize, VariableId>,
    log: Vec<String>,
}

struct SlotModel {
    variables: usize,
    constraints: Vec<ConstraintId>,
}

impl SlotModel {
    fn new(variables: usize) -> Self {
        SlotModel {
            variables,
            constraints: vec![ConstraintId(0)],
        }
    }
}

impl Model for SlotModel {
    type Value = SlotValue;
    type Context = SlotContext;

    fn variable_count(&self) -> usize {
        self.variables
    }

    fn new_context(&self) -> SlotContext {
        SlotContext::default()
    }

    fn constraints_of(&self, _variable: VariableId) -> &[ConstraintId] {
        &self.constraints
    }

    fn constraint_assigned<S: AssignmentStore<SlotValue>>(
        &self,
        _store: &S,
        cx: &mut SlotContext,
        _constraint: ConstraintId,
        _iteration: u64,
        value: &SlotValue,
    ) {
        cx.occupants.insert(value.slot, value.variable);
        cx.log.push(format!("constraint-assigned {}", value.variable));
    }

    fn constraint_unassigned<S: AssignmentStore<SlotValue>>(
        &self,
        _store: &S,
        cx: &mut SlotContext,
        _constraint: ConstraintId,
        _iteration: u64,
        value: &SlotValue,
    ) {
        if cx.occupants.get(&value.slot) == Some(&value.variable) {
            cx.occupants.remove(&value.slot);
        }
        cx.log.push(format!("constraint-unassigned {}", value.variable));
    }

    fn constraint_conflicts<S: AssignmentStore<SlotValue>>(
        &self,
        store: &S,
        cx: &SlotContext,
        _constraint: ConstraintId,
        value: &SlotValue,
        conflicts: &mut ConflictSet<SlotValue>,
    ) {
        if let Some(&occupant) = cx.occupants.get(&value.slot) {
            if occupant != value.variable {
                if let Some(current) = store.get(occupant) {
                    conflicts.add(current.clone());
                }
            }
        }
    }

    fn constraint_consistent(
        &self,
        _constraint: ConstraintId,
        first: &SlotValue,
        second: &SlotValue,
    ) -> bool {
        first.variable == second.variable || first.slot != second.slot
    }

    fn constraint_is_hard(&self, _constraint: ConstraintId) -> bool {
        true
    }

    fn before_unassigned<S: AssignmentStore<SlotValue>>(
        &self,
        _store: &S,
        cx: &mut SlotContext,
        _iteration: u64,
        value: &SlotValue,
    ) {
        cx.log.push(format!("before-unassigned {}", value.variable));
    }

    fn after_unassigned<S: AssignmentStore<SlotValue>>(
        &self,
        _store: &S,
        cx: &mut SlotContext,
        _iteration: u64,
        value: &SlotValue,
    ) {
        cx.log.push(format!("after-unassigned {}", value.variable));
    }

    fn before_assigned<S: AssignmentStore<SlotValue>>(
        &self,
        _store: &S,
        cx: &mut SlotContext,
        _iteration: u64,
        value: &SlotValue,
    ) {
        cx.log.push(format!("before-assigned {}", value.variable));
    }

    fn after_assigned<S: AssignmentStore<SlotValue>>(
        &self,
        _store: &S,
        cx: &mut SlotContext,
        _iteration: u64,
        value: &SlotValue,
    ) {
        cx.log.push(format!("after-assigned {}", value.variable));
    }
}

#[test]
fn assign_records_value_and_iteration() {
    let model = SlotModel::new(3);
    let mut assignment = DenseAssignment::new(&model);

    let old = assignment.assign(&model, 7, SlotValue::new(0, 2));
    assert!(old.is_none());
    assert_eq!(assignment.value(VariableId(0)), Some(&SlotValue::new(0, 2)));
    assert_eq!(assignment.last_iteration(VariableId(0)), 7);
    assert_eq!(assignment.assigned_count(), 1);
    assert_eq!(assignment.context().occupants.get(&2), Some(&VariableId(0)));
}

#[test]
fn reassigning_same_value_is_a_no_op() {
    let model = SlotModel::new(3);
    let mut assignment = DenseAssignment::new(&model);

    assignment.assign(&model, 1, SlotValue::new(0, 2));
    let log_before = assignment.context().log.clone();

    let old = assignment.assign(&model, 5, SlotValue::new(0, 2));
    assert_eq!(old, Some(SlotValue::new(0, 2)));
    // No notifications fire and the iteration stamp is untouched.
    assert_eq!(assignment.context().log, log_before);
    assert_eq!(assignment.last_iteration(VariableId(0)), 1);
}

#[test]
fn reassign_unassigns_old_value_before_assigning_new() {
    let model = SlotModel::new(3);
    let mut assignment = DenseAssignment::new(&model);

    assignment.assign(&model, 1, SlotValue::new(0, 0));
    {
        let cx = assignment.context();
        assert_eq!(
            cx.log,
            vec![
                "before-assigned v0",
                "constraint-assigned v0",
                "after-assigned v0",
            ]
        );
    }

    let old = assignment.assign(&model, 2, SlotValue::new(0, 1));
    assert_eq!(old, Some(SlotValue::new(0, 0)));
    let cx = assignment.context();
    assert_eq!(
        cx.log[3..],
        [
            "before-unassigned v0".to_owned(),
            "constraint-unassigned v0".to_owned(),
            "after-unassigned v0".to_owned(),
            "before-assigned v0".to_owned(),
            "constraint-assigned v0".to_owned(),
            "after-assigned v0".to_owned(),
        ]
    );
    // Occupancy moved from slot 0 to slot 1.
    assert!(!cx.occupants.contains_key(&0));
    assert_eq!(cx.occupants.get(&1), Some(&VariableId(0)));
}

#[test]
fn unassign_if_only_removes_the_expected_value() {
    let model = SlotModel::new(3);
    let mut assignment = DenseAssignment::new(&model);

    assignment.assign(&model, 1, SlotValue::new(0, 0));

    let removed = assignment.unassign_if(&model, 2, VariableId(0), &SlotValue::new(0, 1));
    assert!(removed.is_none());
    assert_eq!(assignment.value(VariableId(0)), Some(&SlotValue::new(0, 0)));

    let removed = assignment.unassign_if(&model, 3, VariableId(0), &SlotValue::new(0, 0));
    assert_eq!(removed, Some(SlotValue::new(0, 0)));
    assert!(assignment.value(VariableId(0)).is_none());
}

#[test]
fn conflicts_name_the_current_occupant() {
    let model = SlotModel::new(3);
    let mut assignment = DenseAssignment::new(&model);

    assignment.assign(&model, 1, SlotValue::new(0, 2));

    let conflicts = assignment.compute_conflicts(&model, &SlotValue::new(1, 2));
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts.contains(&SlotValue::new(0, 2)));
    assert!(assignment.in_conflict(&model, &SlotValue::new(1, 2)));

    let conflicts = assignment.compute_conflicts(&model, &SlotValue::new(1, 0));
    assert!(conflicts.is_empty());
    assert!(!assignment.in_conflict(&model, &SlotValue::new(1, 0)));
}

#[test]
fn overlay_changes_do_not_leak_into_the_parent() {
    let model = SlotModel::new(4);
    let mut parent = DenseAssignment::new(&model);
    parent.assign(&model, 1, SlotValue::new(0, 0));
    parent.assign(&model, 2, SlotValue::new(1, 1));

    let mut overlay = parent.overlay();
    assert_eq!(overlay.value(VariableId(0)), Some(&SlotValue::new(0, 0)));
    assert_eq!(overlay.assigned_count(), 2);

    overlay.unassign(&model, 3, VariableId(0));
    overlay.assign(&model, 4, SlotValue::new(2, 0));
    overlay.assign(&model, 5, SlotValue::new(1, 2));

    assert!(overlay.value(VariableId(0)).is_none());
    assert_eq!(overlay.value(VariableId(2)), Some(&SlotValue::new(2, 0)));
    assert_eq!(overlay.value(VariableId(1)), Some(&SlotValue::new(1, 2)));
    assert_eq!(overlay.assigned_count(), 2);
    assert_eq!(overlay.context().occupants.get(&0), Some(&VariableId(2)));

    // Parent store and context are both untouched.
    assert_eq!(parent.value(VariableId(0)), Some(&SlotValue::new(0, 0)));
    assert_eq!(parent.value(VariableId(1)), Some(&SlotValue::new(1, 1)));
    assert!(parent.value(VariableId(2)).is_none());
    assert_eq!(parent.context().occupants.get(&0), Some(&VariableId(0)));
    assert_eq!(parent.context().occupants.get(&1), Some(&VariableId(1)));
}

#[test]
fn overlay_assigned_variables_merge_parent_and_delta() {
    let model = SlotModel::new(4);
    let mut parent = DenseAssignment::new(&model);
    parent.assign(&model, 1, SlotValue::new(0, 0));
    parent.assign(&model, 2, SlotValue::new(1, 1));

    let mut overlay = parent.overlay();
    overlay.unassign(&model, 3, VariableId(1));
    overlay.assign(&model, 4, SlotValue::new(3, 3));

    let mut assigned = overlay.assigned_variables();
    assigned.sort_by_key(|v| v.index());
    assert_eq!(assigned, vec![VariableId(0), VariableId(3)]);
}

#[test]
fn map_store_behaves_like_the_dense_store() {
    let model = SlotModel::new(100);
    let mut assignment: Assignment<SlotModel, MapStore<SlotValue>> =
        crate::assignment::MapAssignment::new_map(&model);

    assignment.assign(&model, 1, SlotValue::new(42, 0));
    assignment.assign(&model, 2, SlotValue::new(99, 1));
    assignment.unassign(&model, 3, VariableId(42));

    assert!(assignment.value(VariableId(42)).is_none());
    assert_eq!(assignment.value(VariableId(99)), Some(&SlotValue::new(99, 1)));
    assert_eq!(assignment.assigned_count(), 1);
    assert_eq!(assignment.unassigned_variables(&model).len(), 99);
}
