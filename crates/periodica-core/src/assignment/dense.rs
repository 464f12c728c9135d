use std::sync::Arc;

use crate::model::{Value, VariableId};

use super::{AssignmentStore, Entry};

/// Array-backed store indexed by variable index.
///
/// Lookup is a slice index, so this is the backing of choice for solver
/// threads that touch every variable. Grows on demand if a variable beyond
/// the preallocated capacity is assigned.
#[derive(Debug, Clone, Default)]
pub struct DenseStore<V> {
    slots: Vec<Option<Entry<V>>>,
}

impl<V: Value> DenseStore<V> {
    /// Creates a store preallocated for `capacity` variables.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        DenseStore { slots }
    }

    /// Freezes the current bindings into a shared snapshot for overlays.
    pub(super) fn snapshot(&self) -> Arc<Vec<Option<Entry<V>>>>
    where
        V: Clone,
    {
        Arc::new(self.slots.clone())
    }
}

impl<V: Value> AssignmentStore<V> for DenseStore<V> {
    fn get(&self, variable: VariableId) -> Option<&V> {
        self.slots
            .get(variable.index())
            .and_then(|slot| slot.as_ref())
            .map(|entry| &entry.value)
    }

    fn last_iteration(&self, variable: VariableId) -> u64 {
        self.slots
            .get(variable.index())
            .and_then(|slot| slot.as_ref())
            .map_or(0, |entry| entry.iteration)
    }

    fn set(&mut self, iteration: u64, value: V) {
        let index = value.variable().index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(Entry { value, iteration });
    }

    fn remove(&mut self, variable: VariableId) {
        if let Some(slot) = self.slots.get_mut(variable.index()) {
            *slot = None;
        }
    }

    fn assigned_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn assigned_variables(&self) -> Vec<VariableId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| VariableId(index))
            .collect()
    }
}
