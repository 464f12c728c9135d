use std::collections::HashMap;

use crate::model::{Value, VariableId};

use super::{AssignmentStore, Entry};

/// Hash-map-backed store.
///
/// Iteration over assigned variables is proportional to the number of
/// bindings rather than the variable count, which pays off for sparse
/// assignments such as a handful of fixed placements over a large model.
#[derive(Debug, Clone, Default)]
pub struct MapStore<V> {
    entries: HashMap<VariableId, Entry<V>>,
}

impl<V: Value> MapStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        MapStore {
            entries: HashMap::new(),
        }
    }
}

impl<V: Value> AssignmentStore<V> for MapStore<V> {
    fn get(&self, variable: VariableId) -> Option<&V> {
        self.entries.get(&variable).map(|entry| &entry.value)
    }

    fn last_iteration(&self, variable: VariableId) -> u64 {
        self.entries.get(&variable).map_or(0, |entry| entry.iteration)
    }

    fn set(&mut self, iteration: u64, value: V) {
        let variable = value.variable();
        self.entries.insert(variable, Entry { value, iteration });
    }

    fn remove(&mut self, variable: VariableId) {
        self.entries.remove(&variable);
    }

    fn assigned_count(&self) -> usize {
        self.entries.len()
    }

    fn assigned_variables(&self) -> Vec<VariableId> {
        self.entries.keys().copied().collect()
    }
}
