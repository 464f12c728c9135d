use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Value, VariableId};

use super::{AssignmentStore, Entry};

/// Copy-on-write store over a frozen parent snapshot.
///
/// Reads fall through to the snapshot unless the variable was touched
/// locally; writes only ever land in the local delta. A `None` delta entry
/// shadows a parent binding that was unassigned in this overlay. Several
/// overlays can share one snapshot, so speculative branches stay cheap.
#[derive(Debug, Clone)]
pub struct OverlayStore<V> {
    parent: Arc<Vec<Option<Entry<V>>>>,
    delta: HashMap<VariableId, Option<Entry<V>>>,
}

impl<V: Value> OverlayStore<V> {
    pub(super) fn new(parent: Arc<Vec<Option<Entry<V>>>>) -> Self {
        OverlayStore {
            parent,
            delta: HashMap::new(),
        }
    }

    fn parent_entry(&self, variable: VariableId) -> Option<&Entry<V>> {
        self.parent.get(variable.index()).and_then(|slot| slot.as_ref())
    }

    fn entry(&self, variable: VariableId) -> Option<&Entry<V>> {
        match self.delta.get(&variable) {
            Some(local) => local.as_ref(),
            None => self.parent_entry(variable),
        }
    }

    /// Number of variables changed relative to the snapshot.
    pub fn delta_len(&self) -> usize {
        self.delta.len()
    }
}

impl<V: Value> AssignmentStore<V> for OverlayStore<V> {
    fn get(&self, variable: VariableId) -> Option<&V> {
        self.entry(variable).map(|entry| &entry.value)
    }

    fn last_iteration(&self, variable: VariableId) -> u64 {
        self.entry(variable).map_or(0, |entry| entry.iteration)
    }

    fn set(&mut self, iteration: u64, value: V) {
        let variable = value.variable();
        self.delta.insert(variable, Some(Entry { value, iteration }));
    }

    fn remove(&mut self, variable: VariableId) {
        if self.parent_entry(variable).is_some() {
            self.delta.insert(variable, None);
        } else {
            self.delta.remove(&variable);
        }
    }

    fn assigned_count(&self) -> usize {
        let mut count = self.parent.iter().filter(|slot| slot.is_some()).count();
        for (variable, local) in &self.delta {
            let was_assigned = self.parent_entry(*variable).is_some();
            match (was_assigned, local.is_some()) {
                (false, true) => count += 1,
                (true, false) => count -= 1,
                _ => {}
            }
        }
        count
    }

    fn assigned_variables(&self) -> Vec<VariableId> {
        let mut variables: Vec<VariableId> = self
            .parent
            .iter()
            .enumerate()
            .filter(|(index, slot)| {
                slot.is_some() && !self.delta.contains_key(&VariableId(*index))
            })
            .map(|(index, _)| VariableId(index))
            .collect();
        variables.extend(
            self.delta
                .iter()
                .filter(|(_, local)| local.is_some())
                .map(|(variable, _)| *variable),
        );
        variables
    }
}
