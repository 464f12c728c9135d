//! Students and their request lists.

use periodica_core::VariableId;

use crate::time::TimeLocation;

/// Index of a student within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SctStudentId(pub usize);

impl SctStudentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A student with an ordered list of requests.
///
/// The request order is the priority order the branch-and-bound walks; it
/// is fixed at load time.
#[derive(Debug, Clone)]
pub struct SctStudent {
    id: SctStudentId,
    external_id: i64,
    max_credit: f32,
    requests: Vec<VariableId>,
    unavailable: Vec<TimeLocation>,
}

impl SctStudent {
    pub(crate) fn new(id: SctStudentId, external_id: i64, max_credit: f32) -> Self {
        SctStudent {
            id,
            external_id,
            max_credit,
            requests: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    pub(crate) fn add_request(&mut self, request: VariableId) {
        self.requests.push(request);
    }

    pub(crate) fn add_unavailability(&mut self, time: TimeLocation) {
        self.unavailable.push(time);
    }

    #[inline]
    pub fn id(&self) -> SctStudentId {
        self.id
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    /// Credit-hour cap across all assigned requests.
    #[inline]
    pub fn max_credit(&self) -> f32 {
        self.max_credit
    }

    /// Requests in priority order.
    #[inline]
    pub fn requests(&self) -> &[VariableId] {
        &self.requests
    }

    /// Times the student cannot attend (teaching, other commitments).
    #[inline]
    pub fn unavailable(&self) -> &[TimeLocation] {
        &self.unavailable
    }
}
