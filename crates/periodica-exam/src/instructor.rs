//! Instructors as hard constraints.

use periodica_core::VariableId;

use crate::period::PeriodId;

/// Index of an instructor within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructorId(pub usize);

impl InstructorId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// An instructor overseeing one or more exams; same conflict semantics as
/// [`Student`](crate::student::Student).
#[derive(Debug, Clone)]
pub struct Instructor {
    id: InstructorId,
    external_id: i64,
    exams: Vec<VariableId>,
    available: Vec<bool>,
    allow_direct_conflicts: bool,
}

impl Instructor {
    pub(crate) fn new(id: InstructorId, external_id: i64, available: Vec<bool>) -> Self {
        Instructor {
            id,
            external_id,
            exams: Vec::new(),
            available,
            allow_direct_conflicts: false,
        }
    }

    pub(crate) fn enroll(&mut self, exam: VariableId) {
        if !self.exams.contains(&exam) {
            self.exams.push(exam);
        }
    }

    pub(crate) fn set_allow_direct_conflicts(&mut self, allow: bool) {
        self.allow_direct_conflicts = allow;
    }

    #[inline]
    pub fn id(&self) -> InstructorId {
        self.id
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    /// Exams this instructor oversees.
    #[inline]
    pub fn exams(&self) -> &[VariableId] {
        &self.exams
    }

    /// True if the instructor is present in the given period.
    #[inline]
    pub fn is_available(&self, period: PeriodId) -> bool {
        self.available[period.index()]
    }

    #[inline]
    pub fn allow_direct_conflicts(&self) -> bool {
        self.allow_direct_conflicts
    }
}
