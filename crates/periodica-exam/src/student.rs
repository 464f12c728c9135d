//! Students as hard constraints.

use periodica_core::VariableId;

use crate::period::PeriodId;

/// Index of a student within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudentId(pub usize);

impl StudentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A student enrolled in one or more exams.
///
/// The assignment context tracks, per period and per day, which of the
/// student's exams are currently placed there; the student itself only
/// holds the static enrollment and availability data.
///
/// `allow_direct_conflicts` is the escape valve flipped during forced
/// placement resolution: when set (together with the flags of both exams
/// involved), a same-period pair stops being a hard conflict and is only
/// penalized.
#[derive(Debug, Clone)]
pub struct Student {
    id: StudentId,
    external_id: i64,
    exams: Vec<VariableId>,
    available: Vec<bool>,
    allow_direct_conflicts: bool,
}

impl Student {
    pub(crate) fn new(id: StudentId, external_id: i64, available: Vec<bool>) -> Self {
        Student {
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
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    /// Exams this student is enrolled in.
    #[inline]
    pub fn exams(&self) -> &[VariableId] {
        &self.exams
    }

    /// True if the student can sit an exam in the given period.
    #[inline]
    pub fn is_available(&self, period: PeriodId) -> bool {
        self.available[period.index()]
    }

    #[inline]
    pub fn allow_direct_conflicts(&self) -> bool {
        self.allow_direct_conflicts
    }
}
