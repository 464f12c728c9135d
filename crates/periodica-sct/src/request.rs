//! Requests: the variables of the sectioning model.

use std::collections::HashSet;

use periodica_core::VariableId;

use crate::course::{ConfigId, CourseId, SectionId};
use crate::student::SctStudentId;
use crate::time::TimeLocation;

/// Course request attributes supplied to the builder.
#[derive(Debug, Clone)]
pub struct CourseRequestSpec {
    /// Requested courses in preference order; index 0 is the primary
    /// choice, later indices are alternatives of this request.
    pub courses: Vec<CourseId>,
    /// Substitute request: only assigned when a non-alternative request of
    /// the same student stays unassigned.
    pub alternative: bool,
    /// Wait-listed requests free up an alternative slot even while
    /// unassigned.
    pub wait_list: bool,
    /// Sections the student picked in the assistant; steer, do not bind.
    pub selected_sections: HashSet<SectionId>,
    /// Configurations of the picked sections.
    pub selected_configs: HashSet<ConfigId>,
    /// Request weight for limit accounting, normally 1.
    pub weight: f64,
}

impl CourseRequestSpec {
    pub fn new(courses: Vec<CourseId>) -> Self {
        CourseRequestSpec {
            courses,
            alternative: false,
            wait_list: false,
            selected_sections: HashSet::new(),
            selected_configs: HashSet::new(),
            weight: 1.0,
        }
    }
}

/// What a request asks for.
#[derive(Debug, Clone)]
pub enum RequestKind {
    /// One of a list of courses, in preference order.
    Course {
        courses: Vec<CourseId>,
        wait_list: bool,
        selected_sections: HashSet<SectionId>,
        selected_configs: HashSet<ConfigId>,
        /// Lowest average section penalty over the request's enrollments,
        /// the floor used when bounding the penalty tier.
        min_penalty: f64,
    },
    /// A time the student wants kept free.
    FreeTime(TimeLocation),
}

/// A single request of a student, one variable of the model.
#[derive(Debug, Clone)]
pub struct Request {
    variable: VariableId,
    student: SctStudentId,
    /// Position within the student's request list.
    priority: usize,
    alternative: bool,
    weight: f64,
    kind: RequestKind,
}

impl Request {
    pub(crate) fn new(
        variable: VariableId,
        student: SctStudentId,
        priority: usize,
        alternative: bool,
        weight: f64,
        kind: RequestKind,
    ) -> Self {
        Request {
            variable,
            student,
            priority,
            alternative,
            weight,
            kind,
        }
    }

    pub(crate) fn set_min_penalty(&mut self, penalty: f64) {
        if let RequestKind::Course { min_penalty, .. } = &mut self.kind {
            *min_penalty = penalty;
        }
    }

    #[inline]
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    #[inline]
    pub fn student(&self) -> SctStudentId {
        self.student
    }

    #[inline]
    pub fn priority(&self) -> usize {
        self.priority
    }

    #[inline]
    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    #[inline]
    pub fn is_course(&self) -> bool {
        matches!(self.kind, RequestKind::Course { .. })
    }

    #[inline]
    pub fn is_free_time(&self) -> bool {
        matches!(self.kind, RequestKind::FreeTime(_))
    }

    #[inline]
    pub fn is_wait_list(&self) -> bool {
        matches!(self.kind, RequestKind::Course { wait_list: true, .. })
    }

    /// Requested courses in preference order; empty for free times.
    pub fn courses(&self) -> &[CourseId] {
        match &self.kind {
            RequestKind::Course { courses, .. } => courses,
            RequestKind::FreeTime(_) => &[],
        }
    }

    pub fn selected_sections(&self) -> Option<&HashSet<SectionId>> {
        match &self.kind {
            RequestKind::Course { selected_sections, .. } => Some(selected_sections),
            RequestKind::FreeTime(_) => None,
        }
    }

    pub fn selected_configs(&self) -> Option<&HashSet<ConfigId>> {
        match &self.kind {
            RequestKind::Course { selected_configs, .. } => Some(selected_configs),
            RequestKind::FreeTime(_) => None,
        }
    }

    /// Penalty floor for the bound of the average-penalty tier.
    pub fn min_penalty(&self) -> f64 {
        match &self.kind {
            RequestKind::Course { min_penalty, .. } => *min_penalty,
            RequestKind::FreeTime(_) => 0.0,
        }
    }

    pub fn free_time(&self) -> Option<&TimeLocation> {
        match &self.kind {
            RequestKind::FreeTime(time) => Some(time),
            RequestKind::Course { .. } => None,
        }
    }
}
