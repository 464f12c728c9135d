//! Linked sections: cross-course co-enrollment rules.

use crate::course::{CourseId, SectionId};

/// Index of a linked-sections rule within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkedId(pub usize);

impl LinkedId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Sections across several courses that must be taken together.
///
/// The rule binds only students enrolled in at least two of the named
/// courses: each of their enrollments in a named course must then use that
/// course's linked section. Students taking at most one of the courses are
/// unaffected.
#[derive(Debug, Clone)]
pub struct LinkedSections {
    id: LinkedId,
    /// One linked section per course.
    members: Vec<(CourseId, SectionId)>,
}

impl LinkedSections {
    pub(crate) fn new(id: LinkedId, members: Vec<(CourseId, SectionId)>) -> Self {
        LinkedSections { id, members }
    }

    #[inline]
    pub fn id(&self) -> LinkedId {
        self.id
    }

    #[inline]
    pub fn members(&self) -> &[(CourseId, SectionId)] {
        &self.members
    }

    /// The linked section of a course, if the course is part of the rule.
    pub fn section_of(&self, course: CourseId) -> Option<SectionId> {
        self.members
            .iter()
            .find(|(c, _)| *c == course)
            .map(|&(_, s)| s)
    }

    pub fn involves_course(&self, course: CourseId) -> bool {
        self.members.iter().any(|(c, _)| *c == course)
    }
}
