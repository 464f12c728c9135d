//! Enrollments: the values of the sectioning model.

use std::fmt;

use periodica_core::{Value, VariableId};
use smallvec::SmallVec;

use crate::course::{ConfigId, CourseId, SectionId};
use crate::time::TimeLocation;

/// One candidate assignment of a request: a course configuration with one
/// section per subpart, or the free time itself.
///
/// Immutable once constructed. Equality is structural over (request,
/// config, sections); the precomputed credit is derived and not compared.
#[derive(Debug, Clone)]
pub struct Enrollment {
    request: VariableId,
    /// Position of the chosen course within the request's course list;
    /// zero for the primary course and for free times.
    priority: usize,
    course: Option<CourseId>,
    config: Option<ConfigId>,
    sections: SmallVec<[SectionId; 4]>,
    credit: f32,
    free_time: Option<TimeLocation>,
}

impl Enrollment {
    pub(crate) fn of_course(
        request: VariableId,
        priority: usize,
        course: CourseId,
        config: ConfigId,
        mut sections: SmallVec<[SectionId; 4]>,
        credit: f32,
    ) -> Self {
        sections.sort_unstable();
        Enrollment {
            request,
            priority,
            course: Some(course),
            config: Some(config),
            sections,
            credit,
            free_time: None,
        }
    }

    pub(crate) fn of_free_time(request: VariableId, time: TimeLocation) -> Self {
        Enrollment {
            request,
            priority: 0,
            course: None,
            config: None,
            sections: SmallVec::new(),
            credit: 0.0,
            free_time: Some(time),
        }
    }

    #[inline]
    pub fn request(&self) -> VariableId {
        self.request
    }

    /// Zero for the primary course, one for the first alternative course of
    /// the request, and so on.
    #[inline]
    pub fn priority(&self) -> usize {
        self.priority
    }

    #[inline]
    pub fn course(&self) -> Option<CourseId> {
        self.course
    }

    #[inline]
    pub fn config(&self) -> Option<ConfigId> {
        self.config
    }

    /// Sections in ascending id order; empty for free times.
    #[inline]
    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    #[inline]
    pub fn uses_section(&self, section: SectionId) -> bool {
        self.sections.contains(&section)
    }

    #[inline]
    pub fn credit(&self) -> f32 {
        self.credit
    }

    #[inline]
    pub fn is_course(&self) -> bool {
        self.course.is_some()
    }

    #[inline]
    pub fn free_time(&self) -> Option<&TimeLocation> {
        self.free_time.as_ref()
    }
}

impl PartialEq for Enrollment {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request
            && self.config == other.config
            && self.sections == other.sections
            && self.free_time == other.free_time
    }
}

impl Value for Enrollment {
    fn variable(&self) -> VariableId {
        self.request
    }
}

impl fmt::Display for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.config, &self.free_time) {
            (Some(config), _) => {
                write!(f, "{}@cfg{}", self.request, config.index())?;
                for (i, s) in self.sections.iter().enumerate() {
                    write!(f, "{}s{}", if i == 0 { " " } else { "," }, s.index())?;
                }
                Ok(())
            }
            (None, Some(time)) => {
                write!(f, "{}@free {}+{}", self.request, time.start, time.length)
            }
            (None, None) => write!(f, "{}@?", self.request),
        }
    }
}
