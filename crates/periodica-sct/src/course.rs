//! Course structure: courses, configurations, subparts and sections.

use crate::time::TimeLocation;

/// Index of a course within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseId(pub usize);

impl CourseId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a course configuration within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(pub usize);

impl ConfigId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a subpart within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubpartId(pub usize);

impl SubpartId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a section within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub usize);

impl SectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A course students can request. An enrollment picks one of its
/// configurations.
#[derive(Debug, Clone)]
pub struct Course {
    id: CourseId,
    external_id: i64,
    name: String,
    credit: f32,
    configs: Vec<ConfigId>,
}

impl Course {
    pub(crate) fn new(id: CourseId, external_id: i64, name: String, credit: f32) -> Self {
        Course {
            id,
            external_id,
            name,
            credit,
            configs: Vec::new(),
        }
    }

    pub(crate) fn add_config(&mut self, config: ConfigId) {
        self.configs.push(config);
    }

    #[inline]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Credit hours earned by taking the course.
    #[inline]
    pub fn credit(&self) -> f32 {
        self.credit
    }

    #[inline]
    pub fn configs(&self) -> &[ConfigId] {
        &self.configs
    }
}

/// One way of taking a course: a set of subparts, one section of each.
#[derive(Debug, Clone)]
pub struct CourseConfig {
    id: ConfigId,
    course: CourseId,
    subparts: Vec<SubpartId>,
}

impl CourseConfig {
    pub(crate) fn new(id: ConfigId, course: CourseId) -> Self {
        CourseConfig {
            id,
            course,
            subparts: Vec::new(),
        }
    }

    pub(crate) fn add_subpart(&mut self, subpart: SubpartId) {
        self.subparts.push(subpart);
    }

    #[inline]
    pub fn id(&self) -> ConfigId {
        self.id
    }

    #[inline]
    pub fn course(&self) -> CourseId {
        self.course
    }

    #[inline]
    pub fn subparts(&self) -> &[SubpartId] {
        &self.subparts
    }
}

/// A scheduling subpart (lecture, lab, recitation) of a configuration. An
/// enrollment takes exactly one of its sections.
#[derive(Debug, Clone)]
pub struct Subpart {
    id: SubpartId,
    config: ConfigId,
    name: String,
    sections: Vec<SectionId>,
}

impl Subpart {
    pub(crate) fn new(id: SubpartId, config: ConfigId, name: String) -> Self {
        Subpart {
            id,
            config,
            name,
            sections: Vec::new(),
        }
    }

    pub(crate) fn add_section(&mut self, section: SectionId) {
        self.sections.push(section);
    }

    #[inline]
    pub fn id(&self) -> SubpartId {
        self.id
    }

    #[inline]
    pub fn config(&self) -> ConfigId {
        self.config
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }
}

/// Section attributes supplied to the builder.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub external_id: i64,
    pub name: String,
    /// Seat limit; negative means unlimited.
    pub limit: i32,
    /// How undesirable the section is, the last-resort tie break.
    pub penalty: f64,
    /// Seats expected to be needed by not-yet-sectioned students.
    pub space_expected: f64,
    /// Meeting time; `None` for arranged-hours sections.
    pub time: Option<TimeLocation>,
    pub online: bool,
    /// Section belongs to a part of the term that already started.
    pub past: bool,
    /// Coordinates for distance conflicts.
    pub location: Option<(f64, f64)>,
}

impl SectionSpec {
    pub fn new(external_id: i64, name: impl Into<String>, limit: i32) -> Self {
        SectionSpec {
            external_id,
            name: name.into(),
            limit,
            penalty: 0.0,
            space_expected: 0.0,
            time: None,
            online: false,
            past: false,
            location: None,
        }
    }

    pub fn with_time(mut self, time: TimeLocation) -> Self {
        self.time = Some(time);
        self
    }
}

/// A concrete class meeting a student can be placed into.
#[derive(Debug, Clone)]
pub struct Section {
    id: SectionId,
    subpart: SubpartId,
    external_id: i64,
    name: String,
    limit: i32,
    penalty: f64,
    space_expected: f64,
    time: Option<TimeLocation>,
    online: bool,
    past: bool,
    location: Option<(f64, f64)>,
}

impl Section {
    pub(crate) fn new(id: SectionId, subpart: SubpartId, spec: SectionSpec) -> Self {
        Section {
            id,
            subpart,
            external_id: spec.external_id,
            name: spec.name,
            limit: spec.limit,
            penalty: spec.penalty,
            space_expected: spec.space_expected,
            time: spec.time,
            online: spec.online,
            past: spec.past,
            location: spec.location,
        }
    }

    #[inline]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[inline]
    pub fn subpart(&self) -> SubpartId {
        self.subpart
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seat limit; negative means unlimited.
    #[inline]
    pub fn limit(&self) -> i32 {
        self.limit
    }

    #[inline]
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    #[inline]
    pub fn space_expected(&self) -> f64 {
        self.space_expected
    }

    #[inline]
    pub fn time(&self) -> Option<&TimeLocation> {
        self.time.as_ref()
    }

    #[inline]
    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    #[inline]
    pub fn is_online(&self) -> bool {
        self.online
    }

    #[inline]
    pub fn is_past(&self) -> bool {
        self.past
    }

    #[inline]
    pub fn location(&self) -> Option<(f64, f64)> {
        self.location
    }

    /// Euclidean distance between two sections, zero when either has no
    /// location.
    pub fn distance_to(&self, other: &Section) -> f64 {
        match (self.location, other.location) {
            (Some((x1, y1)), Some((x2, y2))) => {
                let dx = x1 - x2;
                let dy = y1 - y2;
                (dx * dx + dy * dy).sqrt()
            }
            _ => 0.0,
        }
    }
}
