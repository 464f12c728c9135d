//! Bulk model construction.
//!
//! The builder is the load-time surface for the persistence layer: course
//! structure first (courses, configurations, subparts, sections), then
//! students and their requests in priority order, then linked-sections
//! rules; [`build`] wires constraints and precomputes every request's
//! enrollment domain. All structural errors fail fast here; a built model
//! never errors.
//!
//! [`build`]: SctModelBuilder::build

use std::collections::BTreeSet;

use periodica_core::{ConstraintId, VariableId};
use smallvec::SmallVec;

use crate::config::SelectionConfig;
use crate::course::{
    ConfigId, Course, CourseConfig, CourseId, Section, SectionId, SectionSpec, Subpart, SubpartId,
};
use crate::enrollment::Enrollment;
use crate::error::{Result, SctError};
use crate::linked::{LinkedId, LinkedSections};
use crate::model::{ConstraintKind, SectioningModel};
use crate::request::{CourseRequestSpec, Request, RequestKind};
use crate::student::{SctStudent, SctStudentId};
use crate::time::TimeLocation;

/// Incrementally constructs a [`SectioningModel`].
pub struct SctModelBuilder {
    config: SelectionConfig,
    courses: Vec<Course>,
    course_configs: Vec<CourseConfig>,
    subparts: Vec<Subpart>,
    sections: Vec<Section>,
    students: Vec<SctStudent>,
    requests: Vec<Request>,
    linked: Vec<LinkedSections>,
}

impl SctModelBuilder {
    pub fn new() -> Self {
        Self::with_config(SelectionConfig::default())
    }

    pub fn with_config(config: SelectionConfig) -> Self {
        SctModelBuilder {
            config,
            courses: Vec::new(),
            course_configs: Vec::new(),
            subparts: Vec::new(),
            sections: Vec::new(),
            students: Vec::new(),
            requests: Vec::new(),
            linked: Vec::new(),
        }
    }

    fn check_course(&self, course: CourseId) -> Result<()> {
        if course.index() < self.courses.len() {
            Ok(())
        } else {
            Err(SctError::UnknownReference {
                kind: "course",
                index: course.index(),
            })
        }
    }

    fn check_section(&self, section: SectionId) -> Result<()> {
        if section.index() < self.sections.len() {
            Ok(())
        } else {
            Err(SctError::UnknownReference {
                kind: "section",
                index: section.index(),
            })
        }
    }

    fn check_student(&self, student: SctStudentId) -> Result<()> {
        if student.index() < self.students.len() {
            Ok(())
        } else {
            Err(SctError::UnknownReference {
                kind: "student",
                index: student.index(),
            })
        }
    }

    fn check_time(time: &TimeLocation) -> Result<()> {
        if time.days == 0 || time.length == 0 {
            Err(SctError::DegenerateTime {
                days: time.days,
                length: time.length,
            })
        } else {
            Ok(())
        }
    }

    pub fn add_course(
        &mut self,
        external_id: i64,
        name: impl Into<String>,
        credit: f32,
    ) -> Result<CourseId> {
        if self.courses.iter().any(|c| c.external_id() == external_id) {
            return Err(SctError::DuplicateId {
                kind: "course",
                id: external_id,
            });
        }
        let id = CourseId(self.courses.len());
        self.courses
            .push(Course::new(id, external_id, name.into(), credit));
        Ok(id)
    }

    pub fn add_config(&mut self, course: CourseId) -> Result<ConfigId> {
        self.check_course(course)?;
        let id = ConfigId(self.course_configs.len());
        self.course_configs.push(CourseConfig::new(id, course));
        self.courses[course.index()].add_config(id);
        Ok(id)
    }

    pub fn add_subpart(&mut self, config: ConfigId, name: impl Into<String>) -> Result<SubpartId> {
        if config.index() >= self.course_configs.len() {
            return Err(SctError::UnknownReference {
                kind: "config",
                index: config.index(),
            });
        }
        let id = SubpartId(self.subparts.len());
        self.subparts.push(Subpart::new(id, config, name.into()));
        self.course_configs[config.index()].add_subpart(id);
        Ok(id)
    }

    pub fn add_section(&mut self, subpart: SubpartId, spec: SectionSpec) -> Result<SectionId> {
        if subpart.index() >= self.subparts.len() {
            return Err(SctError::UnknownReference {
                kind: "subpart",
                index: subpart.index(),
            });
        }
        if self
            .sections
            .iter()
            .any(|s| s.external_id() == spec.external_id)
        {
            return Err(SctError::DuplicateId {
                kind: "section",
                id: spec.external_id,
            });
        }
        if let Some(time) = &spec.time {
            Self::check_time(time)?;
        }
        let id = SectionId(self.sections.len());
        self.sections.push(Section::new(id, subpart, spec));
        self.subparts[subpart.index()].add_section(id);
        Ok(id)
    }

    pub fn add_student(&mut self, external_id: i64, max_credit: f32) -> Result<SctStudentId> {
        if self.students.iter().any(|s| s.external_id() == external_id) {
            return Err(SctError::DuplicateId {
                kind: "student",
                id: external_id,
            });
        }
        let id = SctStudentId(self.students.len());
        self.students
            .push(SctStudent::new(id, external_id, max_credit));
        Ok(id)
    }

    pub fn add_unavailability(&mut self, student: SctStudentId, time: TimeLocation) -> Result<()> {
        self.check_student(student)?;
        Self::check_time(&time)?;
        self.students[student.index()].add_unavailability(time);
        Ok(())
    }

    /// Appends a course request to a student's request list. Requests are
    /// prioritized in the order they are added.
    pub fn add_course_request(
        &mut self,
        student: SctStudentId,
        spec: CourseRequestSpec,
    ) -> Result<VariableId> {
        self.check_student(student)?;
        if spec.courses.is_empty() {
            return Err(SctError::EmptyCourseList {
                student: self.students[student.index()].external_id(),
            });
        }
        for &course in &spec.courses {
            self.check_course(course)?;
        }
        for &section in &spec.selected_sections {
            self.check_section(section)?;
        }
        for &config in &spec.selected_configs {
            if config.index() >= self.course_configs.len() {
                return Err(SctError::UnknownReference {
                    kind: "config",
                    index: config.index(),
                });
            }
        }
        let variable = VariableId(self.requests.len());
        let priority = self.students[student.index()].requests().len();
        self.requests.push(Request::new(
            variable,
            student,
            priority,
            spec.alternative,
            spec.weight,
            RequestKind::Course {
                courses: spec.courses,
                wait_list: spec.wait_list,
                selected_sections: spec.selected_sections,
                selected_configs: spec.selected_configs,
                min_penalty: 0.0,
            },
        ));
        self.students[student.index()].add_request(variable);
        Ok(variable)
    }

    /// Appends a free-time request to a student's request list.
    pub fn add_free_time_request(
        &mut self,
        student: SctStudentId,
        time: TimeLocation,
    ) -> Result<VariableId> {
        self.check_student(student)?;
        Self::check_time(&time)?;
        let variable = VariableId(self.requests.len());
        let priority = self.students[student.index()].requests().len();
        self.requests.push(Request::new(
            variable,
            student,
            priority,
            false,
            1.0,
            RequestKind::FreeTime(time),
        ));
        self.students[student.index()].add_request(variable);
        Ok(variable)
    }

    /// Adds a rule linking one section of each named course; every member
    /// section must belong to its course.
    pub fn add_linked_sections(
        &mut self,
        members: Vec<(CourseId, SectionId)>,
    ) -> Result<LinkedId> {
        if members.len() < 2 {
            return Err(SctError::LinkTooSmall(members.len()));
        }
        for &(course, section) in &members {
            self.check_course(course)?;
            self.check_section(section)?;
            let subpart = self.sections[section.index()].subpart();
            let config = self.subparts[subpart.index()].config();
            if self.course_configs[config.index()].course() != course {
                return Err(SctError::UnknownReference {
                    kind: "section",
                    index: section.index(),
                });
            }
        }
        let id = LinkedId(self.linked.len());
        self.linked.push(LinkedSections::new(id, members));
        Ok(id)
    }

    /// Finalizes the model: computes every request's enrollment domain and
    /// penalty floor, then wires the section, student and linked-sections
    /// constraints.
    pub fn build(mut self) -> Result<SectioningModel> {
        let mut domains = Vec::with_capacity(self.requests.len());
        for request in &self.requests {
            domains.push(self.enumerate_enrollments(request));
        }

        for (request, domain) in self.requests.iter_mut().zip(&domains) {
            if request.is_course() {
                let floor = domain
                    .iter()
                    .map(|e| enrollment_penalty(&self.sections, e))
                    .fold(f64::INFINITY, f64::min);
                request.set_min_penalty(if floor.is_finite() { floor } else { 0.0 });
            }
        }

        let mut constraint_kinds = Vec::new();
        let mut constraints_of: Vec<Vec<ConstraintId>> = vec![Vec::new(); self.requests.len()];

        // Section load constraints, one per section, attached to every
        // request whose domain can use the section. Unlimited sections
        // still track load for the over-expected penalty.
        let mut section_constraints = vec![None; self.sections.len()];
        for (variable, domain) in domains.iter().enumerate() {
            let used: BTreeSet<SectionId> = domain
                .iter()
                .flat_map(|e| e.sections().iter().copied())
                .collect();
            for section in used {
                let id = *section_constraints[section.index()].get_or_insert_with(|| {
                    let id = ConstraintId(constraint_kinds.len());
                    constraint_kinds.push(ConstraintKind::SectionLimit(section));
                    id
                });
                constraints_of[variable].push(id);
            }
        }

        for student in &self.students {
            let id = ConstraintId(constraint_kinds.len());
            constraint_kinds.push(ConstraintKind::Student(student.id()));
            for &request in student.requests() {
                constraints_of[request.index()].push(id);
            }
        }

        for rule in &self.linked {
            let id = ConstraintId(constraint_kinds.len());
            constraint_kinds.push(ConstraintKind::Linked(rule.id()));
            for request in &self.requests {
                if request
                    .courses()
                    .iter()
                    .any(|&c| rule.involves_course(c))
                {
                    constraints_of[request.variable().index()].push(id);
                }
            }
        }

        Ok(SectioningModel {
            config: self.config,
            courses: self.courses,
            course_configs: self.course_configs,
            subparts: self.subparts,
            sections: self.sections,
            students: self.students,
            requests: self.requests,
            linked: self.linked,
            domains,
            constraint_kinds,
            constraints_of,
        })
    }

    /// All enrollments of one request: for each requested course and each
    /// of its configurations, every combination of one section per subpart
    /// whose meeting times do not overlap each other.
    fn enumerate_enrollments(&self, request: &Request) -> Vec<Enrollment> {
        if let Some(&time) = request.free_time() {
            return vec![Enrollment::of_free_time(request.variable(), time)];
        }
        let mut out = Vec::new();
        for (priority, &course_id) in request.courses().iter().enumerate() {
            let course = &self.courses[course_id.index()];
            for &config_id in course.configs() {
                let subparts = self.course_configs[config_id.index()].subparts();
                let mut chosen = SmallVec::new();
                self.expand_subparts(subparts, &mut chosen, &mut |sections| {
                    out.push(Enrollment::of_course(
                        request.variable(),
                        priority,
                        course_id,
                        config_id,
                        sections.clone(),
                        course.credit(),
                    ));
                });
            }
        }
        out
    }

    fn expand_subparts(
        &self,
        remaining: &[SubpartId],
        chosen: &mut SmallVec<[SectionId; 4]>,
        emit: &mut impl FnMut(&SmallVec<[SectionId; 4]>),
    ) {
        let Some((&subpart, rest)) = remaining.split_first() else {
            if !chosen.is_empty() {
                emit(chosen);
            }
            return;
        };
        for &section in self.subparts[subpart.index()].sections() {
            if self.clashes_with_chosen(section, chosen) {
                continue;
            }
            chosen.push(section);
            self.expand_subparts(rest, chosen, emit);
            chosen.pop();
        }
    }

    fn clashes_with_chosen(&self, section: SectionId, chosen: &[SectionId]) -> bool {
        let Some(time) = self.sections[section.index()].time() else {
            return false;
        };
        chosen.iter().any(|&c| {
            self.sections[c.index()]
                .time()
                .is_some_and(|t| t.overlaps(time))
        })
    }
}

impl Default for SctModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Average section penalty of an enrollment; zero for free times.
pub(crate) fn enrollment_penalty(sections: &[Section], e: &Enrollment) -> f64 {
    if e.sections().is_empty() {
        return 0.0;
    }
    let total: f64 = e
        .sections()
        .iter()
        .map(|&s| sections[s.index()].penalty())
        .sum();
    total / e.sections().len() as f64
}
