//! The student sectioning model.
//!
//! [`SectioningModel`] owns the course structure, the students and their
//! requests, and the precomputed enrollment domains, and implements the
//! framework [`Model`] trait. The only incremental state is the per-section
//! seat load in [`SctContext`], one per assignment, so many selections can
//! run concurrently against one shared model.

use periodica_core::{AssignmentStore, ConflictSet, ConstraintId, Model, VariableId};

use crate::config::SelectionConfig;
use crate::course::{ConfigId, Course, CourseConfig, Section, SectionId, Subpart, SubpartId};
use crate::enrollment::Enrollment;
use crate::linked::{LinkedId, LinkedSections};
use crate::request::Request;
use crate::student::{SctStudent, SctStudentId};

/// Which entity a [`ConstraintId`] refers to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ConstraintKind {
    SectionLimit(SectionId),
    Student(SctStudentId),
    Linked(LinkedId),
}

/// Per-assignment incremental state: seat load per section.
#[derive(Debug, Clone)]
pub struct SctContext {
    section_load: Vec<f64>,
}

impl SctContext {
    fn new(sections: usize) -> Self {
        SctContext {
            section_load: vec![0.0; sections],
        }
    }

    /// Combined weight of all enrollments currently using a section.
    #[inline]
    pub fn section_load(&self, section: SectionId) -> f64 {
        self.section_load[section.index()]
    }
}

/// The sectioning problem: course structure, students, requests, domains.
pub struct SectioningModel {
    pub(crate) config: SelectionConfig,
    pub(crate) courses: Vec<Course>,
    pub(crate) course_configs: Vec<CourseConfig>,
    pub(crate) subparts: Vec<Subpart>,
    pub(crate) sections: Vec<Section>,
    pub(crate) students: Vec<SctStudent>,
    pub(crate) requests: Vec<Request>,
    pub(crate) linked: Vec<LinkedSections>,
    pub(crate) domains: Vec<Vec<Enrollment>>,
    pub(crate) constraint_kinds: Vec<ConstraintKind>,
    pub(crate) constraints_of: Vec<Vec<ConstraintId>>,
}

impl SectioningModel {
    #[inline]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    #[inline]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    #[inline]
    pub fn course(&self, id: crate::course::CourseId) -> &Course {
        &self.courses[id.index()]
    }

    #[inline]
    pub fn course_config(&self, id: ConfigId) -> &CourseConfig {
        &self.course_configs[id.index()]
    }

    #[inline]
    pub fn subpart(&self, id: SubpartId) -> &Subpart {
        &self.subparts[id.index()]
    }

    #[inline]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[inline]
    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.index()]
    }

    #[inline]
    pub fn students(&self) -> &[SctStudent] {
        &self.students
    }

    #[inline]
    pub fn student(&self, id: SctStudentId) -> &SctStudent {
        &self.students[id.index()]
    }

    #[inline]
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    #[inline]
    pub fn request(&self, variable: VariableId) -> &Request {
        &self.requests[variable.index()]
    }

    #[inline]
    pub fn linked_sections(&self) -> &[LinkedSections] {
        &self.linked
    }

    /// Precomputed enrollments of a request, in course preference order.
    #[inline]
    pub fn domain(&self, variable: VariableId) -> &[Enrollment] {
        &self.domains[variable.index()]
    }

    /// Seat limit of a subpart: the sum of its section limits, negative if
    /// any section is unlimited.
    pub fn subpart_limit(&self, subpart: SubpartId) -> i32 {
        let mut total = 0;
        for &s in self.subparts[subpart.index()].sections() {
            let limit = self.sections[s.index()].limit();
            if limit < 0 {
                return -1;
            }
            total += limit;
        }
        total
    }

    /// Hard time overlap between two enrollments of one student.
    ///
    /// Free-time enrollments never hard-overlap; overlapping a free time is
    /// penalized by the criterion tiers instead. Arranged-hours sections
    /// never overlap anything.
    pub fn enrollments_overlap(&self, a: &Enrollment, b: &Enrollment) -> bool {
        if a.free_time().is_some() || b.free_time().is_some() {
            return false;
        }
        for &sa in a.sections() {
            let Some(ta) = self.sections[sa.index()].time() else {
                continue;
            };
            for &sb in b.sections() {
                if let Some(tb) = self.sections[sb.index()].time() {
                    if ta.overlaps(tb) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Day-by-slot overlap between two enrollments, free times included.
    pub fn overlap_slots_between(&self, a: &Enrollment, b: &Enrollment) -> u32 {
        let mut total = 0;
        for ta in self.enrollment_times(a) {
            for tb in self.enrollment_times(b) {
                total += ta.overlap_slots(&tb);
            }
        }
        total
    }

    pub(crate) fn enrollment_times<'a>(
        &'a self,
        e: &'a Enrollment,
    ) -> impl Iterator<Item = crate::time::TimeLocation> + 'a {
        e.free_time().copied().into_iter().chain(
            e.sections()
                .iter()
                .filter_map(|&s| self.sections[s.index()].time().copied()),
        )
    }

    /// Day-by-slot overlap between an enrollment and the times its student
    /// is unavailable.
    pub fn unavailability_slots(&self, student: SctStudentId, e: &Enrollment) -> u32 {
        let mut total = 0;
        for t in self.enrollment_times(e) {
            for u in self.students[student.index()].unavailable() {
                total += t.overlap_slots(u);
            }
        }
        total
    }

    /// Average section penalty of an enrollment; zero for free times.
    #[inline]
    pub fn enrollment_penalty(&self, e: &Enrollment) -> f64 {
        crate::builder::enrollment_penalty(&self.sections, e)
    }

    /// Over-expectedness of placing one more request into a section.
    ///
    /// A section is over-expected when the expected space (scaled and
    /// rounded per the config) plus the current load plus this request
    /// exceeds the limit; the unit contribution is split evenly over the
    /// configuration's subparts. Unlimited sections are never over-expected.
    pub fn over_expected(&self, cx: &SctContext, section: SectionId, request_weight: f64) -> f64 {
        let s = &self.sections[section.index()];
        if s.limit() <= 0 {
            return 0.0;
        }
        let expected = self
            .config
            .rounding
            .apply(self.config.over_expected_percentage * s.space_expected());
        let enrolled = cx.section_load(section) + request_weight;
        if expected + enrolled > f64::from(s.limit()) {
            let config = self.subparts[s.subpart().index()].config();
            1.0 / self.course_configs[config.index()].subparts().len() as f64
        } else {
            0.0
        }
    }

    /// Sum of [`over_expected`](Self::over_expected) over an enrollment's
    /// sections.
    pub fn enrollment_over_expected(&self, cx: &SctContext, e: &Enrollment) -> f64 {
        let weight = self.requests[e.request().index()].weight();
        e.sections()
            .iter()
            .map(|&s| self.over_expected(cx, s, weight))
            .sum()
    }

    /// Back-to-back section pairs within one enrollment further apart than
    /// the distance limit.
    pub fn distance_conflicts(&self, e: &Enrollment) -> u32 {
        let mut conflicts = 0;
        let sections = e.sections();
        for (i, &sa) in sections.iter().enumerate() {
            for &sb in &sections[i + 1..] {
                if self.is_distance_conflict(sa, sb) {
                    conflicts += 1;
                }
            }
        }
        conflicts
    }

    /// Back-to-back section pairs across two enrollments further apart than
    /// the distance limit.
    pub fn distance_conflicts_between(&self, a: &Enrollment, b: &Enrollment) -> u32 {
        let mut conflicts = 0;
        for &sa in a.sections() {
            for &sb in b.sections() {
                if self.is_distance_conflict(sa, sb) {
                    conflicts += 1;
                }
            }
        }
        conflicts
    }

    fn is_distance_conflict(&self, a: SectionId, b: SectionId) -> bool {
        let sa = &self.sections[a.index()];
        let sb = &self.sections[b.index()];
        match (sa.time(), sb.time()) {
            (Some(ta), Some(tb)) => {
                ta.is_back_to_back(tb) && sa.distance_to(sb) > self.config.distance_limit
            }
            _ => false,
        }
    }

    /// True if the enrollment honors every linked-sections rule its course
    /// participates in alone; pairwise compliance is checked per rule
    /// against the other enrollment.
    pub(crate) fn link_pair_ok(&self, rule: &LinkedSections, a: &Enrollment, b: &Enrollment) -> bool {
        let (Some(ca), Some(cb)) = (a.course(), b.course()) else {
            return true;
        };
        let (Some(sa), Some(sb)) = (rule.section_of(ca), rule.section_of(cb)) else {
            return true;
        };
        // Both courses are in the rule, so both enrollments must follow it.
        a.uses_section(sa) && b.uses_section(sb)
    }

    fn section_limit_conflicts<S: AssignmentStore<Enrollment>>(
        &self,
        store: &S,
        cx: &SctContext,
        section: SectionId,
        value: &Enrollment,
        conflicts: &mut ConflictSet<Enrollment>,
    ) {
        if !value.uses_section(section) {
            return;
        }
        let limit = self.sections[section.index()].limit();
        if limit < 0 {
            return;
        }
        let weight = self.requests[value.request().index()].weight();
        let mut load = cx.section_load(section);
        // The candidate's own current value may already sit in the section.
        if let Some(current) = store.get(value.request()) {
            if current.uses_section(section) {
                load -= weight;
            }
        }
        if load + weight <= f64::from(limit) {
            return;
        }
        for variable in store.assigned_variables() {
            if variable == value.request() {
                continue;
            }
            if let Some(other) = store.get(variable) {
                if other.uses_section(section) {
                    load -= self.requests[variable.index()].weight();
                    conflicts.add(other.clone());
                    if load + weight <= f64::from(limit) {
                        return;
                    }
                }
            }
        }
    }

    fn student_conflicts<S: AssignmentStore<Enrollment>>(
        &self,
        store: &S,
        student: SctStudentId,
        value: &Enrollment,
        conflicts: &mut ConflictSet<Enrollment>,
    ) {
        let data = &self.students[student.index()];
        let mut credit = value.credit();
        for &request in data.requests() {
            if request == value.request() {
                continue;
            }
            if let Some(other) = store.get(request) {
                if self.enrollments_overlap(value, other) {
                    conflicts.add(other.clone());
                } else {
                    credit += other.credit();
                }
            }
        }
        if credit <= data.max_credit() {
            return;
        }
        // Over the credit cap: shed the student's lowest-priority
        // enrollments until the candidate fits.
        for &request in data.requests().iter().rev() {
            if request == value.request() {
                continue;
            }
            if let Some(other) = store.get(request) {
                if conflicts.contains(other) {
                    continue;
                }
                credit -= other.credit();
                conflicts.add(other.clone());
                if credit <= data.max_credit() {
                    return;
                }
            }
        }
    }

    fn linked_conflicts<S: AssignmentStore<Enrollment>>(
        &self,
        store: &S,
        rule: &LinkedSections,
        value: &Enrollment,
        conflicts: &mut ConflictSet<Enrollment>,
    ) {
        let Some(course) = value.course() else {
            return;
        };
        if !rule.involves_course(course) {
            return;
        }
        let student = self.requests[value.request().index()].student();
        for &request in self.students[student.index()].requests() {
            if request == value.request() {
                continue;
            }
            if let Some(other) = store.get(request) {
                if !self.link_pair_ok(rule, value, other) {
                    conflicts.add(other.clone());
                }
            }
        }
    }
}

impl Model for SectioningModel {
    type Value = Enrollment;
    type Context = SctContext;

    fn variable_count(&self) -> usize {
        self.requests.len()
    }

    fn new_context(&self) -> SctContext {
        SctContext::new(self.sections.len())
    }

    fn constraints_of(&self, variable: VariableId) -> &[ConstraintId] {
        &self.constraints_of[variable.index()]
    }

    fn constraint_assigned<S: AssignmentStore<Enrollment>>(
        &self,
        _store: &S,
        cx: &mut SctContext,
        constraint: ConstraintId,
        _iteration: u64,
        value: &Enrollment,
    ) {
        if let ConstraintKind::SectionLimit(section) = self.constraint_kinds[constraint.index()] {
            if value.uses_section(section) {
                cx.section_load[section.index()] +=
                    self.requests[value.request().index()].weight();
            }
        }
    }

    fn constraint_unassigned<S: AssignmentStore<Enrollment>>(
        &self,
        _store: &S,
        cx: &mut SctContext,
        constraint: ConstraintId,
        _iteration: u64,
        value: &Enrollment,
    ) {
        if let ConstraintKind::SectionLimit(section) = self.constraint_kinds[constraint.index()] {
            if value.uses_section(section) {
                cx.section_load[section.index()] -=
                    self.requests[value.request().index()].weight();
            }
        }
    }

    fn constraint_conflicts<S: AssignmentStore<Enrollment>>(
        &self,
        store: &S,
        cx: &SctContext,
        constraint: ConstraintId,
        value: &Enrollment,
        conflicts: &mut ConflictSet<Enrollment>,
    ) {
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::SectionLimit(section) => {
                self.section_limit_conflicts(store, cx, section, value, conflicts);
            }
            ConstraintKind::Student(student) => {
                self.student_conflicts(store, student, value, conflicts);
            }
            ConstraintKind::Linked(link) => {
                self.linked_conflicts(store, &self.linked[link.index()], value, conflicts);
            }
        }
    }

    fn constraint_consistent(
        &self,
        constraint: ConstraintId,
        first: &Enrollment,
        second: &Enrollment,
    ) -> bool {
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::SectionLimit(section) => {
                let limit = self.sections[section.index()].limit();
                if limit < 0 || !first.uses_section(section) || !second.uses_section(section) {
                    return true;
                }
                let combined = self.requests[first.request().index()].weight()
                    + self.requests[second.request().index()].weight();
                combined <= f64::from(limit)
            }
            ConstraintKind::Student(student) => {
                if !self.enrollments_overlap(first, second) {
                    let cap = self.students[student.index()].max_credit();
                    first.credit() + second.credit() <= cap
                } else {
                    false
                }
            }
            ConstraintKind::Linked(link) => {
                self.link_pair_ok(&self.linked[link.index()], first, second)
            }
        }
    }

    fn constraint_is_hard(&self, _constraint: ConstraintId) -> bool {
        true
    }
}
