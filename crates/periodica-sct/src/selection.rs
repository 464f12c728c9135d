//! Branch-and-bound schedule selection for one student.
//!
//! [`BranchBoundSelection`] searches the student's requests in priority
//! order, trying every non-conflicting enrollment of each request plus the
//! leave-unassigned branch, and keeps the best complete schedule under the
//! supplied [`SelectionCriterion`]. The search is anytime: the best found
//! so far is seeded from the student's current enrollments and returned
//! when the wall-clock budget runs out, so a timeout can only ever keep
//! the student where they already are, never make things worse.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use periodica_core::{AssignmentStore, VariableId};
use tracing::debug;

use crate::course::{ConfigId, SectionId, SubpartId};
use crate::criterion::SelectionCriterion;
use crate::enrollment::Enrollment;
use crate::error::{Result, SctError};
use crate::model::{SctContext, SectioningModel};
use crate::request::Request;
use crate::student::SctStudentId;

/// A required enrollment shape for one course request: the configuration
/// plus one pinned section per subpart that has one.
struct RequiredEnrollment {
    config: ConfigId,
    sections: HashMap<SubpartId, SectionId>,
}

/// Hard requirements imposed on the search from outside, typically the
/// student's consent screen: pinned sections, must-keep free times and
/// must-drop requests.
#[derive(Default)]
pub struct SelectionRequirements {
    required: HashMap<VariableId, RequiredEnrollment>,
    required_free_times: HashSet<VariableId>,
    required_unassigned: HashSet<VariableId>,
}

impl SelectionRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins a course request to the given sections; the configuration is
    /// taken from the first section.
    pub fn require_sections(
        &mut self,
        model: &SectioningModel,
        request: VariableId,
        sections: &[SectionId],
    ) -> Result<()> {
        let Some(&first) = sections.first() else {
            return Ok(());
        };
        let mut pinned = HashMap::new();
        for &s in sections {
            if s.index() >= model.sections().len() {
                return Err(SctError::UnknownReference {
                    kind: "section",
                    index: s.index(),
                });
            }
            pinned.insert(model.section(s).subpart(), s);
        }
        let config = model.subpart(model.section(first).subpart()).config();
        self.required
            .insert(request, RequiredEnrollment { config, sections: pinned });
        Ok(())
    }

    /// Forbids leaving a free-time request unassigned.
    pub fn require_free_time(&mut self, request: VariableId) {
        self.required_free_times.insert(request);
    }

    /// Forbids assigning a course request at all.
    pub fn require_unassigned(&mut self, request: VariableId) {
        self.required_unassigned.insert(request);
    }
}

/// Outcome of one selection run.
pub struct BranchBoundResult {
    /// Best schedule found, one optional enrollment per request in the
    /// student's priority order.
    pub schedule: Vec<Option<Enrollment>>,
    /// Criterion value of the schedule, for reporting.
    pub weight: f64,
    /// The wall-clock budget ran out before the tree was exhausted.
    pub timeout_reached: bool,
    pub elapsed: Duration,
}

impl BranchBoundResult {
    pub fn assigned_count(&self) -> usize {
        self.schedule.iter().flatten().count()
    }
}

/// Multi-criteria branch-and-bound over one student's requests.
pub struct BranchBoundSelection<'a, C> {
    model: &'a SectioningModel,
    criterion: C,
    requirements: SelectionRequirements,
}

impl<'a, C: SelectionCriterion> BranchBoundSelection<'a, C> {
    pub fn new(model: &'a SectioningModel, criterion: C) -> Self {
        BranchBoundSelection {
            model,
            criterion,
            requirements: SelectionRequirements::new(),
        }
    }

    pub fn with_requirements(
        model: &'a SectioningModel,
        criterion: C,
        requirements: SelectionRequirements,
    ) -> Self {
        BranchBoundSelection {
            model,
            criterion,
            requirements,
        }
    }

    /// Runs the search against the given assignment state and returns the
    /// best schedule found. The assignment itself is not modified; callers
    /// apply the returned schedule if they accept it.
    pub fn select<S: AssignmentStore<Enrollment>>(
        &self,
        store: &S,
        cx: &SctContext,
        student: SctStudentId,
    ) -> BranchBoundResult {
        let start = Instant::now();
        let requests = self.model.student(student).requests().to_vec();
        let mut current: Vec<Option<Enrollment>> = requests
            .iter()
            .map(|&r| store.get(r).cloned())
            .collect();
        // The student's current schedule is the bar to beat.
        let best = current.clone();
        for slot in &mut current {
            *slot = None;
        }

        let config = self.model.config();
        let deadline = (config.timeout_ms > 0)
            .then(|| start + Duration::from_millis(config.timeout_ms));

        let mut search = Search {
            model: self.model,
            cx,
            store,
            criterion: &self.criterion,
            requirements: &self.requirements,
            student,
            requests,
            current,
            best,
            values: HashMap::new(),
            deadline,
            timeout_reached: false,
            exhaustive: config.exhaustive,
            branch_on_selected: config.branch_when_selected_has_no_conflict,
        };
        search.back_track(0);

        let elapsed = start.elapsed();
        let weight = self
            .criterion
            .total_weight(self.model, cx, &search.best);
        debug!(
            student = self.model.student(student).external_id(),
            assigned = search.best.iter().flatten().count(),
            timeout = search.timeout_reached,
            elapsed_ms = elapsed.as_millis() as u64,
            weight,
            "branch and bound finished"
        );
        BranchBoundResult {
            schedule: search.best,
            weight,
            timeout_reached: search.timeout_reached,
            elapsed,
        }
    }
}

struct Search<'a, C, S> {
    model: &'a SectioningModel,
    cx: &'a SctContext,
    store: &'a S,
    criterion: &'a C,
    requirements: &'a SelectionRequirements,
    student: SctStudentId,
    requests: Vec<VariableId>,
    current: Vec<Option<Enrollment>>,
    best: Vec<Option<Enrollment>>,
    /// Per-request enrollments sorted by the criterion, filled lazily.
    values: HashMap<VariableId, Vec<Enrollment>>,
    deadline: Option<Instant>,
    timeout_reached: bool,
    exhaustive: bool,
    branch_on_selected: bool,
}

impl<C: SelectionCriterion, S: AssignmentStore<Enrollment>> Search<'_, C, S> {
    fn back_track(&mut self, idx: usize) {
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                self.timeout_reached = true;
                return;
            }
        }
        if idx == self.current.len() {
            if self
                .criterion
                .compare_schedules(self.model, self.cx, &self.current, &self.best)
                == Ordering::Less
            {
                self.best.clone_from(&self.current);
            }
            return;
        }
        if !self.exhaustive
            && !self
                .criterion
                .can_improve(self.model, self.cx, idx, &self.current, &self.best)
        {
            return;
        }

        let variable = self.requests[idx];
        if !self.can_assign(variable, idx) {
            self.back_track(idx + 1);
            return;
        }

        let request = self.model.request(variable);
        if request.is_course() && has_selection(request) {
            let selected = self.selected_enrollments(variable);
            if !selected.is_empty() {
                let mut has_no_conflict = false;
                for e in selected {
                    if self.in_conflict(idx, &e) {
                        continue;
                    }
                    has_no_conflict = true;
                    self.current[idx] = Some(e);
                    self.back_track(idx + 1);
                    self.current[idx] = None;
                }
                if has_no_conflict && self.branch_on_selected {
                    return;
                }
            }
        }

        let count = if request.is_course() {
            self.sorted_values(variable)
        } else {
            self.model.domain(variable).len()
        };

        let mut has_no_conflict = false;
        for i in 0..count {
            let e = if self.model.request(variable).is_course() {
                self.values[&variable][i].clone()
            } else {
                self.model.domain(variable)[i].clone()
            };
            if self.in_conflict(idx, &e) {
                continue;
            }
            has_no_conflict = true;
            self.current[idx] = Some(e);
            self.back_track(idx + 1);
            self.current[idx] = None;
        }

        let request = self.model.request(variable);
        if self.can_leave_unassigned(request) || (!has_no_conflict && request.is_course()) {
            self.back_track(idx + 1);
        }
    }

    /// Ensures the sorted enrollment list of a course request is cached
    /// and returns its length. A must-stay-unassigned request has no
    /// values.
    fn sorted_values(&mut self, variable: VariableId) -> usize {
        if !self.values.contains_key(&variable) {
            let mut values: Vec<Enrollment> =
                if self.requirements.required_unassigned.contains(&variable) {
                    Vec::new()
                } else {
                    self.model.domain(variable).to_vec()
                };
            values.sort_by(|a, b| {
                self.criterion
                    .compare_enrollments(self.model, self.cx, a, b)
            });
            self.values.insert(variable, values);
        }
        self.values[&variable].len()
    }

    /// Domain enrollments honoring the request's selected sections and
    /// configurations.
    fn selected_enrollments(&self, variable: VariableId) -> Vec<Enrollment> {
        let request = self.model.request(variable);
        self.model
            .domain(variable)
            .iter()
            .filter(|e| self.matches_selection(request, e))
            .cloned()
            .collect()
    }

    fn matches_selection(&self, request: &Request, e: &Enrollment) -> bool {
        let Some(config) = e.config() else {
            return false;
        };
        if let Some(configs) = request.selected_configs() {
            if !configs.is_empty() && !configs.contains(&config) {
                return false;
            }
        }
        if let Some(sections) = request.selected_sections() {
            for &s in sections {
                let subpart = self.model.section(s).subpart();
                if self.model.subpart(subpart).config() == config && !e.uses_section(s) {
                    return false;
                }
            }
        }
        true
    }

    fn in_conflict(&self, idx: usize, e: &Enrollment) -> bool {
        if self.exceeds_section_limits(e) {
            return true;
        }
        if let Some(course) = e.course() {
            for rule in self.model.linked_sections() {
                if !rule.involves_course(course) {
                    continue;
                }
                for (x, other) in self.current.iter().enumerate() {
                    if x == idx {
                        continue;
                    }
                    if let Some(other) = other {
                        if !self.model.link_pair_ok(rule, e, other) {
                            return true;
                        }
                    }
                }
            }
        }
        let mut credit = e.credit();
        let max_credit = self.model.student(self.student).max_credit();
        for (x, other) in self.current.iter().enumerate() {
            if x == idx {
                continue;
            }
            if let Some(other) = other {
                credit += other.credit();
                if credit > max_credit || self.model.enrollments_overlap(other, e) {
                    return true;
                }
            }
        }
        !self.is_allowed(e)
    }

    /// Seat availability against the shared assignment; the candidate's
    /// own current seat does not count against it.
    fn exceeds_section_limits(&self, e: &Enrollment) -> bool {
        let weight = self.model.request(e.request()).weight();
        for &s in e.sections() {
            let limit = self.model.section(s).limit();
            if limit < 0 {
                continue;
            }
            let mut load = self.cx.section_load(s) + weight;
            if let Some(current) = self.store.get(e.request()) {
                if current.uses_section(s) {
                    load -= weight;
                }
            }
            if load > f64::from(limit) {
                return true;
            }
        }
        false
    }

    /// A request may only be assigned when doing so cannot push a
    /// non-alternative course of the student out: every assigned or
    /// wait-listed alternative uses up one slot opened by an unassigned
    /// non-alternative course, and the credit floor must still fit.
    fn can_assign(&self, variable: VariableId, idx: usize) -> bool {
        if self.current[idx].is_some() {
            return true;
        }
        let mut alt = 0i32;
        let mut credit = 0.0f32;
        for (i, &r) in self.requests.iter().enumerate() {
            let other = self.model.request(r);
            if r == variable {
                credit += self.min_credit(other);
                continue;
            }
            if let Some(e) = &self.current[i] {
                credit += e.credit();
            }
            if other.is_alternative() {
                if self.current[i].is_some() || other.is_wait_list() {
                    alt -= 1;
                }
            } else if other.is_course() && !other.is_wait_list() && self.current[i].is_none() {
                alt += 1;
            }
        }
        let request = self.model.request(variable);
        (!request.is_alternative() || alt > 0)
            && credit <= self.model.student(self.student).max_credit()
    }

    /// Cheapest way to satisfy a request; zero for free times.
    fn min_credit(&self, request: &Request) -> f32 {
        request
            .courses()
            .iter()
            .map(|&c| self.model.course(c).credit())
            .fold(None, |m: Option<f32>, c| Some(m.map_or(c, |m| m.min(c))))
            .unwrap_or(0.0)
    }

    fn is_allowed(&self, e: &Enrollment) -> bool {
        if !e.is_course() {
            // A free-time enrollment always carries its time.
            return true;
        }
        if self.requirements.required_unassigned.contains(&e.request()) {
            return false;
        }
        if let Some(required) = self.requirements.required.get(&e.request()) {
            if e.config() != Some(required.config) {
                return false;
            }
            for &s in e.sections() {
                let subpart = self.model.section(s).subpart();
                if let Some(&pinned) = required.sections.get(&subpart) {
                    if s != pinned {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn can_leave_unassigned(&self, request: &Request) -> bool {
        if request.is_course() {
            !self.requirements.required.contains_key(&request.variable())
        } else {
            !self
                .requirements
                .required_free_times
                .contains(&request.variable())
        }
    }
}

fn has_selection(request: &Request) -> bool {
    request.selected_sections().is_some_and(|s| !s.is_empty())
        || request.selected_configs().is_some_and(|c| !c.is_empty())
}
