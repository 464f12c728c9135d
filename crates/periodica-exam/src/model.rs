//! The examination timetabling model.
//!
//! [`ExamTimetable`] owns the read-only problem structure (periods, rooms,
//! people, distributions, exams, precomputed domains) and implements the
//! framework [`Model`] trait. All incremental state, the room occupancy
//! slots, the per-student and per-instructor period/day tables and the
//! running objective counters, lives in [`ExamContext`], one per
//! assignment.
//!
//! Objective counters are maintained placement-delta style: a placement's
//! per-category contribution is subtracted in `before_unassigned` (while
//! the tables still include it) and added in `after_assigned` (after the
//! tables were updated). Every per-category count skips the placement's own
//! exam, so the computed contribution is the same in both positions and the
//! counters telescope to the precise from-scratch totals.

use std::collections::BTreeMap;

use periodica_core::{Assignment, AssignmentStore, ConflictSet, ConstraintId, Model, VariableId};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::{ExamConfig, ExamWeights};
use crate::distribution::{Distribution, DistributionId};
use crate::exam::Exam;
use crate::instructor::{Instructor, InstructorId};
use crate::period::{Period, PeriodId};
use crate::placement::ExamPlacement;
use crate::room::{Room, RoomGroup, RoomId};
use crate::student::{Student, StudentId};

/// Which entity a [`ConstraintId`] refers to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ConstraintKind {
    Room(RoomId),
    Student(StudentId),
    Instructor(InstructorId),
    Distribution(DistributionId),
}

/// Running totals of every penalty category.
///
/// Counts are signed so transient negative values cannot panic while a
/// sequence of unassignments is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PenaltyCounters {
    pub direct: i64,
    pub back_to_back: i64,
    pub distance_back_to_back: i64,
    pub more_than_two_a_day: i64,
    pub instructor_direct: i64,
    pub instructor_back_to_back: i64,
    pub instructor_distance_back_to_back: i64,
    pub instructor_more_than_two_a_day: i64,
    pub period: f64,
    pub room_size: i64,
    pub room_split: i64,
    pub room_split_distance: f64,
    pub room: f64,
    pub distribution: f64,
    pub rotation: i64,
    pub perturbation: i64,
    pub large: i64,
}

impl PenaltyCounters {
    /// Weighted sum of all categories.
    pub fn weighted_total(&self, weights: &ExamWeights) -> f64 {
        weights.direct_conflict * self.direct as f64
            + weights.back_to_back_conflict * self.back_to_back as f64
            + weights.distance_back_to_back_conflict * self.distance_back_to_back as f64
            + weights.more_than_two_a_day * self.more_than_two_a_day as f64
            + weights.instructor_direct_conflict * self.instructor_direct as f64
            + weights.instructor_back_to_back_conflict * self.instructor_back_to_back as f64
            + weights.instructor_distance_back_to_back_conflict
                * self.instructor_distance_back_to_back as f64
            + weights.instructor_more_than_two_a_day * self.instructor_more_than_two_a_day as f64
            + weights.period * self.period
            + weights.room_size * self.room_size as f64
            + weights.room_split * self.room_split as f64
            + weights.room_split_distance * self.room_split_distance
            + weights.room * self.room
            + weights.distribution * self.distribution
            + weights.rotation * self.rotation as f64
            + weights.perturbation * self.perturbation as f64
            + weights.large * self.large as f64
    }
}

/// Per-assignment incremental state.
///
/// Tables are flattened: room occupancy by `room * periods + period`,
/// person tables by `person * periods + period` and `person * days + day`.
#[derive(Debug, Clone)]
pub struct ExamContext {
    periods: usize,
    days: usize,
    room_occupant: Vec<Option<VariableId>>,
    student_periods: Vec<SmallVec<[VariableId; 2]>>,
    student_days: Vec<SmallVec<[VariableId; 2]>>,
    instructor_periods: Vec<SmallVec<[VariableId; 2]>>,
    instructor_days: Vec<SmallVec<[VariableId; 2]>>,
    counters: PenaltyCounters,
}

impl ExamContext {
    fn new(periods: usize, days: usize, rooms: usize, students: usize, instructors: usize) -> Self {
        ExamContext {
            periods,
            days,
            room_occupant: vec![None; rooms * periods],
            student_periods: vec![SmallVec::new(); students * periods],
            student_days: vec![SmallVec::new(); students * days],
            instructor_periods: vec![SmallVec::new(); instructors * periods],
            instructor_days: vec![SmallVec::new(); instructors * days],
            counters: PenaltyCounters::default(),
        }
    }

    /// The exam currently occupying a room in a period, if any.
    #[inline]
    pub fn room_occupant(&self, room: RoomId, period: PeriodId) -> Option<VariableId> {
        self.room_occupant[room.index() * self.periods + period.index()]
    }

    /// Exams of a student currently assigned at a period.
    #[inline]
    pub fn student_exams_at(&self, student: StudentId, period: PeriodId) -> &[VariableId] {
        &self.student_periods[student.index() * self.periods + period.index()]
    }

    /// Exams of a student currently assigned on a day.
    #[inline]
    pub fn student_exams_on(&self, student: StudentId, day: usize) -> &[VariableId] {
        &self.student_days[student.index() * self.days + day]
    }

    /// Exams of an instructor currently assigned at a period.
    #[inline]
    pub fn instructor_exams_at(&self, instructor: InstructorId, period: PeriodId) -> &[VariableId] {
        &self.instructor_periods[instructor.index() * self.periods + period.index()]
    }

    /// Exams of an instructor currently assigned on a day.
    #[inline]
    pub fn instructor_exams_on(&self, instructor: InstructorId, day: usize) -> &[VariableId] {
        &self.instructor_days[instructor.index() * self.days + day]
    }

    /// The running objective counters.
    #[inline]
    pub fn counters(&self) -> &PenaltyCounters {
        &self.counters
    }

    fn set_room_occupant(&mut self, room: RoomId, period: PeriodId, exam: Option<VariableId>) {
        self.room_occupant[room.index() * self.periods + period.index()] = exam;
    }
}

fn table_insert(table: &mut [SmallVec<[VariableId; 2]>], slot: usize, exam: VariableId) {
    if !table[slot].contains(&exam) {
        table[slot].push(exam);
    }
}

fn table_remove(table: &mut [SmallVec<[VariableId; 2]>], slot: usize, exam: VariableId) {
    table[slot].retain(|x| *x != exam);
}

/// The examination timetabling problem.
///
/// Built once by [`ExamModelBuilder`](crate::builder::ExamModelBuilder) and
/// immutable afterwards (forced placement resolution being the one
/// explicit, load-time exception); any number of assignments can search
/// over it concurrently.
#[derive(Debug)]
pub struct ExamTimetable {
    pub(crate) config: ExamConfig,
    pub(crate) periods: Vec<Period>,
    pub(crate) day_count: usize,
    pub(crate) rooms: Vec<Room>,
    pub(crate) room_groups: Vec<RoomGroup>,
    pub(crate) students: Vec<Student>,
    pub(crate) instructors: Vec<Instructor>,
    pub(crate) distributions: Vec<Distribution>,
    pub(crate) exams: Vec<Exam>,
    pub(crate) domains: Vec<Vec<ExamPlacement>>,
    pub(crate) constraint_kinds: Vec<ConstraintKind>,
    pub(crate) constraints_of: Vec<Vec<ConstraintId>>,
    pub(crate) initial: Vec<Option<ExamPlacement>>,
}

impl ExamTimetable {
    #[inline]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[inline]
    pub fn weights(&self) -> &ExamWeights {
        &self.config.weights
    }

    #[inline]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    #[inline]
    pub fn day_count(&self) -> usize {
        self.day_count
    }

    #[inline]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    #[inline]
    pub fn room_groups(&self) -> &[RoomGroup] {
        &self.room_groups
    }

    #[inline]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    #[inline]
    pub fn instructors(&self) -> &[Instructor] {
        &self.instructors
    }

    #[inline]
    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    #[inline]
    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    #[inline]
    pub fn exam(&self, variable: VariableId) -> &Exam {
        &self.exams[variable.index()]
    }

    /// Candidate placements of an exam; empty for a permanently
    /// unassignable exam.
    #[inline]
    pub fn domain(&self, variable: VariableId) -> &[ExamPlacement] {
        &self.domains[variable.index()]
    }

    /// The initial placement of an exam, used by the perturbation penalty.
    #[inline]
    pub fn initial(&self, variable: VariableId) -> Option<&ExamPlacement> {
        self.initial[variable.index()].as_ref()
    }

    /// Builds a placement for an exam, computing the aggregate room
    /// attributes. `None` when the period is not a candidate.
    pub fn placement(
        &self,
        exam: VariableId,
        period: PeriodId,
        rooms: impl IntoIterator<Item = RoomId>,
    ) -> Option<ExamPlacement> {
        crate::domain::make_placement(
            self.exam(exam),
            period,
            rooms.into_iter().collect(),
            &self.rooms,
        )
    }

    /// Maximal distance between a room of `a` and a room of `b`; zero when
    /// either placement has no rooms.
    pub fn placement_distance(&self, a: &ExamPlacement, b: &ExamPlacement) -> f64 {
        let mut max = 0.0f64;
        for &r1 in a.rooms() {
            for &r2 in b.rooms() {
                max = max.max(self.rooms[r1.index()].distance_to(&self.rooms[r2.index()]));
            }
        }
        max
    }

    fn can_student_conflict(&self, student: StudentId, a: VariableId, b: VariableId) -> bool {
        self.students[student.index()].allow_direct_conflicts()
            && self.exam(a).allow_direct_conflicts()
            && self.exam(b).allow_direct_conflicts()
    }

    fn can_instructor_conflict(&self, instructor: InstructorId, a: VariableId, b: VariableId) -> bool {
        self.instructors[instructor.index()].allow_direct_conflicts()
            && self.exam(a).allow_direct_conflicts()
            && self.exam(b).allow_direct_conflicts()
    }

    fn adjacent_periods(&self, period: PeriodId, same_day_only: bool) -> SmallVec<[PeriodId; 2]> {
        let p = &self.periods[period.index()];
        let mut out = SmallVec::new();
        let crosses_day_ok = !same_day_only && self.config.day_break_back_to_back;
        if let Some(prev) = p.prev() {
            if self.periods[prev.index()].day() == p.day() || crosses_day_ok {
                out.push(prev);
            }
        }
        if let Some(next) = p.next() {
            if self.periods[next.index()].day() == p.day() || crosses_day_ok {
                out.push(next);
            }
        }
        out
    }

    /// Number of students of this exam with another exam at the same
    /// period, or who are unavailable at it.
    pub fn direct_conflicts(&self, cx: &ExamContext, placement: &ExamPlacement) -> u32 {
        let exam = self.exam(placement.exam());
        let period = placement.period();
        let mut penalty = 0;
        for &s in exam.students() {
            let at = cx.student_exams_at(s, period);
            let nr = at.len() + usize::from(!at.contains(&placement.exam()));
            if nr > 1 {
                penalty += 1;
            } else if !self.students[s.index()].is_available(period) {
                penalty += 1;
            }
        }
        penalty
    }

    /// Number of student exams adjacent to this placement's period.
    pub fn back_to_back_conflicts(&self, cx: &ExamContext, placement: &ExamPlacement) -> u32 {
        let exam = self.exam(placement.exam());
        let mut penalty = 0;
        for adjacent in self.adjacent_periods(placement.period(), false) {
            for &s in exam.students() {
                let at = cx.student_exams_at(s, adjacent);
                penalty += (at.len() - usize::from(at.contains(&placement.exam()))) as u32;
            }
        }
        penalty
    }

    /// Back-to-back conflicts whose rooms are further apart than the
    /// distance limit; zero when the limit is disabled.
    pub fn distance_back_to_back_conflicts<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &ExamContext,
        placement: &ExamPlacement,
    ) -> u32 {
        let Some(limit) = self.config.back_to_back_distance else {
            return 0;
        };
        let exam = self.exam(placement.exam());
        let mut penalty = 0;
        for adjacent in self.adjacent_periods(placement.period(), true) {
            for &s in exam.students() {
                for &other in cx.student_exams_at(s, adjacent) {
                    if other == placement.exam() {
                        continue;
                    }
                    if let Some(other_placement) = store.get(other) {
                        if self.placement_distance(placement, other_placement) > limit {
                            penalty += 1;
                        }
                    }
                }
            }
        }
        penalty
    }

    /// Number of students of this exam with more than two exams on the
    /// placement's day.
    pub fn more_than_two_a_day_conflicts(&self, cx: &ExamContext, placement: &ExamPlacement) -> u32 {
        let exam = self.exam(placement.exam());
        let day = self.periods[placement.period().index()].day_index();
        let mut penalty = 0;
        for &s in exam.students() {
            let on = cx.student_exams_on(s, day);
            let nr = on.len() + usize::from(!on.contains(&placement.exam()));
            if nr > 2 {
                penalty += 1;
            }
        }
        penalty
    }

    pub fn instructor_direct_conflicts(&self, cx: &ExamContext, placement: &ExamPlacement) -> u32 {
        let exam = self.exam(placement.exam());
        let period = placement.period();
        let mut penalty = 0;
        for &i in exam.instructors() {
            let at = cx.instructor_exams_at(i, period);
            let nr = at.len() + usize::from(!at.contains(&placement.exam()));
            if nr > 1 {
                penalty += 1;
            } else if !self.instructors[i.index()].is_available(period) {
                penalty += 1;
            }
        }
        penalty
    }

    pub fn instructor_back_to_back_conflicts(
        &self,
        cx: &ExamContext,
        placement: &ExamPlacement,
    ) -> u32 {
        let exam = self.exam(placement.exam());
        let mut penalty = 0;
        for adjacent in self.adjacent_periods(placement.period(), false) {
            for &i in exam.instructors() {
                let at = cx.instructor_exams_at(i, adjacent);
                penalty += (at.len() - usize::from(at.contains(&placement.exam()))) as u32;
            }
        }
        penalty
    }

    pub fn instructor_distance_back_to_back_conflicts<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &ExamContext,
        placement: &ExamPlacement,
    ) -> u32 {
        let Some(limit) = self.config.back_to_back_distance else {
            return 0;
        };
        let exam = self.exam(placement.exam());
        let mut penalty = 0;
        for adjacent in self.adjacent_periods(placement.period(), true) {
            for &i in exam.instructors() {
                for &other in cx.instructor_exams_at(i, adjacent) {
                    if other == placement.exam() {
                        continue;
                    }
                    if let Some(other_placement) = store.get(other) {
                        if self.placement_distance(placement, other_placement) > limit {
                            penalty += 1;
                        }
                    }
                }
            }
        }
        penalty
    }

    pub fn instructor_more_than_two_a_day_conflicts(
        &self,
        cx: &ExamContext,
        placement: &ExamPlacement,
    ) -> u32 {
        let exam = self.exam(placement.exam());
        let day = self.periods[placement.period().index()].day_index();
        let mut penalty = 0;
        for &i in exam.instructors() {
            let on = cx.instructor_exams_on(i, day);
            let nr = on.len() + usize::from(!on.contains(&placement.exam()));
            if nr > 2 {
                penalty += 1;
            }
        }
        penalty
    }

    /// Effective period penalty of a placement.
    pub fn period_penalty(&self, placement: &ExamPlacement) -> f64 {
        self.exam(placement.exam())
            .period_penalty(placement.period())
            .unwrap_or(0.0)
    }

    /// Seats above the exam's size; zero for an undersized forced room set.
    pub fn room_size_penalty(&self, placement: &ExamPlacement) -> u32 {
        placement
            .size()
            .saturating_sub(self.exam(placement.exam()).size())
    }

    /// Rotation penalty: exams that sat late before prefer early periods.
    pub fn rotation_penalty(&self, placement: &ExamPlacement) -> u64 {
        match self.exam(placement.exam()).average_period() {
            Some(average) => (1 + placement.period().index() as u64) * (1 + average as u64),
            None => 0,
        }
    }

    /// Front-load penalty: one if a large exam sits on or after the cutoff
    /// period.
    pub fn large_penalty(&self, placement: &ExamPlacement) -> u32 {
        let Some(large_size) = self.config.large_size else {
            return 0;
        };
        if self.exam(placement.exam()).size() < large_size {
            return 0;
        }
        let cutoff = (self.periods.len() as f64 * self.config.large_period()).round() as usize;
        u32::from(placement.period().index() >= cutoff)
    }

    /// Perturbation penalty: periods moved from the initial assignment
    /// times the exam size. Zero unless minimal perturbation mode is on.
    pub fn perturbation_penalty(&self, placement: &ExamPlacement) -> u64 {
        if !self.config.minimal_perturbation {
            return 0;
        }
        match self.initial(placement.exam()) {
            Some(initial) => {
                let moved = placement
                    .period()
                    .index()
                    .abs_diff(initial.period().index());
                moved as u64 * u64::from(self.exam(placement.exam()).size())
            }
            None => 0,
        }
    }

    /// Weight of a soft distribution constraint if any assigned ordered
    /// pair violates it, zero otherwise.
    fn distribution_unsatisfied_weight<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        distribution: &Distribution,
    ) -> f64 {
        let assigned: Vec<&ExamPlacement> = distribution
            .exams()
            .iter()
            .filter_map(|&exam| store.get(exam))
            .collect();
        for (i, first) in assigned.iter().enumerate() {
            for second in &assigned[i + 1..] {
                if !distribution.check_pair(&self.periods, first, second) {
                    return distribution.weight();
                }
            }
        }
        0.0
    }

    /// Total weight of soft distribution constraints of this exam that are
    /// violated with the placement in place.
    pub fn distribution_penalty<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        placement: &ExamPlacement,
    ) -> f64 {
        let exam = self.exam(placement.exam());
        let mut penalty = 0.0;
        for &d in exam.distributions() {
            let distribution = &self.distributions[d.index()];
            if !distribution.is_hard() {
                penalty += self.distribution_unsatisfied_weight(store, distribution);
            }
        }
        penalty
    }

    /// Weighted cost of one placement against the current assignment
    /// state, the value used to order candidate placements during search.
    pub fn placement_value<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &ExamContext,
        placement: &ExamPlacement,
    ) -> f64 {
        let w = self.weights();
        w.direct_conflict * f64::from(self.direct_conflicts(cx, placement))
            + w.back_to_back_conflict * f64::from(self.back_to_back_conflicts(cx, placement))
            + w.distance_back_to_back_conflict
                * f64::from(self.distance_back_to_back_conflicts(store, cx, placement))
            + w.more_than_two_a_day * f64::from(self.more_than_two_a_day_conflicts(cx, placement))
            + w.instructor_direct_conflict
                * f64::from(self.instructor_direct_conflicts(cx, placement))
            + w.instructor_back_to_back_conflict
                * f64::from(self.instructor_back_to_back_conflicts(cx, placement))
            + w.instructor_distance_back_to_back_conflict
                * f64::from(self.instructor_distance_back_to_back_conflicts(store, cx, placement))
            + w.instructor_more_than_two_a_day
                * f64::from(self.instructor_more_than_two_a_day_conflicts(cx, placement))
            + w.period * self.period_penalty(placement)
            + w.room_size * f64::from(self.room_size_penalty(placement))
            + w.room_split * f64::from(placement.room_split_penalty())
            + w.room_split_distance * placement.room_split_distance()
            + w.room * placement.room_penalty()
            + w.distribution * self.distribution_penalty(store, placement)
            + w.rotation * self.rotation_penalty(placement) as f64
            + w.perturbation * self.perturbation_penalty(placement) as f64
            + w.large * f64::from(self.large_penalty(placement))
    }

    fn counters_apply<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &mut ExamContext,
        placement: &ExamPlacement,
        sign: i64,
    ) {
        let direct = i64::from(self.direct_conflicts(cx, placement));
        let b2b = i64::from(self.back_to_back_conflicts(cx, placement));
        let dist_b2b = i64::from(self.distance_back_to_back_conflicts(store, cx, placement));
        let m2d = i64::from(self.more_than_two_a_day_conflicts(cx, placement));
        let idirect = i64::from(self.instructor_direct_conflicts(cx, placement));
        let ib2b = i64::from(self.instructor_back_to_back_conflicts(cx, placement));
        let idist_b2b =
            i64::from(self.instructor_distance_back_to_back_conflicts(store, cx, placement));
        let im2d = i64::from(self.instructor_more_than_two_a_day_conflicts(cx, placement));
        let c = &mut cx.counters;
        c.direct += sign * direct;
        c.back_to_back += sign * b2b;
        c.distance_back_to_back += sign * dist_b2b;
        c.more_than_two_a_day += sign * m2d;
        c.instructor_direct += sign * idirect;
        c.instructor_back_to_back += sign * ib2b;
        c.instructor_distance_back_to_back += sign * idist_b2b;
        c.instructor_more_than_two_a_day += sign * im2d;
        c.period += sign as f64 * self.period_penalty(placement);
        c.room_size += sign * i64::from(self.room_size_penalty(placement));
        c.room_split += sign * i64::from(placement.room_split_penalty());
        c.room_split_distance += sign as f64 * placement.room_split_distance();
        c.room += sign as f64 * placement.room_penalty();
        c.rotation += sign * self.rotation_penalty(placement) as i64;
        c.perturbation += sign * self.perturbation_penalty(placement) as i64;
        c.large += sign * i64::from(self.large_penalty(placement));
    }

    /// Re-evaluates the soft distribution constraints of an exam and adds
    /// their violated weight to the counters with the given sign.
    fn distribution_counters_apply<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &mut ExamContext,
        exam: VariableId,
        sign: f64,
    ) {
        for &d in self.exam(exam).distributions() {
            let distribution = &self.distributions[d.index()];
            if !distribution.is_hard() {
                cx.counters.distribution +=
                    sign * self.distribution_unsatisfied_weight(store, distribution);
            }
        }
    }

    /// Weighted objective from the running counters.
    pub fn total_value<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
    ) -> f64 {
        assignment.context().counters().weighted_total(self.weights())
    }

    /// Assigns a forced placement, escalating through the direct-conflict
    /// escape valve if needed.
    ///
    /// If the placement conflicts only through students or instructors, the
    /// involved people and exams get `allow_direct_conflicts` set and the
    /// assignment is retried once; the conflicts then count as penalties
    /// instead of being hard. Room and hard distribution conflicts cannot
    /// be waived; the exam is left unassigned and the failure logged.
    pub fn assign_forced<S: AssignmentStore<ExamPlacement>>(
        &mut self,
        assignment: &mut Assignment<Self, S>,
        iteration: u64,
        placement: ExamPlacement,
    ) -> bool {
        let conflicts = assignment.compute_conflicts(self, &placement);
        if conflicts.is_empty() {
            assignment.assign(self, iteration, placement);
            return true;
        }
        debug!(
            exam = self.exam(placement.exam()).name(),
            conflicts = conflicts.len(),
            "forced placement conflicts, escalating"
        );
        let exam = placement.exam();
        let conflicting: Vec<VariableId> = conflicts.iter().map(|c| c.exam()).collect();
        self.exams[exam.index()].set_allow_direct_conflicts(true);
        for &other in &conflicting {
            self.exams[other.index()].set_allow_direct_conflicts(true);
        }
        for s in 0..self.students.len() {
            let student = &self.students[s];
            if student.exams().contains(&exam)
                && conflicting.iter().any(|x| student.exams().contains(x))
            {
                self.students[s].set_allow_direct_conflicts(true);
            }
        }
        for i in 0..self.instructors.len() {
            let instructor = &self.instructors[i];
            if instructor.exams().contains(&exam)
                && conflicting.iter().any(|x| instructor.exams().contains(x))
            {
                self.instructors[i].set_allow_direct_conflicts(true);
            }
        }
        let remaining = assignment.compute_conflicts(self, &placement);
        if remaining.is_empty() {
            assignment.assign(self, iteration, placement);
            true
        } else {
            warn!(
                exam = self.exam(exam).name(),
                conflicts = remaining.len(),
                "forced placement still conflicting, leaving unassigned"
            );
            false
        }
    }
}

impl Model for ExamTimetable {
    type Value = ExamPlacement;
    type Context = ExamContext;

    fn variable_count(&self) -> usize {
        self.exams.len()
    }

    fn new_context(&self) -> ExamContext {
        ExamContext::new(
            self.periods.len(),
            self.day_count,
            self.rooms.len(),
            self.students.len(),
            self.instructors.len(),
        )
    }

    fn constraints_of(&self, variable: VariableId) -> &[ConstraintId] {
        &self.constraints_of[variable.index()]
    }

    fn constraint_assigned<S: AssignmentStore<ExamPlacement>>(
        &self,
        _store: &S,
        cx: &mut ExamContext,
        constraint: ConstraintId,
        _iteration: u64,
        value: &ExamPlacement,
    ) {
        let exam = value.exam();
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::Room(room) => {
                if value.uses_room(room) {
                    cx.set_room_occupant(room, value.period(), Some(exam));
                }
            }
            ConstraintKind::Student(student) => {
                let period_slot = student.index() * cx.periods + value.period().index();
                let day = self.periods[value.period().index()].day_index();
                let day_slot = student.index() * cx.days + day;
                table_insert(&mut cx.student_periods, period_slot, exam);
                table_insert(&mut cx.student_days, day_slot, exam);
            }
            ConstraintKind::Instructor(instructor) => {
                let period_slot = instructor.index() * cx.periods + value.period().index();
                let day = self.periods[value.period().index()].day_index();
                let day_slot = instructor.index() * cx.days + day;
                table_insert(&mut cx.instructor_periods, period_slot, exam);
                table_insert(&mut cx.instructor_days, day_slot, exam);
            }
            ConstraintKind::Distribution(_) => {}
        }
    }

    fn constraint_unassigned<S: AssignmentStore<ExamPlacement>>(
        &self,
        _store: &S,
        cx: &mut ExamContext,
        constraint: ConstraintId,
        _iteration: u64,
        value: &ExamPlacement,
    ) {
        let exam = value.exam();
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::Room(room) => {
                if value.uses_room(room) && cx.room_occupant(room, value.period()) == Some(exam) {
                    cx.set_room_occupant(room, value.period(), None);
                }
            }
            ConstraintKind::Student(student) => {
                let period_slot = student.index() * cx.periods + value.period().index();
                let day = self.periods[value.period().index()].day_index();
                let day_slot = student.index() * cx.days + day;
                table_remove(&mut cx.student_periods, period_slot, exam);
                table_remove(&mut cx.student_days, day_slot, exam);
            }
            ConstraintKind::Instructor(instructor) => {
                let period_slot = instructor.index() * cx.periods + value.period().index();
                let day = self.periods[value.period().index()].day_index();
                let day_slot = instructor.index() * cx.days + day;
                table_remove(&mut cx.instructor_periods, period_slot, exam);
                table_remove(&mut cx.instructor_days, day_slot, exam);
            }
            ConstraintKind::Distribution(_) => {}
        }
    }

    fn constraint_conflicts<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &ExamContext,
        constraint: ConstraintId,
        value: &ExamPlacement,
        conflicts: &mut ConflictSet<ExamPlacement>,
    ) {
        let exam = value.exam();
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::Room(room) => {
                if !value.uses_room(room) {
                    return;
                }
                if let Some(occupant) = cx.room_occupant(room, value.period()) {
                    if occupant != exam {
                        if let Some(placement) = store.get(occupant) {
                            conflicts.add(placement.clone());
                        }
                    }
                }
            }
            ConstraintKind::Student(student) => {
                for &other in cx.student_exams_at(student, value.period()) {
                    if other != exam && !self.can_student_conflict(student, exam, other) {
                        if let Some(placement) = store.get(other) {
                            conflicts.add(placement.clone());
                        }
                    }
                }
            }
            ConstraintKind::Instructor(instructor) => {
                for &other in cx.instructor_exams_at(instructor, value.period()) {
                    if other != exam && !self.can_instructor_conflict(instructor, exam, other) {
                        if let Some(placement) = store.get(other) {
                            conflicts.add(placement.clone());
                        }
                    }
                }
            }
            ConstraintKind::Distribution(d) => {
                let distribution = &self.distributions[d.index()];
                if !distribution.is_hard() {
                    return;
                }
                let position = match distribution.position_of(exam) {
                    Some(position) => position,
                    None => return,
                };
                for (other_position, &other) in distribution.exams().iter().enumerate() {
                    if other == exam {
                        continue;
                    }
                    if let Some(other_placement) = store.get(other) {
                        let ok = if position < other_position {
                            distribution.check_pair(&self.periods, value, other_placement)
                        } else {
                            distribution.check_pair(&self.periods, other_placement, value)
                        };
                        if !ok {
                            conflicts.add(other_placement.clone());
                        }
                    }
                }
            }
        }
    }

    fn constraint_consistent(
        &self,
        constraint: ConstraintId,
        first: &ExamPlacement,
        second: &ExamPlacement,
    ) -> bool {
        if first.exam() == second.exam() {
            return true;
        }
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::Room(room) => {
                !(first.period() == second.period()
                    && first.uses_room(room)
                    && second.uses_room(room))
            }
            ConstraintKind::Student(student) => {
                first.period() != second.period()
                    || self.can_student_conflict(student, first.exam(), second.exam())
            }
            ConstraintKind::Instructor(instructor) => {
                first.period() != second.period()
                    || self.can_instructor_conflict(instructor, first.exam(), second.exam())
            }
            ConstraintKind::Distribution(d) => {
                let distribution = &self.distributions[d.index()];
                if !distribution.is_hard() {
                    return true;
                }
                match (
                    distribution.position_of(first.exam()),
                    distribution.position_of(second.exam()),
                ) {
                    (Some(p1), Some(p2)) if p1 < p2 => {
                        distribution.check_pair(&self.periods, first, second)
                    }
                    (Some(_), Some(_)) => distribution.check_pair(&self.periods, second, first),
                    _ => true,
                }
            }
        }
    }

    fn constraint_is_hard(&self, constraint: ConstraintId) -> bool {
        match self.constraint_kinds[constraint.index()] {
            ConstraintKind::Distribution(d) => self.distributions[d.index()].is_hard(),
            _ => true,
        }
    }

    fn before_assigned<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &mut ExamContext,
        _iteration: u64,
        value: &ExamPlacement,
    ) {
        self.distribution_counters_apply(store, cx, value.exam(), -1.0);
    }

    fn after_assigned<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &mut ExamContext,
        _iteration: u64,
        value: &ExamPlacement,
    ) {
        self.counters_apply(store, cx, value, 1);
        self.distribution_counters_apply(store, cx, value.exam(), 1.0);
    }

    fn before_unassigned<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &mut ExamContext,
        _iteration: u64,
        value: &ExamPlacement,
    ) {
        self.counters_apply(store, cx, value, -1);
        self.distribution_counters_apply(store, cx, value.exam(), -1.0);
    }

    fn after_unassigned<S: AssignmentStore<ExamPlacement>>(
        &self,
        store: &S,
        cx: &mut ExamContext,
        _iteration: u64,
        value: &ExamPlacement,
    ) {
        self.distribution_counters_apply(store, cx, value.exam(), 1.0);
    }
}

/// Precise (from scratch) objective recomputation, for verification against
/// the incremental counters.
impl ExamTimetable {
    /// Recomputes every counter from the store alone.
    pub fn precise_counters<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
    ) -> PenaltyCounters {
        let store = assignment.store();
        let mut c = PenaltyCounters::default();

        let exams_at = |exams: &[VariableId], period: PeriodId| -> Vec<&ExamPlacement> {
            exams
                .iter()
                .filter_map(|&x| store.get(x))
                .filter(|p| p.period() == period)
                .collect()
        };

        for student in &self.students {
            for period in &self.periods {
                let here = exams_at(student.exams(), period.id());
                let nr = here.len() as i64;
                if !student.is_available(period.id()) {
                    c.direct += nr;
                } else if nr > 1 {
                    c.direct += nr - 1;
                }
                if nr == 0 {
                    continue;
                }
                if let Some(next) = period.next() {
                    let next_period = &self.periods[next.index()];
                    if self.config.day_break_back_to_back || next_period.day() == period.day() {
                        let there = exams_at(student.exams(), next);
                        c.back_to_back += nr * there.len() as i64;
                        if let Some(limit) = self.config.back_to_back_distance {
                            if next_period.day() == period.day() {
                                for a in &here {
                                    for b in &there {
                                        if self.placement_distance(a, b) > limit {
                                            c.distance_back_to_back += 1;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            for day in 0..self.day_count {
                let nr = student
                    .exams()
                    .iter()
                    .filter_map(|&x| store.get(x))
                    .filter(|p| self.periods[p.period().index()].day_index() == day)
                    .count() as i64;
                if nr > 2 {
                    c.more_than_two_a_day += nr - 2;
                }
            }
        }

        for instructor in &self.instructors {
            for period in &self.periods {
                let here = exams_at(instructor.exams(), period.id());
                let nr = here.len() as i64;
                if !instructor.is_available(period.id()) {
                    c.instructor_direct += nr;
                } else if nr > 1 {
                    c.instructor_direct += nr - 1;
                }
                if nr == 0 {
                    continue;
                }
                if let Some(next) = period.next() {
                    let next_period = &self.periods[next.index()];
                    if self.config.day_break_back_to_back || next_period.day() == period.day() {
                        let there = exams_at(instructor.exams(), next);
                        c.instructor_back_to_back += nr * there.len() as i64;
                        if let Some(limit) = self.config.back_to_back_distance {
                            if next_period.day() == period.day() {
                                for a in &here {
                                    for b in &there {
                                        if self.placement_distance(a, b) > limit {
                                            c.instructor_distance_back_to_back += 1;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            for day in 0..self.day_count {
                let nr = instructor
                    .exams()
                    .iter()
                    .filter_map(|&x| store.get(x))
                    .filter(|p| self.periods[p.period().index()].day_index() == day)
                    .count() as i64;
                if nr > 2 {
                    c.instructor_more_than_two_a_day += nr - 2;
                }
            }
        }

        for variable in assignment.assigned_variables() {
            if let Some(placement) = store.get(variable) {
                c.period += self.period_penalty(placement);
                c.room_size += i64::from(self.room_size_penalty(placement));
                c.room_split += i64::from(placement.room_split_penalty());
                c.room_split_distance += placement.room_split_distance();
                c.room += placement.room_penalty();
                c.rotation += self.rotation_penalty(placement) as i64;
                c.perturbation += self.perturbation_penalty(placement) as i64;
                c.large += i64::from(self.large_penalty(placement));
            }
        }

        for distribution in &self.distributions {
            if !distribution.is_hard() {
                c.distribution += self.distribution_unsatisfied_weight(store, distribution);
            }
        }

        c
    }

    /// Number of direct student conflicts; `precise` recomputes from
    /// scratch instead of reading the running counter.
    pub fn nr_direct_conflicts<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
        precise: bool,
    ) -> i64 {
        if precise {
            self.precise_counters(assignment).direct
        } else {
            assignment.context().counters().direct
        }
    }

    /// Number of back-to-back student conflicts.
    pub fn nr_back_to_back_conflicts<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
        precise: bool,
    ) -> i64 {
        if precise {
            self.precise_counters(assignment).back_to_back
        } else {
            assignment.context().counters().back_to_back
        }
    }

    /// Number of more-than-two-exams-a-day student conflicts.
    pub fn nr_more_than_two_a_day_conflicts<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
        precise: bool,
    ) -> i64 {
        if precise {
            self.precise_counters(assignment).more_than_two_a_day
        } else {
            assignment.context().counters().more_than_two_a_day
        }
    }

    /// Weighted objective recomputed from scratch.
    pub fn total_value_precise<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
    ) -> f64 {
        self.precise_counters(assignment).weighted_total(self.weights())
    }

    /// Extended statistics for the reporting layer.
    pub fn info<S: AssignmentStore<ExamPlacement>>(
        &self,
        assignment: &Assignment<Self, S>,
    ) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        let assigned = assignment.assigned_count();
        info.insert(
            "assigned variables".into(),
            format!("{assigned}/{}", self.exams.len()),
        );
        info.insert("total value".into(), format!("{:.2}", self.total_value(assignment)));

        let counters = assignment.context().counters();
        info.insert("direct conflicts".into(), counters.direct.to_string());
        info.insert("back-to-back conflicts".into(), counters.back_to_back.to_string());
        info.insert(
            "more than 2 a day conflicts".into(),
            counters.more_than_two_a_day.to_string(),
        );
        info.insert("period penalty".into(), format!("{:.2}", counters.period));
        info.insert("room size penalty".into(), counters.room_size.to_string());
        info.insert("room split penalty".into(), counters.room_split.to_string());
        info.insert("distribution penalty".into(), format!("{:.2}", counters.distribution));

        let mut splits: BTreeMap<usize, usize> = BTreeMap::new();
        for variable in assignment.assigned_variables() {
            if let Some(placement) = assignment.store().get(variable) {
                *splits.entry(placement.rooms().len()).or_default() += 1;
            }
        }
        for (rooms, count) in splits {
            info.insert(format!("exams in {rooms} room(s)"), count.to_string());
        }

        for group in &self.room_groups {
            let space: u32 = group
                .rooms()
                .iter()
                .map(|&r| self.rooms[r.index()].size())
                .sum();
            info.insert(
                format!("room group {}", group.name()),
                format!("{} rooms, {space} seats", group.rooms().len()),
            );
        }
        info
    }
}
