//! Exam variables.

use periodica_core::VariableId;

use crate::distribution::DistributionId;
use crate::instructor::InstructorId;
use crate::period::PeriodId;
use crate::room::{RoomId, RoomPlacement};
use crate::student::StudentId;

/// A candidate period for an exam, with the effective penalty (period base
/// penalty plus any exam-specific override).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodPlacement {
    pub period: PeriodId,
    pub penalty: f64,
}

/// Exam attributes supplied to the builder.
///
/// Empty `rooms` means every room of the model is a candidate (with zero
/// exam-specific penalty); empty `allowed_periods` means every period long
/// enough for the exam. A pre-assigned period/room set bypasses domain
/// enumeration entirely.
#[derive(Debug, Clone)]
pub struct ExamSpec {
    pub external_id: i64,
    pub name: String,
    /// Number of students to seat.
    pub size: u32,
    /// Lower bound on room size regardless of enrollment.
    pub min_size: u32,
    /// Length in minutes.
    pub length: u32,
    /// Use alternative (spaced) seating capacities.
    pub alt_seating: bool,
    /// Cap on the number of rooms; `None` uses the model default, zero
    /// means the exam needs no room at all.
    pub max_rooms: Option<usize>,
    /// Average period of past assignments, for the rotation penalty.
    pub average_period: Option<usize>,
    /// Candidate rooms with exam-specific penalties.
    pub rooms: Vec<RoomPlacement>,
    /// Restrict candidate rooms to a named room group.
    pub room_group: Option<String>,
    /// Restrict candidate periods.
    pub allowed_periods: Vec<PeriodId>,
    /// Per-period penalty overrides added on top of the period penalty.
    pub period_penalties: Vec<(PeriodId, f64)>,
    /// Forced period; the domain is exactly this placement.
    pub pre_assigned_period: Option<PeriodId>,
    /// Forced rooms; only meaningful together with a forced period. The
    /// size check is intentionally skipped for forced rooms.
    pub pre_assigned_rooms: Vec<RoomId>,
}

impl ExamSpec {
    pub fn new(external_id: i64, name: impl Into<String>, size: u32, length: u32) -> Self {
        ExamSpec {
            external_id,
            name: name.into(),
            size,
            min_size: 0,
            length,
            alt_seating: false,
            max_rooms: None,
            average_period: None,
            rooms: Vec::new(),
            room_group: None,
            allowed_periods: Vec::new(),
            period_penalties: Vec::new(),
            pre_assigned_period: None,
            pre_assigned_rooms: Vec::new(),
        }
    }
}

/// An exam: the unit being scheduled.
///
/// Holds only immutable structure; the current placement lives in the
/// assignment, and the candidate placements are precomputed into the
/// model's domain arrays at build time.
#[derive(Debug, Clone)]
pub struct Exam {
    variable: VariableId,
    external_id: i64,
    name: String,
    size: u32,
    min_size: u32,
    length: u32,
    alt_seating: bool,
    max_rooms: usize,
    average_period: Option<usize>,
    allow_direct_conflicts: bool,
    period_placements: Vec<PeriodPlacement>,
    /// Candidate rooms sorted descending by usable size.
    room_placements: Vec<RoomPlacement>,
    pre_assigned_period: Option<PeriodId>,
    pre_assigned_rooms: Vec<RoomId>,
    students: Vec<StudentId>,
    instructors: Vec<InstructorId>,
    distributions: Vec<DistributionId>,
}

impl Exam {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        variable: VariableId,
        external_id: i64,
        name: String,
        size: u32,
        min_size: u32,
        length: u32,
        alt_seating: bool,
        max_rooms: usize,
        average_period: Option<usize>,
        period_placements: Vec<PeriodPlacement>,
        room_placements: Vec<RoomPlacement>,
        pre_assigned_period: Option<PeriodId>,
        pre_assigned_rooms: Vec<RoomId>,
    ) -> Self {
        Exam {
            variable,
            external_id,
            name,
            size,
            min_size,
            length,
            alt_seating,
            max_rooms,
            average_period,
            allow_direct_conflicts: false,
            period_placements,
            room_placements,
            pre_assigned_period,
            pre_assigned_rooms,
            students: Vec::new(),
            instructors: Vec::new(),
            distributions: Vec::new(),
        }
    }

    pub(crate) fn add_student(&mut self, student: StudentId) {
        if !self.students.contains(&student) {
            self.students.push(student);
        }
    }

    pub(crate) fn add_instructor(&mut self, instructor: InstructorId) {
        if !self.instructors.contains(&instructor) {
            self.instructors.push(instructor);
        }
    }

    pub(crate) fn add_distribution(&mut self, distribution: DistributionId) {
        self.distributions.push(distribution);
    }

    pub(crate) fn set_allow_direct_conflicts(&mut self, allow: bool) {
        self.allow_direct_conflicts = allow;
    }

    #[inline]
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of students to seat.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Required seating, never below `min_size`.
    #[inline]
    pub fn required_size(&self) -> u32 {
        self.size.max(self.min_size)
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[inline]
    pub fn alt_seating(&self) -> bool {
        self.alt_seating
    }

    /// Cap on the number of rooms; zero means no room is needed.
    #[inline]
    pub fn max_rooms(&self) -> usize {
        self.max_rooms
    }

    #[inline]
    pub fn average_period(&self) -> Option<usize> {
        self.average_period
    }

    #[inline]
    pub fn allow_direct_conflicts(&self) -> bool {
        self.allow_direct_conflicts
    }

    /// Candidate periods with effective penalties.
    #[inline]
    pub fn period_placements(&self) -> &[PeriodPlacement] {
        &self.period_placements
    }

    /// Effective penalty for placing this exam in the given period, if the
    /// period is a candidate.
    pub fn period_penalty(&self, period: PeriodId) -> Option<f64> {
        self.period_placements
            .iter()
            .find(|p| p.period == period)
            .map(|p| p.penalty)
    }

    /// Candidate rooms, sorted descending by usable size.
    #[inline]
    pub fn room_placements(&self) -> &[RoomPlacement] {
        &self.room_placements
    }

    /// Exam-specific penalty of a candidate room, if the room is one.
    pub fn room_placement_penalty(&self, room: RoomId) -> Option<f64> {
        self.room_placements
            .iter()
            .find(|p| p.room == room)
            .map(|p| p.penalty)
    }

    #[inline]
    pub fn pre_assigned_period(&self) -> Option<PeriodId> {
        self.pre_assigned_period
    }

    #[inline]
    pub fn pre_assigned_rooms(&self) -> &[RoomId] {
        &self.pre_assigned_rooms
    }

    #[inline]
    pub fn students(&self) -> &[StudentId] {
        &self.students
    }

    #[inline]
    pub fn instructors(&self) -> &[InstructorId] {
        &self.instructors
    }

    #[inline]
    pub fn distributions(&self) -> &[DistributionId] {
        &self.distributions
    }
}
