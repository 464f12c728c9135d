//! Bulk model construction.
//!
//! The builder is the load-time surface for the persistence layer: periods
//! first (in strictly increasing day/time order), then rooms, people and
//! exams, enrollments and distribution constraints, then [`build`] wires
//! constraints and precomputes every exam's domain. All structural errors
//! fail fast here; a built model never errors.
//!
//! [`build`]: ExamModelBuilder::build

use std::collections::HashSet;

use periodica_core::{ConstraintId, VariableId};
use tracing::debug;

use crate::config::ExamConfig;
use crate::distribution::{Distribution, DistributionId, DistributionType};
use crate::domain::{generate_domain, make_placement, DomainOptions};
use crate::error::{ModelError, Result};
use crate::exam::{Exam, ExamSpec, PeriodPlacement};
use crate::instructor::{Instructor, InstructorId};
use crate::model::{ConstraintKind, ExamTimetable};
use crate::period::{Period, PeriodId};
use crate::room::{Room, RoomGroup, RoomId, RoomPlacement, RoomSpec};
use crate::student::{Student, StudentId};

/// Builder for [`ExamTimetable`].
pub struct ExamModelBuilder {
    config: ExamConfig,
    domain_options: DomainOptions,
    default_max_rooms: usize,
    periods: Vec<Period>,
    days: Vec<u32>,
    rooms: Vec<Room>,
    room_groups: Vec<RoomGroup>,
    students: Vec<Student>,
    instructors: Vec<Instructor>,
    exams: Vec<Exam>,
    distributions: Vec<Distribution>,
    initial_specs: Vec<Option<(PeriodId, Vec<RoomId>)>>,
    room_ids: HashSet<i64>,
    student_ids: HashSet<i64>,
    instructor_ids: HashSet<i64>,
    exam_ids: HashSet<i64>,
}

impl ExamModelBuilder {
    pub fn new() -> Self {
        Self::with_config(ExamConfig::default())
    }

    pub fn with_config(config: ExamConfig) -> Self {
        ExamModelBuilder {
            config,
            domain_options: DomainOptions::default(),
            default_max_rooms: 4,
            periods: Vec::new(),
            days: Vec::new(),
            rooms: Vec::new(),
            room_groups: Vec::new(),
            students: Vec::new(),
            instructors: Vec::new(),
            exams: Vec::new(),
            distributions: Vec::new(),
            initial_specs: Vec::new(),
            room_ids: HashSet::new(),
            student_ids: HashSet::new(),
            instructor_ids: HashSet::new(),
            exam_ids: HashSet::new(),
        }
    }

    pub fn set_domain_options(&mut self, options: DomainOptions) {
        self.domain_options = options;
    }

    /// Default room cap for exams that do not specify one.
    pub fn set_default_max_rooms(&mut self, max_rooms: usize) {
        self.default_max_rooms = max_rooms;
    }

    fn check_period(&self, period: PeriodId) -> Result<()> {
        if period.index() < self.periods.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownReference {
                kind: "period",
                index: period.index(),
            })
        }
    }

    fn check_room(&self, room: RoomId) -> Result<()> {
        if room.index() < self.rooms.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownReference {
                kind: "room",
                index: room.index(),
            })
        }
    }

    fn check_exam(&self, exam: VariableId) -> Result<()> {
        if exam.index() < self.exams.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownReference {
                kind: "exam",
                index: exam.index(),
            })
        }
    }

    /// Appends a period; periods must arrive in strictly increasing
    /// (day, time) order.
    pub fn add_period(&mut self, day: u32, time: u32, length: u32, penalty: f64) -> Result<PeriodId> {
        if let Some(last) = self.periods.last() {
            if (day, time) <= (last.day(), last.time()) {
                return Err(ModelError::PeriodOrder { day, time });
            }
        }
        if self.days.last() != Some(&day) {
            self.days.push(day);
        }
        let id = PeriodId(self.periods.len());
        let prev = self.periods.last().map(Period::id);
        let period = Period::new(id, day, time, length, penalty, self.days.len() - 1, prev);
        if let Some(prev) = prev {
            self.periods[prev.index()].set_next(id);
        }
        self.periods.push(period);
        Ok(id)
    }

    /// Adds a room. Availability and penalty tables, when given, must cover
    /// every period added so far, so add all periods first.
    pub fn add_room(&mut self, spec: RoomSpec) -> Result<RoomId> {
        if !self.room_ids.insert(spec.external_id) {
            return Err(ModelError::DuplicateId {
                kind: "room",
                id: spec.external_id,
            });
        }
        let periods = self.periods.len();
        let available = match &spec.available {
            Some(table) if table.len() != periods => {
                return Err(ModelError::TableLength {
                    kind: "availability",
                    name: spec.name.clone(),
                    expected: periods,
                    got: table.len(),
                });
            }
            Some(table) => table.clone(),
            None => vec![true; periods],
        };
        let penalty = match &spec.period_penalty {
            Some(table) if table.len() != periods => {
                return Err(ModelError::TableLength {
                    kind: "penalty",
                    name: spec.name.clone(),
                    expected: periods,
                    got: table.len(),
                });
            }
            Some(table) => table.clone(),
            None => vec![0.0; periods],
        };
        let id = RoomId(self.rooms.len());
        self.rooms.push(Room::new(id, spec, available, penalty));
        Ok(id)
    }

    pub fn add_room_group(&mut self, name: impl Into<String>, rooms: Vec<RoomId>) -> Result<()> {
        for &room in &rooms {
            self.check_room(room)?;
        }
        self.room_groups.push(RoomGroup::new(name.into(), rooms));
        Ok(())
    }

    pub fn add_student(&mut self, external_id: i64, unavailable: &[PeriodId]) -> Result<StudentId> {
        if !self.student_ids.insert(external_id) {
            return Err(ModelError::DuplicateId {
                kind: "student",
                id: external_id,
            });
        }
        let mut available = vec![true; self.periods.len()];
        for &period in unavailable {
            self.check_period(period)?;
            available[period.index()] = false;
        }
        let id = StudentId(self.students.len());
        self.students.push(Student::new(id, external_id, available));
        Ok(id)
    }

    pub fn add_instructor(&mut self, external_id: i64, unavailable: &[PeriodId]) -> Result<InstructorId> {
        if !self.instructor_ids.insert(external_id) {
            return Err(ModelError::DuplicateId {
                kind: "instructor",
                id: external_id,
            });
        }
        let mut available = vec![true; self.periods.len()];
        for &period in unavailable {
            self.check_period(period)?;
            available[period.index()] = false;
        }
        let id = InstructorId(self.instructors.len());
        self.instructors
            .push(Instructor::new(id, external_id, available));
        Ok(id)
    }

    pub fn add_exam(&mut self, spec: ExamSpec) -> Result<VariableId> {
        if !self.exam_ids.insert(spec.external_id) {
            return Err(ModelError::DuplicateId {
                kind: "exam",
                id: spec.external_id,
            });
        }
        if let Some(period) = spec.pre_assigned_period {
            self.check_period(period)?;
        }
        for &room in &spec.pre_assigned_rooms {
            self.check_room(room)?;
        }

        let mut room_placements: Vec<RoomPlacement> = if !spec.rooms.is_empty() {
            for placement in &spec.rooms {
                self.check_room(placement.room)?;
            }
            spec.rooms.clone()
        } else if let Some(group_name) = &spec.room_group {
            let group = self
                .room_groups
                .iter()
                .find(|g| g.name() == group_name)
                .ok_or_else(|| ModelError::UnknownRoomGroup(group_name.clone()))?;
            group.rooms().iter().copied().map(RoomPlacement::new).collect()
        } else {
            self.rooms.iter().map(|r| RoomPlacement::new(r.id())).collect()
        };
        room_placements.sort_by(|a, b| {
            let size_a = self.rooms[a.room.index()].usable_size(spec.alt_seating);
            let size_b = self.rooms[b.room.index()].usable_size(spec.alt_seating);
            size_b.cmp(&size_a).then(a.room.cmp(&b.room))
        });

        for &(period, _) in &spec.period_penalties {
            self.check_period(period)?;
        }
        let candidate_periods: Vec<PeriodId> = if spec.allowed_periods.is_empty() {
            self.periods.iter().map(Period::id).collect()
        } else {
            for &period in &spec.allowed_periods {
                self.check_period(period)?;
            }
            spec.allowed_periods.clone()
        };
        let period_placements: Vec<PeriodPlacement> = candidate_periods
            .into_iter()
            .filter(|&p| self.periods[p.index()].length() >= spec.length)
            .map(|p| {
                let over = spec
                    .period_penalties
                    .iter()
                    .find(|(period, _)| *period == p)
                    .map_or(0.0, |(_, penalty)| *penalty);
                PeriodPlacement {
                    period: p,
                    penalty: self.periods[p.index()].penalty() + over,
                }
            })
            .collect();

        let variable = VariableId(self.exams.len());
        self.exams.push(Exam::new(
            variable,
            spec.external_id,
            spec.name,
            spec.size,
            spec.min_size,
            spec.length,
            spec.alt_seating,
            spec.max_rooms.unwrap_or(self.default_max_rooms),
            spec.average_period,
            period_placements,
            room_placements,
            spec.pre_assigned_period,
            spec.pre_assigned_rooms,
        ));
        self.initial_specs.push(None);
        Ok(variable)
    }

    pub fn enroll_student(&mut self, student: StudentId, exam: VariableId) -> Result<()> {
        self.check_exam(exam)?;
        let student_data =
            self.students
                .get_mut(student.index())
                .ok_or(ModelError::UnknownReference {
                    kind: "student",
                    index: student.index(),
                })?;
        student_data.enroll(exam);
        self.exams[exam.index()].add_student(student);
        Ok(())
    }

    pub fn enroll_instructor(&mut self, instructor: InstructorId, exam: VariableId) -> Result<()> {
        self.check_exam(exam)?;
        let instructor_data =
            self.instructors
                .get_mut(instructor.index())
                .ok_or(ModelError::UnknownReference {
                    kind: "instructor",
                    index: instructor.index(),
                })?;
        instructor_data.enroll(exam);
        self.exams[exam.index()].add_instructor(instructor);
        Ok(())
    }

    /// Adds a distribution constraint over two or more exams, in list
    /// order (relevant for precedence kinds).
    pub fn add_distribution(
        &mut self,
        kind: DistributionType,
        hard: bool,
        weight: f64,
        exams: Vec<VariableId>,
    ) -> Result<DistributionId> {
        if exams.len() < 2 {
            return Err(ModelError::TooFewMembers(exams.len()));
        }
        for &exam in &exams {
            self.check_exam(exam)?;
        }
        let id = DistributionId(self.distributions.len());
        for &exam in &exams {
            self.exams[exam.index()].add_distribution(id);
        }
        self.distributions
            .push(Distribution::new(id, kind, hard, weight, exams));
        Ok(id)
    }

    /// Adds a distribution constraint named by its type string, failing on
    /// unknown names.
    pub fn add_distribution_named(
        &mut self,
        name: &str,
        hard: bool,
        weight: f64,
        exams: Vec<VariableId>,
    ) -> Result<DistributionId> {
        self.add_distribution(name.parse()?, hard, weight, exams)
    }

    /// Records the initial placement of an exam for minimal-perturbation
    /// runs.
    pub fn set_initial(&mut self, exam: VariableId, period: PeriodId, rooms: Vec<RoomId>) -> Result<()> {
        self.check_exam(exam)?;
        self.check_period(period)?;
        for &room in &rooms {
            self.check_room(room)?;
        }
        self.initial_specs[exam.index()] = Some((period, rooms));
        Ok(())
    }

    /// Wires constraints and precomputes every exam's domain.
    pub fn build(self) -> Result<ExamTimetable> {
        let mut constraint_kinds = Vec::new();
        let room_base = 0;
        for room in &self.rooms {
            constraint_kinds.push(ConstraintKind::Room(room.id()));
        }
        let student_base = constraint_kinds.len();
        for student in &self.students {
            constraint_kinds.push(ConstraintKind::Student(student.id()));
        }
        let instructor_base = constraint_kinds.len();
        for instructor in &self.instructors {
            constraint_kinds.push(ConstraintKind::Instructor(instructor.id()));
        }
        let distribution_base = constraint_kinds.len();
        for distribution in &self.distributions {
            constraint_kinds.push(ConstraintKind::Distribution(distribution.id()));
        }

        let constraints_of: Vec<Vec<ConstraintId>> = self
            .exams
            .iter()
            .map(|exam| {
                let mut ids = Vec::new();
                let mut rooms: Vec<RoomId> =
                    exam.room_placements().iter().map(|p| p.room).collect();
                for &room in exam.pre_assigned_rooms() {
                    if !rooms.contains(&room) {
                        rooms.push(room);
                    }
                }
                for room in rooms {
                    ids.push(ConstraintId(room_base + room.index()));
                }
                for &student in exam.students() {
                    ids.push(ConstraintId(student_base + student.index()));
                }
                for &instructor in exam.instructors() {
                    ids.push(ConstraintId(instructor_base + instructor.index()));
                }
                for &distribution in exam.distributions() {
                    ids.push(ConstraintId(distribution_base + distribution.index()));
                }
                ids
            })
            .collect();

        let domains: Vec<_> = self
            .exams
            .iter()
            .map(|exam| {
                generate_domain(
                    exam,
                    &self.periods,
                    &self.rooms,
                    &self.config.weights,
                    &self.domain_options,
                )
            })
            .collect();

        let initial = self
            .exams
            .iter()
            .zip(&self.initial_specs)
            .map(|(exam, spec)| {
                spec.as_ref().and_then(|(period, rooms)| {
                    make_placement(exam, *period, rooms.iter().copied().collect(), &self.rooms)
                })
            })
            .collect();

        debug!(
            exams = self.exams.len(),
            periods = self.periods.len(),
            rooms = self.rooms.len(),
            students = self.students.len(),
            placements = domains.iter().map(Vec::len).sum::<usize>(),
            "exam model built"
        );

        Ok(ExamTimetable {
            config: self.config,
            periods: self.periods,
            day_count: self.days.len(),
            rooms: self.rooms,
            room_groups: self.room_groups,
            students: self.students,
            instructors: self.instructors,
            distributions: self.distributions,
            exams: self.exams,
            domains,
            constraint_kinds,
            constraints_of,
            initial,
        })
    }
}

impl Default for ExamModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
