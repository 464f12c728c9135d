use periodica_core::{DenseAssignment, VariableId};

use crate::builder::ExamModelBuilder;
use crate::distribution::DistributionType;
use crate::exam::ExamSpec;
use crate::model::ExamTimetable;
use crate::period::PeriodId;
use crate::room::{RoomId, RoomSpec};

fn no_rooms(mut spec: ExamSpec) -> ExamSpec {
    spec.max_rooms = Some(0);
    spec
}

/// Two exams with 50 students each, 10 of them shared, no room needs.
fn shared_student_model() -> (ExamTimetable, VariableId, VariableId) {
    let mut builder = ExamModelBuilder::new();
    for time in 0..3 {
        builder.add_period(1, time, 120, 0.0).unwrap();
    }
    let a = builder.add_exam(no_rooms(ExamSpec::new(1, "A", 50, 60))).unwrap();
    let b = builder.add_exam(no_rooms(ExamSpec::new(2, "B", 50, 60))).unwrap();
    for i in 0..90 {
        let student = builder.add_student(i, &[]).unwrap();
        if i < 50 {
            builder.enroll_student(student, a).unwrap();
        }
        if i >= 40 {
            builder.enroll_student(student, b).unwrap();
        }
    }
    (builder.build().unwrap(), a, b)
}

#[test]
fn shared_students_in_one_period_are_direct_conflicts() {
    let (model, a, b) = shared_student_model();
    let mut assignment = DenseAssignment::new(&model);

    let pa = model.placement(a, PeriodId(0), Vec::new()).unwrap();
    let pb = model.placement(b, PeriodId(0), Vec::new()).unwrap();
    assignment.assign(&model, 1, pa);
    assignment.assign(&model, 2, pb);

    assert_eq!(model.nr_direct_conflicts(&assignment, false), 10);
    assert_eq!(model.nr_direct_conflicts(&assignment, true), 10);
    assert_eq!(model.total_value(&assignment), 10_000.0);

    // Moving one exam to a non-adjacent period clears the conflicts.
    let pa2 = model.placement(a, PeriodId(2), Vec::new()).unwrap();
    assignment.assign(&model, 3, pa2);
    assert_eq!(model.nr_direct_conflicts(&assignment, false), 0);
    assert_eq!(model.nr_direct_conflicts(&assignment, true), 0);
    assert_eq!(model.total_value(&assignment), 0.0);
}

#[test]
fn adjacent_periods_count_back_to_back_conflicts() {
    let (model, a, b) = shared_student_model();
    let mut assignment = DenseAssignment::new(&model);

    let pa = model.placement(a, PeriodId(0), Vec::new()).unwrap();
    let pb = model.placement(b, PeriodId(1), Vec::new()).unwrap();
    assignment.assign(&model, 1, pa);
    assignment.assign(&model, 2, pb);

    assert_eq!(model.nr_direct_conflicts(&assignment, true), 0);
    assert_eq!(model.nr_back_to_back_conflicts(&assignment, false), 10);
    assert_eq!(model.nr_back_to_back_conflicts(&assignment, true), 10);
    // 10 shared students at weight 10.
    assert_eq!(model.total_value(&assignment), 100.0);
}

#[test]
fn reassigning_the_same_placement_leaves_counters_unchanged() {
    let (model, a, b) = shared_student_model();
    let mut assignment = DenseAssignment::new(&model);
    assignment.assign(&model, 1, model.placement(a, PeriodId(0), Vec::new()).unwrap());
    assignment.assign(&model, 2, model.placement(b, PeriodId(0), Vec::new()).unwrap());

    let before = *assignment.context().counters();
    assignment.assign(&model, 3, model.placement(b, PeriodId(0), Vec::new()).unwrap());
    assert_eq!(*assignment.context().counters(), before);
}

/// A denser model: rooms, a soft distribution, period penalties.
fn room_model() -> (ExamTimetable, Vec<VariableId>) {
    let mut builder = ExamModelBuilder::new();
    for day in 1..=2 {
        for time in 0..2 {
            builder.add_period(day, time, 120, f64::from(time)).unwrap();
        }
    }
    builder.add_room(RoomSpec::new(1, "aula", 100, 50)).unwrap();
    builder.add_room(RoomSpec::new(2, "lab", 40, 20)).unwrap();
    builder.add_room(RoomSpec::new(3, "hall", 120, 60)).unwrap();

    let e1 = builder.add_exam(ExamSpec::new(1, "calculus", 120, 60)).unwrap();
    let e2 = builder.add_exam(ExamSpec::new(2, "physics", 35, 60)).unwrap();
    let e3 = builder.add_exam(ExamSpec::new(3, "history", 90, 60)).unwrap();
    for i in 0..30 {
        let student = builder.add_student(i, &[]).unwrap();
        builder.enroll_student(student, e1).unwrap();
        if i % 2 == 0 {
            builder.enroll_student(student, e2).unwrap();
        }
        if i % 3 == 0 {
            builder.enroll_student(student, e3).unwrap();
        }
    }
    let instructor = builder.add_instructor(100, &[]).unwrap();
    builder.enroll_instructor(instructor, e1).unwrap();
    builder.enroll_instructor(instructor, e2).unwrap();
    builder
        .add_distribution(DistributionType::DifferentPeriod, false, 7.0, vec![e1, e2])
        .unwrap();
    (builder.build().unwrap(), vec![e1, e2, e3])
}

#[test]
fn incremental_counters_match_precise_recomputation() {
    let (model, exams) = room_model();
    let mut assignment = DenseAssignment::new(&model);

    // Walk through a few assignment states, comparing after each step.
    let steps: Vec<(VariableId, usize)> = vec![
        (exams[0], 0),
        (exams[1], 1),
        (exams[2], 0),
        (exams[1], 0),
        (exams[0], 3),
    ];
    for (iteration, &(exam, period)) in steps.iter().enumerate() {
        let placement = model
            .domain(exam)
            .iter()
            .find(|p| p.period() == PeriodId(period))
            .expect("domain covers the period")
            .clone();
        assignment.assign(&model, iteration as u64, placement);

        let incremental = *assignment.context().counters();
        let precise = model.precise_counters(&assignment);
        assert_eq!(incremental.direct, precise.direct);
        assert_eq!(incremental.back_to_back, precise.back_to_back);
        assert_eq!(incremental.more_than_two_a_day, precise.more_than_two_a_day);
        assert_eq!(incremental.instructor_direct, precise.instructor_direct);
        assert_eq!(incremental.room_size, precise.room_size);
        assert_eq!(incremental.room_split, precise.room_split);
        assert!((incremental.period - precise.period).abs() < 1e-9);
        assert!((incremental.distribution - precise.distribution).abs() < 1e-9);
        assert!(
            (model.total_value(&assignment) - model.total_value_precise(&assignment)).abs() < 1e-9
        );
    }

    // Tearing everything down returns the counters to zero.
    for &exam in &exams {
        assignment.unassign(&model, 99, exam);
    }
    assert_eq!(*assignment.context().counters(), Default::default());
}

#[test]
fn room_occupancy_is_exclusive() {
    let (model, exams) = room_model();
    let mut assignment = DenseAssignment::new(&model);

    let hall = RoomId(2);
    let p1 = model.placement(exams[0], PeriodId(0), vec![hall]).unwrap();
    let p3 = model.placement(exams[2], PeriodId(0), vec![hall]).unwrap();
    assignment.assign(&model, 1, p1.clone());

    let conflicts = assignment.compute_conflicts(&model, &p3);
    assert!(conflicts.contains(&p1));

    // Resolving the conflict and assigning keeps the invariant.
    assignment.unassign(&model, 2, exams[0]);
    assignment.assign(&model, 3, p3);
    assert_eq!(
        assignment.context().room_occupant(hall, PeriodId(0)),
        Some(exams[2])
    );
    for period in model.periods() {
        for room in model.rooms() {
            let occupant = assignment.context().room_occupant(room.id(), period.id());
            if let Some(exam) = occupant {
                let placement = assignment.value(exam).expect("occupant is assigned");
                assert!(placement.uses_room(room.id()));
                assert_eq!(placement.period(), period.id());
            }
        }
    }
}

#[test]
fn soft_distribution_counts_toward_the_objective_only() {
    let (model, exams) = room_model();
    let mut assignment = DenseAssignment::new(&model);

    let p1 = model.placement(exams[0], PeriodId(0), vec![RoomId(2)]).unwrap();
    let p2 = model.placement(exams[1], PeriodId(0), vec![RoomId(1)]).unwrap();
    assignment.assign(&model, 1, p1);

    // Same period violates the soft different-period rule but is feasible
    // aside from the shared students.
    let conflicts = assignment.compute_conflicts(&model, &p2);
    assert!(!conflicts.is_empty()); // student conflicts, not the distribution
    assignment.assign(&model, 2, p2);
    assert!((assignment.context().counters().distribution - 7.0).abs() < 1e-9);

    let moved = model.placement(exams[1], PeriodId(1), vec![RoomId(1)]).unwrap();
    assignment.assign(&model, 3, moved);
    assert_eq!(assignment.context().counters().distribution, 0.0);
}

#[test]
fn hard_precedence_orders_placements() {
    let mut builder = ExamModelBuilder::new();
    for time in 0..2 {
        builder.add_period(1, time, 120, 0.0).unwrap();
    }
    let first = builder.add_exam(no_rooms(ExamSpec::new(1, "first", 10, 60))).unwrap();
    let second = builder.add_exam(no_rooms(ExamSpec::new(2, "second", 10, 60))).unwrap();
    builder
        .add_distribution(DistributionType::Precedence, true, 0.0, vec![first, second])
        .unwrap();
    let model = builder.build().unwrap();
    let mut assignment = DenseAssignment::new(&model);

    let early = model.placement(second, PeriodId(0), Vec::new()).unwrap();
    assignment.assign(&model, 1, early.clone());

    // first after second violates precedence.
    let late_first = model.placement(first, PeriodId(1), Vec::new()).unwrap();
    assert!(assignment.compute_conflicts(&model, &late_first).contains(&early));

    // second after first is fine.
    let early_first = model.placement(first, PeriodId(0), Vec::new()).unwrap();
    let late_second = model.placement(second, PeriodId(1), Vec::new()).unwrap();
    assignment.unassign(&model, 2, second);
    assignment.assign(&model, 3, early_first);
    assert!(assignment.compute_conflicts(&model, &late_second).is_empty());
}

#[test]
fn forced_placement_escalates_student_conflicts() {
    let (model, a, b) = shared_student_model();
    let mut model = model;
    let mut assignment = DenseAssignment::new(&model);

    let pa = model.placement(a, PeriodId(0), Vec::new()).unwrap();
    let pb = model.placement(b, PeriodId(0), Vec::new()).unwrap();
    assignment.assign(&model, 1, pa);

    // The shared students make this a hard conflict at first; escalation
    // flips their escape valve and the placement lands, penalized.
    assert!(!assignment.compute_conflicts(&model, &pb).is_empty());
    assert!(model.assign_forced(&mut assignment, 2, pb));
    assert_eq!(assignment.assigned_count(), 2);
    assert_eq!(model.nr_direct_conflicts(&assignment, true), 10);
}

#[test]
fn forced_placement_cannot_waive_room_conflicts() {
    let mut builder = ExamModelBuilder::new();
    builder.add_period(1, 0, 120, 0.0).unwrap();
    builder.add_room(RoomSpec::new(1, "only", 50, 25)).unwrap();
    let a = builder.add_exam(ExamSpec::new(1, "A", 40, 60)).unwrap();
    let b = builder.add_exam(ExamSpec::new(2, "B", 40, 60)).unwrap();
    let mut model = builder.build().unwrap();
    let mut assignment = DenseAssignment::new(&model);

    let room = vec![RoomId(0)];
    let pa = model.placement(a, PeriodId(0), room.clone()).unwrap();
    let pb = model.placement(b, PeriodId(0), room).unwrap();
    assignment.assign(&model, 1, pa);
    assert!(!model.assign_forced(&mut assignment, 2, pb));
    assert!(assignment.value(b).is_none());
}

#[test]
fn domains_respect_pre_assignment_and_length() {
    let mut builder = ExamModelBuilder::new();
    builder.add_period(1, 0, 60, 0.0).unwrap();
    builder.add_period(1, 1, 180, 0.0).unwrap();
    builder.add_room(RoomSpec::new(1, "short on space", 20, 10)).unwrap();
    builder.add_room(RoomSpec::new(2, "big", 80, 40)).unwrap();

    // Too long for the first period.
    let long = builder.add_exam(ExamSpec::new(1, "long", 50, 120)).unwrap();
    let mut fixed_spec = ExamSpec::new(2, "fixed", 50, 60);
    fixed_spec.pre_assigned_period = Some(PeriodId(0));
    fixed_spec.pre_assigned_rooms = vec![RoomId(0)];
    let fixed = builder.add_exam(fixed_spec).unwrap();
    let model = builder.build().unwrap();

    assert!(!model.domain(long).is_empty());
    assert!(model.domain(long).iter().all(|p| p.period() == PeriodId(1)));

    // The forced room set is kept even though it is undersized.
    assert_eq!(model.domain(fixed).len(), 1);
    let forced = &model.domain(fixed)[0];
    assert_eq!(forced.period(), PeriodId(0));
    assert_eq!(forced.rooms(), &[RoomId(0)]);
    assert!(forced.size() < 50);
}

#[test]
fn overlay_search_does_not_disturb_the_parent_counters() {
    let (model, a, b) = shared_student_model();
    let mut parent = DenseAssignment::new(&model);
    parent.assign(&model, 1, model.placement(a, PeriodId(0), Vec::new()).unwrap());
    parent.assign(&model, 2, model.placement(b, PeriodId(2), Vec::new()).unwrap());
    assert_eq!(parent.context().counters().direct, 0);

    let mut overlay = parent.overlay();
    overlay.assign(&model, 3, model.placement(b, PeriodId(0), Vec::new()).unwrap());
    assert_eq!(overlay.context().counters().direct, 10);
    assert_eq!(parent.context().counters().direct, 0);
    assert_eq!(
        parent.value(b).map(|p| p.period()),
        Some(PeriodId(2))
    );
}

#[test]
fn builder_rejects_malformed_input() {
    let mut builder = ExamModelBuilder::new();
    builder.add_period(2, 0, 120, 0.0).unwrap();
    assert!(builder.add_period(1, 0, 120, 0.0).is_err());
    assert!(builder.add_period(2, 0, 120, 0.0).is_err());

    builder.add_room(RoomSpec::new(7, "a room", 10, 5)).unwrap();
    assert!(builder.add_room(RoomSpec::new(7, "same id", 20, 10)).is_err());

    let exam = builder.add_exam(ExamSpec::new(1, "one", 5, 60)).unwrap();
    let other = builder.add_exam(ExamSpec::new(2, "two", 5, 60)).unwrap();
    assert!(builder.add_exam(ExamSpec::new(1, "dup", 5, 60)).is_err());
    assert!(builder
        .add_distribution_named("no-such-rule", true, 0.0, vec![exam, other])
        .is_err());
    assert!(builder
        .add_distribution(DistributionType::SameDay, true, 0.0, vec![exam])
        .is_err());
}
