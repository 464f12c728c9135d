use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use periodica_core::DenseAssignment;

use crate::builder::SctModelBuilder;
use crate::config::SelectionConfig;
use crate::course::SectionSpec;
use crate::criterion::{OnlineCriterion, SelectionCriterion};
use crate::request::CourseRequestSpec;
use crate::selection::{BranchBoundSelection, SelectionRequirements};
use crate::time::TimeLocation;

const MWF: u8 = 0b0001_0101;
const TTH: u8 = 0b0000_1010;

fn t(days: u8, start: u32, length: u32) -> TimeLocation {
    TimeLocation::new(days, start, length)
}

fn section(id: i64, name: &str, limit: i32, time: TimeLocation) -> SectionSpec {
    SectionSpec::new(id, name, limit).with_time(time)
}

#[test]
fn assigns_both_courses_around_a_clash() {
    let mut b = SctModelBuilder::new();
    let math = b.add_course(1, "MATH 101", 3.0).unwrap();
    let mc = b.add_config(math).unwrap();
    let mlec = b.add_subpart(mc, "Lec").unwrap();
    b.add_section(mlec, section(11, "M1", 30, t(MWF, 10, 12))).unwrap();
    let m2 = b.add_section(mlec, section(12, "M2", 30, t(MWF, 30, 12))).unwrap();
    let phys = b.add_course(2, "PHYS 101", 3.0).unwrap();
    let pc = b.add_config(phys).unwrap();
    let plec = b.add_subpart(pc, "Lec").unwrap();
    let p1 = b.add_section(plec, section(21, "P1", 30, t(MWF, 10, 12))).unwrap();
    let alice = b.add_student(10, 18.0).unwrap();
    b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    b.add_course_request(alice, CourseRequestSpec::new(vec![phys])).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);

    // The only physics section clashes with M1, so math moves to M2.
    assert_eq!(result.assigned_count(), 2);
    assert!(result.schedule[0].as_ref().unwrap().uses_section(m2));
    assert!(result.schedule[1].as_ref().unwrap().uses_section(p1));
    assert!(!result.timeout_reached);
    assert!(result.elapsed < Duration::from_secs(5));
}

#[test]
fn avoids_sections_that_are_already_full() {
    let mut b = SctModelBuilder::new();
    let math = b.add_course(1, "MATH 101", 3.0).unwrap();
    let mc = b.add_config(math).unwrap();
    let mlec = b.add_subpart(mc, "Lec").unwrap();
    let m1 = b.add_section(mlec, section(11, "M1", 1, t(MWF, 10, 12))).unwrap();
    let m2 = b.add_section(mlec, section(12, "M2", 30, t(MWF, 30, 12))).unwrap();
    let alice = b.add_student(10, 18.0).unwrap();
    let bob = b.add_student(11, 18.0).unwrap();
    let ra = b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    let rb = b.add_course_request(bob, CourseRequestSpec::new(vec![math])).unwrap();
    let model = b.build().unwrap();

    let mut assignment = DenseAssignment::new(&model);
    let bob_m1 = model
        .domain(rb)
        .iter()
        .find(|e| e.uses_section(m1))
        .unwrap()
        .clone();
    assignment.assign(&model, 0, bob_m1);

    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);

    let e = result.schedule[0].as_ref().unwrap();
    assert!(e.uses_section(m2));
    assert_eq!(e.request(), ra);
}

#[test]
fn alternatives_fill_only_freed_slots() {
    let mut b = SctModelBuilder::new();
    // ART's only section has no seats, BIO is wide open.
    let art = b.add_course(1, "ART 101", 3.0).unwrap();
    let ac = b.add_config(art).unwrap();
    let alec = b.add_subpart(ac, "Lec").unwrap();
    b.add_section(alec, section(11, "A1", 0, t(MWF, 10, 12))).unwrap();
    let bio = b.add_course(2, "BIO 101", 3.0).unwrap();
    let bc = b.add_config(bio).unwrap();
    let blec = b.add_subpart(bc, "Lec").unwrap();
    b.add_section(blec, section(21, "B1", 30, t(MWF, 30, 12))).unwrap();

    let alice = b.add_student(10, 18.0).unwrap();
    b.add_course_request(alice, CourseRequestSpec::new(vec![art])).unwrap();
    let mut alt = CourseRequestSpec::new(vec![bio]);
    alt.alternative = true;
    b.add_course_request(alice, alt).unwrap();

    // Carol can get her primary course, so her alternative stays empty.
    let carol = b.add_student(11, 18.0).unwrap();
    b.add_course_request(carol, CourseRequestSpec::new(vec![bio])).unwrap();
    let mut alt = CourseRequestSpec::new(vec![bio]);
    alt.alternative = true;
    b.add_course_request(carol, alt).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);
    assert!(result.schedule[0].is_none());
    assert!(result.schedule[1].is_some());

    let criterion = OnlineCriterion::new(&model, carol, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), carol);
    assert!(result.schedule[0].is_some());
    assert!(result.schedule[1].is_none());
}

fn penalty_model() -> (SctModelBuilder, crate::course::CourseId) {
    let mut b = SctModelBuilder::new();
    let math = b.add_course(1, "MATH 101", 3.0).unwrap();
    let mc = b.add_config(math).unwrap();
    let mlec = b.add_subpart(mc, "Lec").unwrap();
    let mut costly = section(11, "M1", 30, t(MWF, 10, 12));
    costly.penalty = 5.0;
    b.add_section(mlec, costly).unwrap();
    b.add_section(mlec, section(12, "M2", 30, t(MWF, 30, 12))).unwrap();
    (b, math)
}

#[test]
fn lower_penalty_section_wins_by_default() {
    let (mut b, math) = penalty_model();
    let alice = b.add_student(10, 18.0).unwrap();
    b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);
    let e = result.schedule[0].as_ref().unwrap();
    assert_eq!(model.section(e.sections()[0]).external_id(), 12);
}

#[test]
fn selected_sections_outrank_penalties() {
    let (mut b, math) = penalty_model();
    let alice = b.add_student(10, 18.0).unwrap();
    let mut spec = CourseRequestSpec::new(vec![math]);
    spec.selected_sections.insert(crate::course::SectionId(0));
    let req = b.add_course_request(alice, spec).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);
    let e = result.schedule[0].as_ref().unwrap();
    assert_eq!(e.request(), req);
    assert_eq!(model.section(e.sections()[0]).external_id(), 11);
}

#[test]
fn required_sections_pin_the_choice() {
    let (mut b, math) = penalty_model();
    let alice = b.add_student(10, 18.0).unwrap();
    let req = b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    let model = b.build().unwrap();

    let mut requirements = SelectionRequirements::new();
    requirements
        .require_sections(&model, req, &[crate::course::SectionId(0)])
        .unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::with_requirements(&model, criterion, requirements);
    let result = selection.select(assignment.store(), assignment.context(), alice);
    let e = result.schedule[0].as_ref().unwrap();
    // The criterion prefers M2, the requirement forces M1.
    assert_eq!(model.section(e.sections()[0]).external_id(), 11);
}

#[test]
fn required_unassigned_keeps_the_request_empty() {
    let (mut b, math) = penalty_model();
    let alice = b.add_student(10, 18.0).unwrap();
    let req = b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    let model = b.build().unwrap();

    let mut requirements = SelectionRequirements::new();
    requirements.require_unassigned(req);

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::with_requirements(&model, criterion, requirements);
    let result = selection.select(assignment.store(), assignment.context(), alice);
    assert!(result.schedule[0].is_none());
    assert_eq!(result.assigned_count(), 0);
}

#[test]
fn free_time_pushes_the_course_out_of_its_window() {
    let mut b = SctModelBuilder::new();
    let math = b.add_course(1, "MATH 101", 3.0).unwrap();
    let mc = b.add_config(math).unwrap();
    let mlec = b.add_subpart(mc, "Lec").unwrap();
    let clashing = b.add_section(mlec, section(11, "M1", 30, t(MWF, 10, 12))).unwrap();
    let clear = b.add_section(mlec, section(12, "M2", 30, t(MWF, 30, 12))).unwrap();
    let alice = b.add_student(10, 18.0).unwrap();
    b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    b.add_free_time_request(alice, t(MWF, 10, 12)).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);

    // Free times never hard-conflict, but the overlap tier steers the
    // course into the clear section.
    assert_eq!(result.assigned_count(), 2);
    let e = result.schedule[0].as_ref().unwrap();
    assert!(e.uses_section(clear));
    assert!(!e.uses_section(clashing));
}

#[test]
fn in_person_section_beats_online_at_equal_penalty() {
    let mut b = SctModelBuilder::new();
    let math = b.add_course(1, "MATH 101", 3.0).unwrap();
    let mc = b.add_config(math).unwrap();
    let mlec = b.add_subpart(mc, "Lec").unwrap();
    let mut online = section(11, "M1", 30, t(MWF, 10, 12));
    online.online = true;
    b.add_section(mlec, online).unwrap();
    let in_person = b.add_section(mlec, section(12, "M2", 30, t(MWF, 30, 12))).unwrap();
    let alice = b.add_student(10, 18.0).unwrap();
    b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&model, criterion);
    let result = selection.select(assignment.store(), assignment.context(), alice);
    assert!(result.schedule[0].as_ref().unwrap().uses_section(in_person));
}

#[test]
fn exhaustive_search_agrees_with_pruned_search() {
    let build = |config: SelectionConfig| {
        let mut b = SctModelBuilder::with_config(config);
        let math = b.add_course(1, "MATH 101", 3.0).unwrap();
        let mc = b.add_config(math).unwrap();
        let mlec = b.add_subpart(mc, "Lec").unwrap();
        b.add_section(mlec, section(11, "M1", 30, t(MWF, 10, 12))).unwrap();
        b.add_section(mlec, section(12, "M2", 30, t(MWF, 30, 12))).unwrap();
        let phys = b.add_course(2, "PHYS 101", 3.0).unwrap();
        let pc = b.add_config(phys).unwrap();
        let plec = b.add_subpart(pc, "Lec").unwrap();
        b.add_section(plec, section(21, "P1", 30, t(MWF, 10, 12))).unwrap();
        b.add_section(plec, section(22, "P2", 30, t(TTH, 10, 12))).unwrap();
        let chem = b.add_course(3, "CHEM 101", 3.0).unwrap();
        let cc = b.add_config(chem).unwrap();
        let clec = b.add_subpart(cc, "Lec").unwrap();
        b.add_section(clec, section(31, "C1", 30, t(TTH, 10, 12))).unwrap();
        b.add_section(clec, section(32, "C2", 30, t(TTH, 30, 12))).unwrap();
        let alice = b.add_student(10, 18.0).unwrap();
        b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
        b.add_course_request(alice, CourseRequestSpec::new(vec![phys])).unwrap();
        b.add_course_request(alice, CourseRequestSpec::new(vec![chem])).unwrap();
        (b.build().unwrap(), alice)
    };

    let (pruned_model, alice) = build(SelectionConfig::default());
    let exhaustive_config = SelectionConfig {
        exhaustive: true,
        ..SelectionConfig::default()
    };
    let (exhaustive_model, _) = build(exhaustive_config);

    let assignment = DenseAssignment::new(&pruned_model);
    let criterion = OnlineCriterion::new(&pruned_model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&pruned_model, criterion);
    let pruned = selection.select(assignment.store(), assignment.context(), alice);

    let assignment = DenseAssignment::new(&exhaustive_model);
    let criterion = OnlineCriterion::new(&exhaustive_model, alice, HashMap::new());
    let selection = BranchBoundSelection::new(&exhaustive_model, criterion);
    let exhaustive = selection.select(assignment.store(), assignment.context(), alice);

    assert_eq!(pruned.schedule, exhaustive.schedule);
    assert_eq!(pruned.assigned_count(), 3);
}

#[test]
fn schedule_comparison_is_transitive_over_assignment_counts() {
    let mut b = SctModelBuilder::new();
    let math = b.add_course(1, "MATH 101", 3.0).unwrap();
    let mc = b.add_config(math).unwrap();
    let mlec = b.add_subpart(mc, "Lec").unwrap();
    b.add_section(mlec, section(11, "M1", 30, t(MWF, 10, 12))).unwrap();
    let phys = b.add_course(2, "PHYS 101", 3.0).unwrap();
    let pc = b.add_config(phys).unwrap();
    let plec = b.add_subpart(pc, "Lec").unwrap();
    b.add_section(plec, section(21, "P1", 30, t(MWF, 30, 12))).unwrap();
    let alice = b.add_student(10, 18.0).unwrap();
    let ra = b.add_course_request(alice, CourseRequestSpec::new(vec![math])).unwrap();
    let rb = b.add_course_request(alice, CourseRequestSpec::new(vec![phys])).unwrap();
    let model = b.build().unwrap();

    let assignment = DenseAssignment::new(&model);
    let cx = assignment.context();
    let criterion = OnlineCriterion::new(&model, alice, HashMap::new());

    let em = model.domain(ra)[0].clone();
    let ep = model.domain(rb)[0].clone();
    let full = vec![Some(em.clone()), Some(ep)];
    let partial = vec![Some(em), None];
    let empty = vec![None, None];

    assert_eq!(criterion.compare_schedules(&model, cx, &full, &partial), Ordering::Less);
    assert_eq!(criterion.compare_schedules(&model, cx, &partial, &empty), Ordering::Less);
    assert_eq!(criterion.compare_schedules(&model, cx, &full, &empty), Ordering::Less);
    assert_eq!(criterion.compare_schedules(&model, cx, &empty, &full), Ordering::Greater);
    assert_eq!(criterion.compare_schedules(&model, cx, &full, &full), Ordering::Equal);
}
