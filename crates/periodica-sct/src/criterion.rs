//! Multi-criteria schedule comparison.
//!
//! A [`SelectionCriterion`] ranks whole schedules and single enrollments
//! for the branch-and-bound selection. The workhorse is
//! [`OnlineCriterion`], a strict lexicographic order over the tiers listed
//! on the type; [`BestPenaltyCriterion`] keeps only the priority and
//! over-expectedness tiers and is used when a quick seat-availability
//! answer matters more than schedule quality.
//!
//! A schedule is a slice of optional enrollments indexed by the position
//! of the request in its student's request list.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use periodica_core::VariableId;

use crate::course::SectionId;
use crate::enrollment::Enrollment;
use crate::model::{SctContext, SectioningModel};
use crate::student::SctStudentId;

/// A partial schedule of one student: one optional enrollment per request,
/// in request priority order.
pub type Schedule = [Option<Enrollment>];

/// Past-section fractions closer than this are considered equal.
const PAST_EPSILON: f64 = 1e-4;

/// Ranks schedules and enrollments of a single student.
///
/// All comparisons return [`Ordering::Less`] when the first argument is
/// the better one.
pub trait SelectionCriterion {
    /// Lexicographic comparison of two complete schedules.
    fn compare_schedules(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        current: &Schedule,
        best: &Schedule,
    ) -> Ordering;

    /// Bound check: can the partial schedule `current`, decided up to but
    /// not including `max_idx`, still beat `best`?
    ///
    /// The bound assumes each tier can only get worse as more requests are
    /// decided, which holds for the priority, overlap and over-expected
    /// tiers but is heuristic for the ratio-shaped balance tier; a pruned
    /// branch can therefore rarely hide an equally good leaf. Set
    /// `exhaustive` in the config to disable pruning where exactness
    /// matters more than speed.
    fn can_improve(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        max_idx: usize,
        current: &Schedule,
        best: &Schedule,
    ) -> bool;

    /// Orders two enrollments of the same request, best first.
    fn compare_enrollments(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        e1: &Enrollment,
        e2: &Enrollment,
    ) -> Ordering;

    /// Scalar value of a schedule for reporting; higher is better.
    fn total_weight(&self, model: &SectioningModel, cx: &SctContext, schedule: &Schedule) -> f64;
}

/// The full online sectioning order. Tiers, most significant first:
///
/// 1. priority and alternativity, ignoring free-time requests;
/// 2. course time overlaps and unavailability overlaps;
/// 3. over-expected section use;
/// 4. priority and alternativity including free times;
/// 5. preferred sections;
/// 6. selected sections and configurations;
/// 7. past sections;
/// 8. all time overlaps, free times included;
/// 9. distance conflicts;
/// 10. arranged-hours sections, then online sections;
/// 11. section balance;
/// 12. average section penalty.
pub struct OnlineCriterion {
    student: SctStudentId,
    requests: Vec<VariableId>,
    preferred: HashMap<VariableId, HashSet<SectionId>>,
    has_free_time: bool,
}

impl OnlineCriterion {
    pub fn new(
        model: &SectioningModel,
        student: SctStudentId,
        preferred: HashMap<VariableId, HashSet<SectionId>>,
    ) -> Self {
        let requests = model.student(student).requests().to_vec();
        let has_free_time = requests
            .iter()
            .any(|&r| model.request(r).is_free_time());
        OnlineCriterion {
            student,
            requests,
            preferred,
            has_free_time,
        }
    }

    fn is_free_time(&self, model: &SectioningModel, idx: usize) -> bool {
        model.request(self.requests[idx]).is_free_time()
    }

    fn preferred_of(&self, idx: usize) -> Option<&HashSet<SectionId>> {
        self.preferred
            .get(&self.requests[idx])
            .filter(|p| !p.is_empty())
    }

    /// Priority and alternativity walk shared by several tiers; returns
    /// `Some` as soon as one schedule dominates.
    fn compare_priorities(
        &self,
        model: &SectioningModel,
        current: &Schedule,
        best: &Schedule,
        skip_free_time: bool,
    ) -> Option<Ordering> {
        for idx in 0..self.requests.len() {
            if skip_free_time && self.is_free_time(model, idx) {
                continue;
            }
            match (&best[idx], &current[idx]) {
                (Some(b), Some(c)) => {
                    if b.priority() < c.priority() {
                        return Some(Ordering::Greater);
                    }
                    if b.priority() > c.priority() {
                        return Some(Ordering::Less);
                    }
                }
                (Some(_), None) => return Some(Ordering::Greater),
                (None, Some(_)) => return Some(Ordering::Less),
                (None, None) => {}
            }
        }
        None
    }

    /// Bound version of the priority walk. Requests at `max_idx` and
    /// beyond are still open in `current`, so the only information there
    /// is whether `best` can be improved on them at all; `alt` tracks how
    /// many alternative slots the decided prefix left open.
    fn can_improve_priorities(
        &self,
        model: &SectioningModel,
        max_idx: usize,
        current: &Schedule,
        best: &Schedule,
        skip_free_time: bool,
    ) -> Option<bool> {
        let mut alt = 0i32;
        for idx in 0..self.requests.len() {
            if skip_free_time && self.is_free_time(model, idx) {
                continue;
            }
            let request = model.request(self.requests[idx]);
            if idx < max_idx {
                match (&best[idx], &current[idx]) {
                    (Some(b), Some(c)) => {
                        if b.priority() < c.priority() {
                            return Some(false);
                        }
                        if b.priority() > c.priority() {
                            return Some(true);
                        }
                        if request.is_alternative() {
                            alt -= 1;
                        }
                    }
                    (Some(_), None) => return Some(false),
                    (None, Some(_)) => return Some(true),
                    (None, None) => {
                        if request.is_course() && !request.is_alternative() {
                            alt += 1;
                        }
                    }
                }
            } else if let Some(b) = &best[idx] {
                if b.priority() > 0 {
                    return Some(true);
                }
            } else if !request.is_alternative() || alt > 0 {
                return Some(true);
            }
        }
        None
    }

    /// Course-course overlap slots plus unavailability overlaps, counting
    /// only enrollments before `limit`.
    fn course_overlap_units(
        &self,
        model: &SectioningModel,
        schedule: &Schedule,
        limit: usize,
    ) -> u32 {
        let mut total = 0;
        for idx in 0..self.requests.len().min(limit) {
            let Some(e) = &schedule[idx] else { continue };
            if !e.is_course() {
                continue;
            }
            for other in schedule[..idx].iter().flatten() {
                if other.is_course() {
                    total += model.overlap_slots_between(other, e);
                }
            }
            total += model.unavailability_slots(self.student, e);
        }
        total
    }

    fn over_expected_units(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        schedule: &Schedule,
        limit: usize,
    ) -> f64 {
        schedule
            .iter()
            .take(limit)
            .flatten()
            .map(|e| model.enrollment_over_expected(cx, e))
            .sum()
    }

    fn selected_blend(&self, model: &SectioningModel, e: &Enrollment) -> f64 {
        let request = model.request(e.request());
        0.3 * percent_selected_config(request, e) + 0.7 * percent_selected_section(request, e)
    }

    /// Overlap slots of every assigned pair, free times included; an
    /// unassigned free-time request still counts as sitting at its time.
    fn all_overlap_units(&self, model: &SectioningModel, schedule: &Schedule, limit: usize) -> u32 {
        let mut total = 0;
        for idx in 0..self.requests.len().min(limit) {
            let Some(e) = &schedule[idx] else { continue };
            for x in 0..idx {
                if let Some(other) = &schedule[x] {
                    total += model.overlap_slots_between(other, e);
                } else if let Some(&free) = model.request(self.requests[x]).free_time() {
                    total += model
                        .enrollment_times(e)
                        .map(|t| t.overlap_slots(&free))
                        .sum::<u32>();
                }
            }
            if e.is_course() {
                total += model.unavailability_slots(self.student, e);
            }
        }
        total
    }

    fn distance_units(&self, model: &SectioningModel, schedule: &Schedule, limit: usize) -> u32 {
        let mut total = 0;
        for idx in 0..self.requests.len().min(limit) {
            let Some(e) = &schedule[idx] else { continue };
            total += model.distance_conflicts(e);
            for other in schedule[..idx].iter().flatten() {
                total += model.distance_conflicts_between(other, e);
            }
        }
        total
    }

    fn no_time_and_online(
        model: &SectioningModel,
        schedule: &Schedule,
        limit: usize,
    ) -> (u32, u32) {
        let mut no_time = 0;
        let mut online = 0;
        for e in schedule.iter().take(limit).flatten() {
            for &s in e.sections() {
                let section = model.section(s);
                if !section.has_time() {
                    no_time += 1;
                }
                if section.is_online() {
                    online += 1;
                }
            }
        }
        (no_time, online)
    }

    /// Fraction of below-average section picks among subparts that offer a
    /// real choice.
    fn balance_fraction(model: &SectioningModel, schedule: &Schedule, limit: usize) -> f64 {
        let mut below = 0.0;
        let mut with_limit = 0u32;
        for e in schedule.iter().take(limit).flatten() {
            for &s in e.sections() {
                let section = model.section(s);
                let subpart = model.subpart(section.subpart());
                if subpart.sections().len() <= 1 {
                    continue;
                }
                let subpart_limit = model.subpart_limit(subpart.id());
                if subpart_limit <= 0 {
                    continue;
                }
                let average = f64::from(subpart_limit) / subpart.sections().len() as f64;
                if f64::from(section.limit()) < average {
                    below += (average - f64::from(section.limit())) / average;
                }
                with_limit += 1;
            }
        }
        if below > 0.0 {
            below / f64::from(with_limit)
        } else {
            0.0
        }
    }

    /// Overlap slots between an enrollment and the student's free-time
    /// requests, assigned or not.
    fn free_time_units(&self, model: &SectioningModel, e: &Enrollment) -> u32 {
        let mut total = 0;
        for &r in &self.requests {
            if r == e.request() {
                continue;
            }
            if let Some(&free) = model.request(r).free_time() {
                total += model
                    .enrollment_times(e)
                    .map(|t| t.overlap_slots(&free))
                    .sum::<u32>();
            }
        }
        total
    }
}

fn percent_selected_section(request: &crate::request::Request, e: &Enrollment) -> f64 {
    let Some(selected) = request.selected_sections() else {
        return 0.0;
    };
    if selected.is_empty() || e.sections().is_empty() {
        return 0.0;
    }
    let matched = e
        .sections()
        .iter()
        .filter(|s| selected.contains(s))
        .count();
    matched as f64 / e.sections().len() as f64
}

fn percent_selected_config(request: &crate::request::Request, e: &Enrollment) -> f64 {
    match (request.selected_configs(), e.config()) {
        (Some(selected), Some(config)) if selected.contains(&config) => 1.0,
        _ => 0.0,
    }
}

impl SelectionCriterion for OnlineCriterion {
    fn compare_schedules(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        current: &Schedule,
        best: &Schedule,
    ) -> Ordering {
        let all = self.requests.len();

        if let Some(order) = self.compare_priorities(model, current, best, true) {
            return order;
        }

        let current_overlaps = self.course_overlap_units(model, current, all);
        let best_overlaps = self.course_overlap_units(model, best, all);
        if current_overlaps != best_overlaps {
            return current_overlaps.cmp(&best_overlaps);
        }

        let current_over = self.over_expected_units(model, cx, current, all);
        let best_over = self.over_expected_units(model, cx, best, all);
        if current_over < best_over {
            return Ordering::Less;
        }
        if best_over < current_over {
            return Ordering::Greater;
        }

        if self.has_free_time {
            if let Some(order) = self.compare_priorities(model, current, best, false) {
                return order;
            }
        }

        let mut current_preferred = 0;
        let mut best_preferred = 0;
        for idx in 0..all {
            if let (Some(b), Some(preferred)) = (&best[idx], self.preferred_of(idx)) {
                if b.is_course() {
                    best_preferred += b
                        .sections()
                        .iter()
                        .filter(|s| preferred.contains(s))
                        .count();
                    if let Some(c) = &current[idx] {
                        current_preferred += c
                            .sections()
                            .iter()
                            .filter(|s| preferred.contains(s))
                            .count();
                    }
                }
            }
        }
        if current_preferred != best_preferred {
            return best_preferred.cmp(&current_preferred);
        }

        let current_blend: f64 = current
            .iter()
            .flatten()
            .filter(|e| e.is_course())
            .map(|e| self.selected_blend(model, e))
            .sum();
        let best_blend: f64 = best
            .iter()
            .flatten()
            .filter(|e| e.is_course())
            .map(|e| self.selected_blend(model, e))
            .sum();
        if current_blend > best_blend {
            return Ordering::Less;
        }
        if best_blend > current_blend {
            return Ordering::Greater;
        }

        let current_past = past_fraction(model, current, all);
        let best_past = past_fraction(model, best, all);
        if (current_past - best_past).abs() > PAST_EPSILON {
            return if current_past < best_past {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        let current_all = self.all_overlap_units(model, current, all);
        let best_all = self.all_overlap_units(model, best, all);
        if current_all != best_all {
            return current_all.cmp(&best_all);
        }

        let current_distance = self.distance_units(model, current, all);
        let best_distance = self.distance_units(model, best, all);
        if current_distance != best_distance {
            return current_distance.cmp(&best_distance);
        }

        let (current_no_time, current_online) = Self::no_time_and_online(model, current, all);
        let (best_no_time, best_online) = Self::no_time_and_online(model, best, all);
        if current_no_time != best_no_time {
            return current_no_time.cmp(&best_no_time);
        }
        if current_online != best_online {
            return current_online.cmp(&best_online);
        }

        let current_balance = Self::balance_fraction(model, current, all);
        let best_balance = Self::balance_fraction(model, best, all);
        if current_balance < best_balance {
            return Ordering::Less;
        }
        if best_balance < current_balance {
            return Ordering::Greater;
        }

        let current_penalty = average_penalty(model, current, all);
        let best_penalty = average_penalty(model, best, all);
        if current_penalty < best_penalty {
            return Ordering::Less;
        }
        if best_penalty < current_penalty {
            return Ordering::Greater;
        }

        Ordering::Equal
    }

    fn can_improve(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        max_idx: usize,
        current: &Schedule,
        best: &Schedule,
    ) -> bool {
        let all = self.requests.len();

        if let Some(answer) = self.can_improve_priorities(model, max_idx, current, best, true) {
            return answer;
        }

        let current_overlaps = self.course_overlap_units(model, current, max_idx);
        let best_overlaps = self.course_overlap_units(model, best, all);
        if current_overlaps < best_overlaps {
            return true;
        }
        if best_overlaps < current_overlaps {
            return false;
        }

        let current_over = self.over_expected_units(model, cx, current, max_idx);
        let best_over = self.over_expected_units(model, cx, best, all);
        if current_over < best_over {
            return true;
        }
        if best_over < current_over {
            return false;
        }

        if self.has_free_time {
            if let Some(answer) =
                self.can_improve_priorities(model, max_idx, current, best, false)
            {
                return answer;
            }
        }

        let mut current_preferred = 0i64;
        let mut best_preferred = 0i64;
        for idx in 0..all {
            if let Some(b) = &best[idx] {
                if b.is_course() {
                    if let Some(preferred) = self.preferred_of(idx) {
                        for s in b.sections() {
                            if preferred.contains(s) {
                                if idx < max_idx {
                                    best_preferred += 1;
                                }
                            } else if idx >= max_idx {
                                best_preferred -= 1;
                            }
                        }
                    }
                }
            }
            if idx < max_idx {
                if let (Some(c), Some(preferred)) = (&current[idx], self.preferred_of(idx)) {
                    if c.is_course() {
                        current_preferred += c
                            .sections()
                            .iter()
                            .filter(|s| preferred.contains(s))
                            .count() as i64;
                    }
                }
            }
        }
        if current_preferred > best_preferred {
            return true;
        }
        if best_preferred > current_preferred {
            return false;
        }

        let mut current_blend = 0.0;
        let mut best_blend = 0.0;
        for idx in 0..all {
            if let Some(b) = &best[idx] {
                if b.is_course() {
                    best_blend += self.selected_blend(model, b);
                    if idx >= max_idx {
                        // An open request can still match fully.
                        best_blend -= 1.0;
                    }
                }
            }
            if idx < max_idx {
                if let Some(c) = &current[idx] {
                    if c.is_course() {
                        current_blend += self.selected_blend(model, c);
                    }
                }
            }
        }
        if current_blend > best_blend {
            return true;
        }
        if best_blend > current_blend {
            return false;
        }

        let current_past = past_fraction(model, current, max_idx);
        let best_past = past_fraction(model, best, all);
        if (current_past - best_past).abs() > PAST_EPSILON {
            return current_past < best_past;
        }

        let current_all = self.all_overlap_units(model, current, max_idx);
        let best_all = self.all_overlap_units(model, best, all);
        if current_all < best_all {
            return true;
        }
        if best_all < current_all {
            return false;
        }

        let current_distance = self.distance_units(model, current, max_idx);
        let best_distance = self.distance_units(model, best, all);
        if current_distance < best_distance {
            return true;
        }
        if best_distance < current_distance {
            return false;
        }

        let (current_no_time, current_online) = Self::no_time_and_online(model, current, max_idx);
        let (best_no_time, best_online) = Self::no_time_and_online(model, best, all);
        if current_no_time != best_no_time {
            return current_no_time < best_no_time;
        }
        if current_online != best_online {
            return current_online < best_online;
        }

        let current_balance = Self::balance_fraction(model, current, max_idx);
        let best_balance = Self::balance_fraction(model, best, all);
        if current_balance < best_balance {
            return true;
        }
        if best_balance < current_balance {
            return false;
        }

        let current_penalty = average_penalty(model, current, max_idx);
        let mut best_penalty = 0.0;
        for idx in 0..all {
            if let Some(b) = &best[idx] {
                best_penalty += model.enrollment_penalty(b);
                if idx >= max_idx && b.is_course() {
                    // Open requests are bounded by their penalty floor.
                    best_penalty -= model.request(self.requests[idx]).min_penalty();
                }
            }
        }
        if current_penalty < best_penalty {
            return true;
        }
        if best_penalty < current_penalty {
            return false;
        }

        true
    }

    fn compare_enrollments(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        e1: &Enrollment,
        e2: &Enrollment,
    ) -> Ordering {
        if e1.priority() != e2.priority() {
            return e1.priority().cmp(&e2.priority());
        }

        let weight1 = model.request(e1.request()).weight();
        let weight2 = model.request(e2.request()).weight();
        let p1: f64 = e1
            .sections()
            .iter()
            .map(|&s| model.over_expected(cx, s, weight1))
            .sum();
        let p2: f64 = e2
            .sections()
            .iter()
            .map(|&s| model.over_expected(cx, s, weight2))
            .sum();
        if p1 < p2 {
            return Ordering::Less;
        }
        if p2 < p1 {
            return Ordering::Greater;
        }

        if e1.is_course() {
            if let Some(preferred) = self
                .preferred
                .get(&e1.request())
                .filter(|p| !p.is_empty())
            {
                let s1 = e1.sections().iter().filter(|s| preferred.contains(s)).count();
                let s2 = e2.sections().iter().filter(|s| preferred.contains(s)).count();
                if s1 != s2 {
                    return s2.cmp(&s1);
                }
            }

            let b1 = self.selected_blend(model, e1);
            let b2 = self.selected_blend(model, e2);
            if b1 > b2 {
                return Ordering::Less;
            }
            if b2 > b1 {
                return Ordering::Greater;
            }
        }

        let past1 = enrollment_past_fraction(model, e1);
        let past2 = enrollment_past_fraction(model, e2);
        if (past1 - past2).abs() > PAST_EPSILON {
            return if past1 < past2 {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        let o1 = self.free_time_units(model, e1) + model.unavailability_slots(self.student, e1);
        let o2 = self.free_time_units(model, e2) + model.unavailability_slots(self.student, e2);
        if o1 != o2 {
            return o1.cmp(&o2);
        }

        let d1 = model.distance_conflicts(e1);
        let d2 = model.distance_conflicts(e2);
        if d1 != d2 {
            return d1.cmp(&d2);
        }

        let (n1, on1) = section_counts(model, e1);
        let (n2, on2) = section_counts(model, e2);
        if n1 != n2 {
            return n1.cmp(&n2);
        }
        if on1 != on2 {
            return on1.cmp(&on2);
        }

        let f1 = enrollment_balance(model, e1);
        let f2 = enrollment_balance(model, e2);
        if f1 < f2 {
            return Ordering::Less;
        }
        if f2 < f1 {
            return Ordering::Greater;
        }

        let x1 = model.enrollment_penalty(e1);
        let x2 = model.enrollment_penalty(e2);
        if x1 < x2 {
            return Ordering::Less;
        }
        if x2 < x1 {
            return Ordering::Greater;
        }

        Ordering::Equal
    }

    /// Compact schedule value: request weights discounted by the
    /// normalized overlap penalties from the config. Used for reporting
    /// only; the selection itself compares schedules lexicographically.
    fn total_weight(&self, model: &SectioningModel, _cx: &SctContext, schedule: &Schedule) -> f64 {
        let config = model.config();
        let mut value = 0.0;
        for idx in 0..self.requests.len() {
            let Some(e) = &schedule[idx] else { continue };
            let request = model.request(self.requests[idx]);
            let slots: u32 = model.enrollment_times(e).map(|t| t.length).sum();
            let mut penalty = 0.0;
            if slots > 0 {
                let mut course_overlap = 0;
                for other in schedule[..idx].iter().flatten() {
                    if other.is_course() && e.is_course() {
                        course_overlap += model.overlap_slots_between(other, e);
                    }
                }
                penalty += config.course_overlap_weight * f64::from(course_overlap)
                    / f64::from(slots);
                penalty += config.free_time_overlap_weight
                    * f64::from(self.free_time_units(model, e))
                    / f64::from(slots);
                penalty += config.unavailability_weight
                    * f64::from(model.unavailability_slots(self.student, e))
                    / f64::from(slots);
            }
            value += request.weight() * (1.0 - penalty);
        }
        value
    }
}

fn past_fraction(model: &SectioningModel, schedule: &Schedule, limit: usize) -> f64 {
    schedule
        .iter()
        .take(limit)
        .flatten()
        .map(|e| enrollment_past_fraction(model, e))
        .sum()
}

fn enrollment_past_fraction(model: &SectioningModel, e: &Enrollment) -> f64 {
    if e.sections().is_empty() {
        return 0.0;
    }
    let past = e
        .sections()
        .iter()
        .filter(|&&s| model.section(s).is_past())
        .count();
    past as f64 / e.sections().len() as f64
}

fn average_penalty(model: &SectioningModel, schedule: &Schedule, limit: usize) -> f64 {
    schedule
        .iter()
        .take(limit)
        .flatten()
        .map(|e| model.enrollment_penalty(e))
        .sum()
}

fn section_counts(model: &SectioningModel, e: &Enrollment) -> (u32, u32) {
    let mut no_time = 0;
    let mut online = 0;
    for &s in e.sections() {
        let section = model.section(s);
        if !section.has_time() {
            no_time += 1;
        }
        if section.is_online() {
            online += 1;
        }
    }
    (no_time, online)
}

fn enrollment_balance(model: &SectioningModel, e: &Enrollment) -> f64 {
    let mut below = 0.0;
    let mut with_limit = 0u32;
    for &s in e.sections() {
        let section = model.section(s);
        let subpart = model.subpart(section.subpart());
        if subpart.sections().len() <= 1 {
            continue;
        }
        let subpart_limit = model.subpart_limit(subpart.id());
        if subpart_limit <= 0 {
            continue;
        }
        let average = f64::from(subpart_limit) / subpart.sections().len() as f64;
        if f64::from(section.limit()) < average {
            below += (average - f64::from(section.limit())) / average;
        }
        with_limit += 1;
    }
    if below > 0.0 {
        below / f64::from(with_limit)
    } else {
        0.0
    }
}

/// A two-tier order: priority and alternativity first, over-expectedness
/// second. Used to probe whether a request can still be assigned at all
/// without paying for the full quality comparison.
pub struct BestPenaltyCriterion {
    requests: Vec<VariableId>,
}

impl BestPenaltyCriterion {
    pub fn new(model: &SectioningModel, student: SctStudentId) -> Self {
        BestPenaltyCriterion {
            requests: model.student(student).requests().to_vec(),
        }
    }

    fn is_free_time(&self, model: &SectioningModel, idx: usize) -> bool {
        model.request(self.requests[idx]).is_free_time()
    }
}

impl SelectionCriterion for BestPenaltyCriterion {
    fn compare_schedules(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        current: &Schedule,
        best: &Schedule,
    ) -> Ordering {
        for idx in 0..self.requests.len() {
            if self.is_free_time(model, idx) {
                continue;
            }
            match (&best[idx], &current[idx]) {
                (Some(b), Some(c)) => {
                    if b.priority() < c.priority() {
                        return Ordering::Greater;
                    }
                    if b.priority() > c.priority() {
                        return Ordering::Less;
                    }
                }
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (None, None) => {}
            }
        }

        let current_over: f64 = current
            .iter()
            .flatten()
            .map(|e| model.enrollment_over_expected(cx, e))
            .sum();
        let best_over: f64 = best
            .iter()
            .flatten()
            .map(|e| model.enrollment_over_expected(cx, e))
            .sum();
        if current_over < best_over {
            return Ordering::Less;
        }
        if best_over < current_over {
            return Ordering::Greater;
        }

        Ordering::Equal
    }

    fn can_improve(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        max_idx: usize,
        current: &Schedule,
        best: &Schedule,
    ) -> bool {
        let mut alt = 0i32;
        for idx in 0..self.requests.len() {
            if self.is_free_time(model, idx) {
                continue;
            }
            let request = model.request(self.requests[idx]);
            if idx < max_idx {
                match (&best[idx], &current[idx]) {
                    (Some(b), Some(c)) => {
                        if b.priority() < c.priority() {
                            return false;
                        }
                        if b.priority() > c.priority() {
                            return true;
                        }
                        if request.is_alternative() {
                            alt -= 1;
                        }
                    }
                    (Some(_), None) => return false,
                    (None, Some(_)) => return true,
                    (None, None) => {
                        if !request.is_alternative() {
                            alt += 1;
                        }
                    }
                }
            } else if let Some(b) = &best[idx] {
                if b.priority() > 0 {
                    return true;
                }
            } else if !request.is_alternative() || alt > 0 {
                return true;
            }
        }

        let current_over: f64 = current
            .iter()
            .take(max_idx)
            .flatten()
            .map(|e| model.enrollment_over_expected(cx, e))
            .sum();
        let best_over: f64 = best
            .iter()
            .flatten()
            .map(|e| model.enrollment_over_expected(cx, e))
            .sum();
        if current_over < best_over {
            return true;
        }
        if best_over < current_over {
            return false;
        }

        false
    }

    fn compare_enrollments(
        &self,
        model: &SectioningModel,
        cx: &SctContext,
        e1: &Enrollment,
        e2: &Enrollment,
    ) -> Ordering {
        if e1.priority() != e2.priority() {
            return e1.priority().cmp(&e2.priority());
        }
        let weight1 = model.request(e1.request()).weight();
        let weight2 = model.request(e2.request()).weight();
        let p1: f64 = e1
            .sections()
            .iter()
            .map(|&s| model.over_expected(cx, s, weight1))
            .sum();
        let p2: f64 = e2
            .sections()
            .iter()
            .map(|&s| model.over_expected(cx, s, weight2))
            .sum();
        if p1 < p2 {
            return Ordering::Less;
        }
        if p2 < p1 {
            return Ordering::Greater;
        }
        Ordering::Equal
    }

    fn total_weight(
        &self,
        _model: &SectioningModel,
        _cx: &SctContext,
        _schedule: &Schedule,
    ) -> f64 {
        0.0
    }
}
