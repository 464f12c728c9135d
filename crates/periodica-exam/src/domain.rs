//! Domain generation: room-subset enumeration per candidate period.
//!
//! For an exam needing `S` seats in at most `max_rooms` rooms, the domain
//! holds one placement per (period, room set) pair. Full subset enumeration
//! explodes on large room catalogs, so the search is a depth-first
//! branch-and-bound keeping only a bounded set of best-penalty subsets:
//!
//! - feasibility bound: walking the candidate rooms in descending size
//!   order, a branch is abandoned once even the `max_rooms` largest
//!   remaining rooms cannot reach `S`;
//! - retention bound: at most one candidate-room-list's worth of subsets is
//!   retained, ordered by penalty; once full, a new subset must strictly
//!   beat the worst retained one, which is then evicted.

use periodica_core::VariableId;
use smallvec::SmallVec;
use tracing::error;

use crate::config::ExamWeights;
use crate::exam::Exam;
use crate::period::{Period, PeriodId};
use crate::placement::{room_split_penalty, ExamPlacement};
use crate::room::{Room, RoomId};

/// Knobs for domain generation, threaded through explicitly rather than
/// read from global state.
#[derive(Debug, Clone, Default)]
pub struct DomainOptions {
    /// Cap on retained room sets per period; `None` retains up to one set
    /// per candidate room.
    pub room_set_cap: Option<usize>,
    /// For exams with very long candidate room lists, shrink `max_rooms`
    /// to what a median-sized room suggests is enough.
    pub alter_max_rooms: bool,
}

/// Builds a placement for an exam, computing the aggregate room attributes.
///
/// Returns `None` if the period is not a candidate for the exam.
pub(crate) fn make_placement(
    exam: &Exam,
    period: PeriodId,
    room_ids: SmallVec<[RoomId; 4]>,
    rooms: &[Room],
) -> Option<ExamPlacement> {
    let _ = exam.period_penalty(period)?;
    let mut size = 0u32;
    let mut room_penalty = 0.0;
    for &room in &room_ids {
        let data = &rooms[room.index()];
        size += data.usable_size(exam.alt_seating());
        room_penalty += exam.room_placement_penalty(room).unwrap_or(0.0) + data.period_penalty(period);
    }
    let mut split_distance = 0.0;
    if room_ids.len() > 1 {
        for (i, &a) in room_ids.iter().enumerate() {
            for &b in &room_ids[i + 1..] {
                split_distance += rooms[a.index()].distance_to(&rooms[b.index()]);
            }
        }
        split_distance /= (room_ids.len() * (room_ids.len() - 1) / 2) as f64;
    }
    Some(ExamPlacement::new(
        exam.variable(),
        period,
        room_ids,
        size,
        room_penalty,
        split_distance,
    ))
}

/// Generates the full domain of an exam.
///
/// A pre-assigned period restricts the period list to that one period; a
/// pre-assigned room set bypasses enumeration entirely, with the size check
/// intentionally skipped so a forced placement is never silently dropped.
/// An empty result leaves the exam permanently unassignable and is logged
/// here, once.
pub(crate) fn generate_domain(
    exam: &Exam,
    periods: &[Period],
    rooms: &[Room],
    weights: &ExamWeights,
    options: &DomainOptions,
) -> Vec<ExamPlacement> {
    let candidate_periods: Vec<PeriodId> = exam
        .period_placements()
        .iter()
        .map(|p| p.period)
        .filter(|&p| exam.pre_assigned_period().map_or(true, |fixed| fixed == p))
        .collect();

    let mut values = Vec::new();
    if !exam.pre_assigned_rooms().is_empty() {
        let fixed: SmallVec<[RoomId; 4]> = exam.pre_assigned_rooms().iter().copied().collect();
        for &period in &candidate_periods {
            if let Some(placement) = make_placement(exam, period, fixed.clone(), rooms) {
                values.push(placement);
            }
        }
    } else if exam.max_rooms() == 0 {
        for &period in &candidate_periods {
            if let Some(placement) = make_placement(exam, period, SmallVec::new(), rooms) {
                values.push(placement);
            }
        }
    } else {
        if exam.room_placements().is_empty() {
            error!(exam = exam.name(), "exam has no candidate rooms");
            return Vec::new();
        }
        let max_rooms = effective_max_rooms(exam, rooms, options);
        let cap = options
            .room_set_cap
            .unwrap_or(exam.room_placements().len())
            .max(1);
        for &period in &candidate_periods {
            let mut retained = RetainedSets::new(cap);
            let mut search = SubsetSearch {
                exam,
                rooms,
                period,
                weights,
                retained: &mut retained,
            };
            search.run(max_rooms);
            for candidate in retained.into_entries() {
                if let Some(placement) = make_placement(exam, period, candidate.rooms, rooms) {
                    values.push(placement);
                }
            }
        }
    }

    if values.is_empty() {
        error!(exam = exam.name(), "exam has no placement");
    }
    values
}

fn effective_max_rooms(exam: &Exam, rooms: &[Room], options: &DomainOptions) -> usize {
    let mut max_rooms = exam.max_rooms();
    let placements = exam.room_placements();
    if options.alter_max_rooms && placements.len() > 50 {
        let median = &placements[placements.len().min(100) / 2];
        let median_size = rooms[median.room.index()].usable_size(exam.alt_seating());
        if median_size > 0 {
            max_rooms = max_rooms.min(1 + (exam.required_size() / median_size) as usize);
        }
    }
    max_rooms
}

struct SetCandidate {
    rooms: SmallVec<[RoomId; 4]>,
    /// Room ids sorted ascending, the canonical tie-break key.
    key: SmallVec<[RoomId; 4]>,
    penalty: f64,
}

/// Fixed-capacity set of the best-penalty subsets seen so far, ordered by
/// (penalty, canonical room-id key).
struct RetainedSets {
    cap: usize,
    entries: Vec<SetCandidate>,
}

impl RetainedSets {
    fn new(cap: usize) -> Self {
        RetainedSets {
            cap,
            entries: Vec::with_capacity(cap),
        }
    }

    fn worst_penalty(&self) -> Option<f64> {
        self.entries.last().map(|c| c.penalty)
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.cap
    }

    fn offer(&mut self, rooms: &[RoomId], penalty: f64) {
        if self.is_full() {
            match self.worst_penalty() {
                Some(worst) if penalty < worst => {
                    self.entries.pop();
                }
                _ => return,
            }
        }
        let mut key: SmallVec<[RoomId; 4]> = rooms.iter().copied().collect();
        key.sort_unstable();
        let at = self
            .entries
            .partition_point(|c| (c.penalty, &c.key) < (penalty, &key));
        self.entries.insert(
            at,
            SetCandidate {
                rooms: rooms.iter().copied().collect(),
                key,
                penalty,
            },
        );
    }

    fn into_entries(self) -> Vec<SetCandidate> {
        self.entries
    }
}

struct SubsetSearch<'a> {
    exam: &'a Exam,
    rooms: &'a [Room],
    period: PeriodId,
    weights: &'a ExamWeights,
    retained: &'a mut RetainedSets,
}

impl SubsetSearch<'_> {
    fn run(&mut self, max_rooms: usize) {
        let mut so_far = SmallVec::new();
        self.search(0, max_rooms, &mut so_far, 0, 0.0);
    }

    fn usable(&self, index: usize) -> u32 {
        let room = self.exam.room_placements()[index].room;
        self.rooms[room.index()].usable_size(self.exam.alt_seating())
    }

    fn search(
        &mut self,
        from: usize,
        max_rooms: usize,
        so_far: &mut SmallVec<[RoomId; 4]>,
        size_so_far: u32,
        penalty_so_far: f64,
    ) {
        let required = self.exam.required_size();
        if size_so_far >= required {
            let penalty = self.weights.room_split * f64::from(room_split_penalty(so_far.len()))
                + self.weights.room_size * f64::from(size_so_far - required)
                + self.weights.room * penalty_so_far;
            self.retained.offer(so_far, penalty);
            return;
        }
        if max_rooms == 0 {
            return;
        }
        let placements = self.exam.room_placements();
        // Upper bound on reachable size: the next max_rooms rooms in
        // descending size order. Maintained incrementally as the window
        // slides right.
        let mut size_bound = size_so_far;
        for i in 0..max_rooms.min(placements.len().saturating_sub(from)) {
            size_bound += self.usable(from + i);
        }
        let mut index = from;
        while index < placements.len() {
            if size_bound < required {
                break;
            }
            let placement = placements[index];
            let room = &self.rooms[placement.room.index()];
            if room.is_available(self.period) {
                so_far.push(placement.room);
                self.search(
                    index + 1,
                    max_rooms - 1,
                    so_far,
                    size_so_far + room.usable_size(self.exam.alt_seating()),
                    penalty_so_far + placement.penalty + room.period_penalty(self.period),
                );
                so_far.pop();
            }
            size_bound -= self.usable(index);
            if index + max_rooms < placements.len() {
                size_bound += self.usable(index + max_rooms);
            }
            index += 1;
        }
    }
}

/// Assigned/required sizes of every retained set are checked by the tests
/// below; the aggregate placement attributes are covered in the model tests.
#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::room::{RoomPlacement, RoomSpec};

    fn test_rooms(sizes: &[u32]) -> Vec<Room> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                Room::new(
                    RoomId(i),
                    RoomSpec::new(i as i64, format!("room {i}"), size, size / 2),
                    vec![true],
                    vec![0.0],
                )
            })
            .collect()
    }

    fn test_exam(size: u32, max_rooms: usize, rooms: &[Room]) -> Exam {
        let mut placements: Vec<RoomPlacement> =
            rooms.iter().map(|r| RoomPlacement::new(r.id())).collect();
        placements.sort_by(|a, b| {
            rooms[b.room.index()]
                .size()
                .cmp(&rooms[a.room.index()].size())
        });
        Exam::new(
            VariableId(0),
            1,
            "exam".into(),
            size,
            0,
            60,
            false,
            max_rooms,
            None,
            vec![crate::exam::PeriodPlacement {
                period: PeriodId(0),
                penalty: 0.0,
            }],
            placements,
            None,
            Vec::new(),
        )
    }

    fn generated_sets(exam: &Exam, rooms: &[Room], cap: Option<usize>) -> Vec<ExamPlacement> {
        let periods = vec![Period::new(PeriodId(0), 1, 0, 120, 0.0, 0, None)];
        let options = DomainOptions {
            room_set_cap: cap,
            alter_max_rooms: false,
        };
        generate_domain(exam, &periods, rooms, &ExamWeights::default(), &options)
    }

    fn subset_penalty(weights: &ExamWeights, rooms: &[Room], subset: &[usize], required: u32) -> f64 {
        let size: u32 = subset.iter().map(|&i| rooms[i].size()).sum();
        weights.room_split * f64::from(room_split_penalty(subset.len()))
            + weights.room_size * f64::from(size - required)
    }

    /// Every feasible subset of at most `max_rooms` rooms, by index.
    fn brute_force(rooms: &[Room], required: u32, max_rooms: usize) -> Vec<Vec<usize>> {
        let mut feasible = Vec::new();
        for mask in 1u32..(1 << rooms.len()) {
            let subset: Vec<usize> = (0..rooms.len()).filter(|i| mask & (1 << i) != 0).collect();
            if subset.len() > max_rooms {
                continue;
            }
            let size: u32 = subset.iter().map(|&i| rooms[i].size()).sum();
            if size >= required {
                feasible.push(subset);
            }
        }
        feasible
    }

    #[test]
    fn every_generated_set_covers_the_exam_within_the_room_cap() {
        let rooms = test_rooms(&[40, 60, 80, 100, 120]);
        let exam = test_exam(150, 2, &rooms);
        let placements = generated_sets(&exam, &rooms, None);
        assert!(!placements.is_empty());
        for placement in &placements {
            assert!(placement.size() >= 150, "undersized set: {placement}");
            assert!(placement.rooms().len() <= 2);
        }
    }

    #[test]
    fn best_retained_set_matches_brute_force() {
        let weights = ExamWeights::default();
        let rooms = test_rooms(&[40, 60, 80, 100, 120]);
        let exam = test_exam(150, 2, &rooms);
        let placements = generated_sets(&exam, &rooms, None);

        let best_generated = placements
            .iter()
            .map(|p| {
                let subset: Vec<usize> = p.rooms().iter().map(|r| r.index()).collect();
                subset_penalty(&weights, &rooms, &subset, 150)
            })
            .min_by(f64::total_cmp)
            .unwrap();
        let best_brute = brute_force(&rooms, 150, 2)
            .iter()
            .map(|subset| subset_penalty(&weights, &rooms, subset, 150))
            .min_by(f64::total_cmp)
            .unwrap();
        assert_eq!(best_generated, best_brute);
    }

    #[test]
    fn randomized_instances_never_beat_the_retained_best() {
        let weights = ExamWeights::default();
        let mut rng = StdRng::seed_from_u64(0x9e3779b9);
        for _ in 0..50 {
            let room_count = rng.random_range(3..=8);
            let sizes: Vec<u32> = (0..room_count).map(|_| rng.random_range(20..=120)).collect();
            let rooms = test_rooms(&sizes);
            let total: u32 = sizes.iter().sum();
            let required = rng.random_range(1..=total);
            let max_rooms = rng.random_range(1..=room_count);
            let exam = test_exam(required, max_rooms, &rooms);

            let placements = generated_sets(&exam, &rooms, None);
            let feasible = brute_force(&rooms, required, max_rooms);
            assert_eq!(placements.is_empty(), feasible.is_empty());
            if feasible.is_empty() {
                continue;
            }
            let best_generated = placements
                .iter()
                .map(|p| {
                    let subset: Vec<usize> = p.rooms().iter().map(|r| r.index()).collect();
                    subset_penalty(&weights, &rooms, &subset, required)
                })
                .min_by(f64::total_cmp)
                .unwrap();
            let best_brute = feasible
                .iter()
                .map(|subset| subset_penalty(&weights, &rooms, subset, required))
                .min_by(f64::total_cmp)
                .unwrap();
            assert!(
                best_generated <= best_brute + 1e-9,
                "retained best {best_generated} worse than brute force {best_brute}"
            );
        }
    }

    #[test]
    fn retention_cap_keeps_only_the_best_sets() {
        let rooms = test_rooms(&[40, 60, 80, 100, 120]);
        let exam = test_exam(100, 2, &rooms);
        let capped = generated_sets(&exam, &rooms, Some(2));
        let full = generated_sets(&exam, &rooms, None);
        assert_eq!(capped.len(), 2);
        assert!(full.len() > capped.len());

        let weights = ExamWeights::default();
        let penalty = |p: &ExamPlacement| {
            let subset: Vec<usize> = p.rooms().iter().map(|r| r.index()).collect();
            subset_penalty(&weights, &rooms, &subset, 100)
        };
        let worst_capped = capped.iter().map(|p| penalty(p)).fold(0.0f64, f64::max);
        // Each dropped set must be at least as bad as everything kept.
        for p in &full {
            if !capped.iter().any(|c| c.rooms() == p.rooms()) {
                assert!(penalty(p) >= worst_capped - 1e-9);
            }
        }
    }

    #[test]
    fn zero_max_rooms_yields_period_only_placements() {
        let rooms = test_rooms(&[40]);
        let exam = test_exam(1000, 0, &rooms);
        let placements = generated_sets(&exam, &rooms, None);
        assert_eq!(placements.len(), 1);
        assert!(placements[0].rooms().is_empty());
    }

    #[test]
    fn infeasible_exam_gets_an_empty_domain() {
        let rooms = test_rooms(&[40, 60]);
        let exam = test_exam(500, 2, &rooms);
        assert!(generated_sets(&exam, &rooms, None).is_empty());
    }

    #[test]
    fn unavailable_rooms_are_skipped() {
        let mut rooms = test_rooms(&[120, 100]);
        rooms[0] = Room::new(
            RoomId(0),
            RoomSpec::new(0, "closed", 120, 60),
            vec![false],
            vec![0.0],
        );
        let exam = test_exam(90, 1, &rooms);
        let placements = generated_sets(&exam, &rooms, None);
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].rooms(), &[RoomId(1)]);
    }
}
