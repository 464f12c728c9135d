//! Examination periods.

/// Index of a period within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodId(pub usize);

impl PeriodId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A non-overlapping time slot.
///
/// Periods form a total order by (day, time); `prev`/`next` link adjacent
/// periods so back-to-back and same-day checks are O(1). The sequence is
/// built once, in strictly increasing order, and never changes afterwards.
#[derive(Debug, Clone)]
pub struct Period {
    id: PeriodId,
    day: u32,
    time: u32,
    length: u32,
    penalty: f64,
    day_index: usize,
    prev: Option<PeriodId>,
    next: Option<PeriodId>,
}

impl Period {
    pub(crate) fn new(
        id: PeriodId,
        day: u32,
        time: u32,
        length: u32,
        penalty: f64,
        day_index: usize,
        prev: Option<PeriodId>,
    ) -> Self {
        Period {
            id,
            day,
            time,
            length,
            penalty,
            day_index,
            prev,
            next: None,
        }
    }

    pub(crate) fn set_next(&mut self, next: PeriodId) {
        self.next = Some(next);
    }

    #[inline]
    pub fn id(&self) -> PeriodId {
        self.id
    }

    /// Calendar day of this period.
    #[inline]
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Intra-day time index.
    #[inline]
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Length in minutes; an exam fits only into a period at least as long.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Base penalty for using this period.
    #[inline]
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Dense index of this period's day (0 for the first day with periods).
    #[inline]
    pub fn day_index(&self) -> usize {
        self.day_index
    }

    /// The immediately preceding period, if any.
    #[inline]
    pub fn prev(&self) -> Option<PeriodId> {
        self.prev
    }

    /// The immediately following period, if any.
    #[inline]
    pub fn next(&self) -> Option<PeriodId> {
        self.next
    }
}
