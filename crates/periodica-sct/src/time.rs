//! Meeting times.

use serde::{Deserialize, Serialize};

/// A weekly meeting time: a day-of-week bitmask plus a start slot and a
/// length in slots.
///
/// Slots are opaque to this crate; callers typically use five-minute slots
/// so a day has 288 of them, but any consistent granularity works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeLocation {
    /// Day-of-week bitmask, bit 0 = Monday.
    pub days: u8,
    /// First occupied slot of the day.
    pub start: u32,
    /// Number of occupied slots.
    pub length: u32,
}

impl TimeLocation {
    pub fn new(days: u8, start: u32, length: u32) -> Self {
        TimeLocation { days, start, length }
    }

    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.length
    }

    /// True if the two times share at least one day of the week.
    #[inline]
    pub fn shares_days(&self, other: &TimeLocation) -> bool {
        self.days & other.days != 0
    }

    /// Number of days of the week both times meet on.
    pub fn shared_days(&self, other: &TimeLocation) -> u32 {
        (self.days & other.days).count_ones()
    }

    /// Number of slots of the day both times occupy, ignoring days.
    pub fn shared_slots(&self, other: &TimeLocation) -> u32 {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        end.saturating_sub(start)
    }

    /// True if the times meet on a common day and their slot ranges
    /// intersect.
    pub fn overlaps(&self, other: &TimeLocation) -> bool {
        self.shares_days(other) && self.start < other.end() && other.start < self.end()
    }

    /// Total day-by-slot overlap between the two times, the unit used by
    /// the overlap penalty tiers.
    pub fn overlap_slots(&self, other: &TimeLocation) -> u32 {
        if self.overlaps(other) {
            self.shared_days(other) * self.shared_slots(other)
        } else {
            0
        }
    }

    /// True if `other` starts on a shared day exactly where this time ends.
    pub fn is_back_to_back(&self, other: &TimeLocation) -> bool {
        self.shares_days(other) && (self.end() == other.start || other.end() == self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_requires_a_shared_day_and_shared_slots() {
        let mon_morning = TimeLocation::new(0b0000_0001, 10, 12);
        let tue_morning = TimeLocation::new(0b0000_0010, 10, 12);
        let mon_afternoon = TimeLocation::new(0b0000_0001, 22, 12);
        let mon_wed = TimeLocation::new(0b0000_0101, 15, 6);

        assert!(!mon_morning.overlaps(&tue_morning));
        assert!(!mon_morning.overlaps(&mon_afternoon));
        assert!(mon_morning.overlaps(&mon_wed));
        assert_eq!(mon_morning.overlap_slots(&mon_wed), 6);
        assert_eq!(mon_wed.shared_days(&mon_morning), 1);
    }

    #[test]
    fn back_to_back_means_touching_on_a_shared_day() {
        let first = TimeLocation::new(0b0001_1111, 10, 12);
        let second = TimeLocation::new(0b0000_0001, 22, 12);
        let gap = TimeLocation::new(0b0000_0001, 40, 12);
        assert!(first.is_back_to_back(&second));
        assert!(second.is_back_to_back(&first));
        assert!(!first.is_back_to_back(&gap));
        assert!(!first.overlaps(&second));
    }
}
