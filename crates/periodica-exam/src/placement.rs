//! Placement values: a period plus a set of rooms.

use periodica_core::{Value, VariableId};
use smallvec::SmallVec;

use crate::period::PeriodId;
use crate::room::RoomId;

/// One candidate assignment of an exam: a period and the rooms seating it.
///
/// Immutable once constructed; the aggregate room attributes (total usable
/// size, room penalty, split distance) are precomputed so cost functions
/// never walk the room list. Equality is structural over (exam, period,
/// rooms); the derived attributes follow from those. Rooms are kept sorted
/// by id so equal sets always compare equal.
#[derive(Debug, Clone)]
pub struct ExamPlacement {
    exam: VariableId,
    period: PeriodId,
    rooms: SmallVec<[RoomId; 4]>,
    size: u32,
    room_penalty: f64,
    room_split_distance: f64,
}

impl ExamPlacement {
    pub(crate) fn new(
        exam: VariableId,
        period: PeriodId,
        mut rooms: SmallVec<[RoomId; 4]>,
        size: u32,
        room_penalty: f64,
        room_split_distance: f64,
    ) -> Self {
        rooms.sort_unstable();
        ExamPlacement {
            exam,
            period,
            rooms,
            size,
            room_penalty,
            room_split_distance,
        }
    }

    /// The exam this placement assigns.
    #[inline]
    pub fn exam(&self) -> VariableId {
        self.exam
    }

    /// Assigned period.
    #[inline]
    pub fn period(&self) -> PeriodId {
        self.period
    }

    /// Assigned rooms, sorted by id; empty when the exam needs no room.
    #[inline]
    pub fn rooms(&self) -> &[RoomId] {
        &self.rooms
    }

    /// True if the placement uses the given room.
    #[inline]
    pub fn uses_room(&self, room: RoomId) -> bool {
        self.rooms.contains(&room)
    }

    /// Total usable size of the assigned rooms.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Sum of the room usage penalties at the assigned period.
    #[inline]
    pub fn room_penalty(&self) -> f64 {
        self.room_penalty
    }

    /// Average distance between the assigned rooms; zero for one room.
    #[inline]
    pub fn room_split_distance(&self) -> f64 {
        self.room_split_distance
    }

    /// Penalty for splitting the exam into `k` rooms: 0 for at most one
    /// room, otherwise 2^(k-2).
    #[inline]
    pub fn room_split_penalty(&self) -> u32 {
        room_split_penalty(self.rooms.len())
    }
}

/// Split penalty for a set of `k` rooms.
#[inline]
pub(crate) fn room_split_penalty(k: usize) -> u32 {
    if k <= 1 {
        0
    } else {
        1 << (k - 2)
    }
}

impl PartialEq for ExamPlacement {
    fn eq(&self, other: &Self) -> bool {
        self.exam == other.exam && self.period == other.period && self.rooms == other.rooms
    }
}

impl Value for ExamPlacement {
    fn variable(&self) -> VariableId {
        self.exam
    }
}

impl std::fmt::Display for ExamPlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@p{}", self.exam, self.period.index())?;
        for (i, room) in self.rooms.iter().enumerate() {
            write!(f, "{}r{}", if i == 0 { " " } else { "," }, room.index())?;
        }
        Ok(())
    }
}
