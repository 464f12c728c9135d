//! Examination rooms and room groups.

use crate::period::PeriodId;

/// Index of a room within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub usize);

impl RoomId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Room attributes supplied to the builder.
///
/// `available` and `period_penalty` may be omitted, meaning available at
/// every period with zero penalty; when given they must cover every period.
#[derive(Debug, Clone)]
pub struct RoomSpec {
    pub external_id: i64,
    pub name: String,
    /// Normal seating capacity.
    pub size: u32,
    /// Alternative (spaced) seating capacity.
    pub alt_size: u32,
    /// Location used for distance back-to-back penalties.
    pub coordinates: Option<(f64, f64)>,
    pub available: Option<Vec<bool>>,
    pub period_penalty: Option<Vec<f64>>,
}

impl RoomSpec {
    pub fn new(external_id: i64, name: impl Into<String>, size: u32, alt_size: u32) -> Self {
        RoomSpec {
            external_id,
            name: name.into(),
            size,
            alt_size,
            coordinates: None,
            available: None,
            period_penalty: None,
        }
    }
}

/// A schedulable room.
///
/// Rooms double as hard constraints: the assignment context keeps one
/// occupant slot per (room, period), so at most one exam can ever sit in a
/// room in a period.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    external_id: i64,
    name: String,
    size: u32,
    alt_size: u32,
    coordinates: Option<(f64, f64)>,
    available: Vec<bool>,
    period_penalty: Vec<f64>,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        spec: RoomSpec,
        available: Vec<bool>,
        period_penalty: Vec<f64>,
    ) -> Self {
        Room {
            id,
            external_id: spec.external_id,
            name: spec.name,
            size: spec.size,
            alt_size: spec.alt_size,
            coordinates: spec.coordinates,
            available,
            period_penalty,
        }
    }

    #[inline]
    pub fn id(&self) -> RoomId {
        self.id
    }

    #[inline]
    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normal seating capacity.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Alternative (spaced) seating capacity.
    #[inline]
    pub fn alt_size(&self) -> u32 {
        self.alt_size
    }

    /// Capacity under the given seating mode.
    #[inline]
    pub fn usable_size(&self, alt_seating: bool) -> u32 {
        if alt_seating {
            self.alt_size
        } else {
            self.size
        }
    }

    /// True if the room can be used in the given period.
    #[inline]
    pub fn is_available(&self, period: PeriodId) -> bool {
        self.available[period.index()]
    }

    /// Penalty for using the room in the given period.
    #[inline]
    pub fn period_penalty(&self, period: PeriodId) -> f64 {
        self.period_penalty[period.index()]
    }

    /// Euclidean distance to another room; zero when either room has no
    /// coordinates.
    pub fn distance_to(&self, other: &Room) -> f64 {
        match (self.coordinates, other.coordinates) {
            (Some((x1, y1)), Some((x2, y2))) => {
                let dx = x1 - x2;
                let dy = y1 - y2;
                (dx * dx + dy * dy).sqrt()
            }
            _ => 0.0,
        }
    }
}

/// A candidate room for an exam, with an exam-specific usage penalty on top
/// of the room's per-period penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomPlacement {
    pub room: RoomId,
    pub penalty: f64,
}

impl RoomPlacement {
    pub fn new(room: RoomId) -> Self {
        RoomPlacement { room, penalty: 0.0 }
    }

    pub fn with_penalty(room: RoomId, penalty: f64) -> Self {
        RoomPlacement { room, penalty }
    }
}

/// A named set of rooms, used to scope an exam's candidate rooms and for
/// space summaries in reports.
#[derive(Debug, Clone)]
pub struct RoomGroup {
    name: String,
    rooms: Vec<RoomId>,
}

impl RoomGroup {
    pub(crate) fn new(name: String, rooms: Vec<RoomId>) -> Self {
        RoomGroup { name, rooms }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn rooms(&self) -> &[RoomId] {
        &self.rooms
    }
}
