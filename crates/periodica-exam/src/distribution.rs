//! Distribution constraints between exams.

use std::str::FromStr;

use periodica_core::VariableId;

use crate::error::ModelError;
use crate::period::Period;
use crate::placement::ExamPlacement;

/// Index of a distribution constraint within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistributionId(pub usize);

impl DistributionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of a binary distribution rule between exams.
///
/// Ordered kinds (`Precedence`, `PrecedenceRev`) follow the order in which
/// the exams appear in the constraint's member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionType {
    SameRoom,
    DifferentRoom,
    SamePeriod,
    DifferentPeriod,
    Precedence,
    PrecedenceRev,
    SameDay,
    DifferentDay,
}

impl DistributionType {
    /// True if satisfaction depends on the assigned periods.
    pub fn is_period_related(self) -> bool {
        !matches!(self, DistributionType::SameRoom | DistributionType::DifferentRoom)
    }

    /// True if satisfaction depends on the assigned rooms.
    pub fn is_room_related(self) -> bool {
        matches!(self, DistributionType::SameRoom | DistributionType::DifferentRoom)
    }
}

impl FromStr for DistributionType {
    type Err = ModelError;

    fn from_str(name: &str) -> Result<Self, ModelError> {
        match name {
            "same-room" => Ok(DistributionType::SameRoom),
            "different-room" => Ok(DistributionType::DifferentRoom),
            "same-period" => Ok(DistributionType::SamePeriod),
            "different-period" => Ok(DistributionType::DifferentPeriod),
            "precedence" => Ok(DistributionType::Precedence),
            "precedence-rev" => Ok(DistributionType::PrecedenceRev),
            "same-day" => Ok(DistributionType::SameDay),
            "different-day" => Ok(DistributionType::DifferentDay),
            other => Err(ModelError::UnknownDistributionType(other.to_owned())),
        }
    }
}

/// A distribution constraint over an ordered list of exams.
///
/// Hard constraints forbid violating placements outright; soft constraints
/// contribute their weight to the objective while violated.
#[derive(Debug, Clone)]
pub struct Distribution {
    id: DistributionId,
    kind: DistributionType,
    hard: bool,
    weight: f64,
    exams: Vec<VariableId>,
}

impl Distribution {
    pub(crate) fn new(
        id: DistributionId,
        kind: DistributionType,
        hard: bool,
        weight: f64,
        exams: Vec<VariableId>,
    ) -> Self {
        Distribution {
            id,
            kind,
            hard,
            weight,
            exams,
        }
    }

    #[inline]
    pub fn id(&self) -> DistributionId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> DistributionType {
        self.kind
    }

    #[inline]
    pub fn is_hard(&self) -> bool {
        self.hard
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Member exams, in constraint order.
    #[inline]
    pub fn exams(&self) -> &[VariableId] {
        &self.exams
    }

    /// Position of an exam in the member list, if it belongs.
    pub fn position_of(&self, exam: VariableId) -> Option<usize> {
        self.exams.iter().position(|&x| x == exam)
    }

    /// Checks an ordered pair of placements: `first` belongs to an exam
    /// listed before `second`'s exam.
    ///
    /// `SameRoom` accepts one room set being a superset of the other, so a
    /// split exam can share a room with a single-room exam.
    pub fn check_pair(&self, periods: &[Period], first: &ExamPlacement, second: &ExamPlacement) -> bool {
        let p1 = &periods[first.period().index()];
        let p2 = &periods[second.period().index()];
        match self.kind {
            DistributionType::SamePeriod => p1.id() == p2.id(),
            DistributionType::DifferentPeriod => p1.id() != p2.id(),
            DistributionType::Precedence => p1.id() < p2.id(),
            DistributionType::PrecedenceRev => p1.id() > p2.id(),
            DistributionType::SameDay => p1.day() == p2.day(),
            DistributionType::DifferentDay => p1.day() != p2.day(),
            DistributionType::SameRoom => {
                let contains = |outer: &ExamPlacement, inner: &ExamPlacement| {
                    inner.rooms().iter().all(|r| outer.rooms().contains(r))
                };
                contains(first, second) || contains(second, first)
            }
            DistributionType::DifferentRoom => {
                first.rooms().iter().all(|r| !second.rooms().contains(r))
            }
        }
    }
}
