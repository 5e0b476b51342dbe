use std::collections::BTreeMap;

use super::direction::Direction;

pub type UnitId = u32;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevatorStatus {
    pub id: UnitId,
    pub direction: Direction,
}

/// Statuses gathered by one status query, ordered by unit id.
///
/// `missing` lists the units that did not answer before the query deadline.
/// A snapshot with missing units is still usable, but callers must not
/// assume it covers the whole fleet.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FleetSnapshot {
    pub statuses: Vec<ElevatorStatus>,
    pub missing: Vec<UnitId>,
}

impl FleetSnapshot {
    pub fn new(replies: BTreeMap<UnitId, ElevatorStatus>, mut missing: Vec<UnitId>) -> Self {
        missing.sort_unstable();
        missing.dedup();
        FleetSnapshot {
            statuses: replies.into_values().collect(),
            missing,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&ElevatorStatus> {
        self.statuses.iter().find(|status| status.id == id)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
