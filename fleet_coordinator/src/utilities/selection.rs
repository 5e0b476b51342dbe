/// ----- SELECTION -----
/// Stateless choice of the unit that should serve a passenger, based on one
/// fleet snapshot. Idle cars are preferred, then cars already heading past
/// the pickup floor in the passenger's direction, then whatever car is
/// closest. Equal distances go to the lowest unit id.

use std::collections::BTreeSet;

use shared_resources::direction::Floor;
use shared_resources::elevator_status::{ElevatorStatus, FleetSnapshot, UnitId};
use shared_resources::passenger::Passenger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    Idle,
    OnTheWay,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub unit: UnitId,
    pub tier: SelectionTier,
    pub distance: u32,
}

pub fn select_unit(
    snapshot: &FleetSnapshot,
    passenger: &Passenger,
    excluded: &BTreeSet<UnitId>,
) -> Option<Selection> {
    let pickup_floor = passenger.start_floor;

    let idle = nearest(
        candidates(snapshot, excluded).filter(|status| status.direction.is_idle()),
        pickup_floor,
    );
    if let Some(selection) = idle {
        return Some(selection.with_tier(SelectionTier::Idle));
    }

    if let Some(travel) = passenger.travel_direction() {
        let on_the_way = nearest(
            candidates(snapshot, excluded)
                .filter(|status| status.direction.is_on_the_way(pickup_floor, travel)),
            pickup_floor,
        );
        if let Some(selection) = on_the_way {
            return Some(selection.with_tier(SelectionTier::OnTheWay));
        }
    }

    nearest(candidates(snapshot, excluded), pickup_floor)
        .map(|selection| selection.with_tier(SelectionTier::Nearest))
}

fn candidates<'a>(
    snapshot: &'a FleetSnapshot,
    excluded: &'a BTreeSet<UnitId>,
) -> impl Iterator<Item = &'a ElevatorStatus> + 'a {
    snapshot
        .statuses
        .iter()
        .filter(move |status| !excluded.contains(&status.id))
}

fn nearest<'a>(statuses: impl Iterator<Item = &'a ElevatorStatus>, floor: Floor) -> Option<Selection> {
    statuses
        .map(|status| (status.direction.distance_to(floor), status.id))
        .min()
        .map(|(distance, unit)| Selection {
            unit,
            tier: SelectionTier::Nearest,
            distance,
        })
}

impl Selection {
    fn with_tier(self, tier: SelectionTier) -> Self {
        Selection { tier, ..self }
    }
}
