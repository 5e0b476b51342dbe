use super::direction::{Floor, TravelDirection};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Passenger {
    pub start_floor: Floor,
    pub target_floor: Floor,
}

impl Passenger {
    pub fn new(start_floor: Floor, target_floor: Floor) -> Self {
        Passenger {
            start_floor,
            target_floor,
        }
    }

    pub fn travel_direction(&self) -> Option<TravelDirection> {
        TravelDirection::between(self.start_floor, self.target_floor)
    }
}

/// A passenger tagged with the dispatch it belongs to.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickupTicket {
    pub id: u64,
    pub passenger: Passenger,
}
