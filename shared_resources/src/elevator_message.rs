use crossbeam_channel::Sender;

use super::elevator_status::{ElevatorStatus, FleetSnapshot, UnitId};
use super::passenger::{Passenger, PickupTicket};

/// Final answer to a pickup request.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupOutcome {
    Assigned(UnitId),
    Unassigned,
}

/// Inbox of a single elevator unit.
#[derive(Debug, Clone)]
pub enum UnitMessage {
    StatusRequest {
        reply_to: Sender<ElevatorStatus>,
    },
    Pickup {
        ticket: PickupTicket,
        reply_to: Sender<FleetMessage>,
    },
    Tick {
        epoch: u64,
        ack: Sender<FleetMessage>,
    },
    /// The coordinator gave the ticket to another unit.
    Withdraw {
        ticket: PickupTicket,
    },
    Shutdown,
}

/// Inbox of the fleet coordinator. The first four variants come from
/// callers, the rest from the coordinator's own collaborators.
#[derive(Debug, Clone)]
pub enum FleetMessage {
    SystemStatusRequest {
        reply_to: Sender<FleetSnapshot>,
    },
    PickupRequest {
        passenger: Passenger,
        receipt: Option<Sender<PickupOutcome>>,
    },
    Tick,
    Shutdown,
    PickupStatus {
        ticket: PickupTicket,
        snapshot: FleetSnapshot,
    },
    PickupAnswered {
        ticket: PickupTicket,
        unit: UnitId,
        accepted: bool,
    },
    TickApplied {
        epoch: u64,
        unit: UnitId,
    },
}

impl FleetMessage {
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            FleetMessage::SystemStatusRequest { .. }
                | FleetMessage::PickupRequest { .. }
                | FleetMessage::Tick
                | FleetMessage::Shutdown
        )
    }
}
