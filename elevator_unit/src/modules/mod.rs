use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

use shared_resources::config::MovingPickupPolicy;
use shared_resources::direction::Direction;
use shared_resources::elevator_message::UnitMessage;
use shared_resources::elevator_status::UnitId;
use shared_resources::error::FleetError;

use crate::utilities::car::Car;

mod fsm;

/// Where to send messages for one unit. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UnitAddress {
    pub id: UnitId,
    pub inbox: Sender<UnitMessage>,
}

/// A running unit thread.
#[derive(Debug)]
pub struct UnitHandle {
    address: UnitAddress,
    thread: JoinHandle<()>,
}

impl UnitHandle {
    /// Adopts a unit thread started elsewhere. The thread must end once it
    /// receives `UnitMessage::Shutdown`.
    pub fn new(address: UnitAddress, thread: JoinHandle<()>) -> Self {
        UnitHandle { address, thread }
    }

    pub fn id(&self) -> UnitId {
        self.address.id
    }

    pub fn address(&self) -> UnitAddress {
        self.address.clone()
    }

    pub fn join(self) -> Result<(), FleetError> {
        let name = format!("elevator_unit_{}", self.address.id);
        self.thread.join().map_err(|_| FleetError::ThreadPanicked(name))
    }
}

pub fn spawn(id: UnitId, policy: MovingPickupPolicy) -> Result<UnitHandle, FleetError> {
    spawn_at(id, Direction::default(), policy)
}

pub fn spawn_at(id: UnitId, direction: Direction, policy: MovingPickupPolicy) -> Result<UnitHandle, FleetError> {
    let (inbox_tx, inbox_rx) = unbounded();
    let car = Car::with_direction(id, direction, policy);
    let thread = thread::Builder::new()
        .name(format!("elevator_unit_{}", id))
        .spawn(move || fsm::main(car, inbox_rx))?;
    Ok(UnitHandle {
        address: UnitAddress { id, inbox: inbox_tx },
        thread,
    })
}
