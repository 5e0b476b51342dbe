use std::collections::BTreeSet;
use std::io::stdout;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};

use elevator_unit::UnitHandle;
use shared_resources::config::FleetConfig;
use shared_resources::elevator_message::{FleetMessage, PickupOutcome};
use shared_resources::elevator_status::{FleetSnapshot, UnitId};
use shared_resources::error::FleetError;
use shared_resources::passenger::Passenger;

use crate::utilities::debug::Debug;

pub mod aggregator;
pub mod coordinator;

/// Caller side of a running fleet. Requests are validated here, before they
/// reach the coordinator. Dropping the handle shuts the fleet down.
#[derive(Debug)]
pub struct FleetHandle {
    config: FleetConfig,
    inbox: Sender<FleetMessage>,
    thread: Option<JoinHandle<()>>,
}

impl FleetHandle {
    /// Spawns units `1..=num_elevators`, all idle at floor 0, and the
    /// coordinator that owns them.
    pub fn start(config: FleetConfig) -> Result<Self, FleetError> {
        config.validate()?;
        let policy = config.dispatch.moving_pickup_policy;
        let mut units = Vec::with_capacity(config.fleet.num_elevators as usize);
        for id in 1..=config.fleet.num_elevators {
            units.push(elevator_unit::spawn(id, policy)?);
        }
        Self::start_with_units(config, units)
    }

    /// Starts a coordinator over units that are already running.
    pub fn start_with_units(config: FleetConfig, units: Vec<UnitHandle>) -> Result<Self, FleetError> {
        config.validate()?;
        if units.is_empty() {
            return Err(FleetError::EmptyFleet);
        }
        let ids: BTreeSet<UnitId> = units.iter().map(|unit| unit.id()).collect();
        if ids.len() != units.len() {
            return Err(FleetError::InvalidConfig(String::from("unit ids must be distinct")));
        }

        let (inbox_tx, inbox_rx) = unbounded();
        let housekeeping = config.timing.housekeeping();
        let fleet = coordinator::Coordinator::new(&config, units, inbox_tx.clone());
        let thread = thread::Builder::new()
            .name("fleet_coordinator".to_string())
            .spawn(move || coordinator::main(fleet, inbox_rx, housekeeping))?;

        Ok(FleetHandle {
            config,
            inbox: inbox_tx,
            thread: Some(thread),
        })
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    fn send(&self, message: FleetMessage) -> Result<(), FleetError> {
        self.inbox.send(message).map_err(|_| FleetError::Disconnected)
    }

    /// Asks for a snapshot without waiting for it.
    pub fn request_status(&self) -> Result<Receiver<FleetSnapshot>, FleetError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(FleetMessage::SystemStatusRequest { reply_to: reply_tx })?;
        Ok(reply_rx)
    }

    pub fn status(&self) -> Result<FleetSnapshot, FleetError> {
        self.request_status()?.recv().map_err(|_| FleetError::Disconnected)
    }

    pub fn validate_pickup(&self, passenger: &Passenger) -> Result<(), FleetError> {
        if passenger.start_floor == passenger.target_floor {
            return Err(FleetError::InvalidPickup(passenger.start_floor));
        }
        self.config.check_floor(passenger.start_floor)?;
        self.config.check_floor(passenger.target_floor)
    }

    pub fn pickup(&self, passenger: Passenger) -> Result<(), FleetError> {
        self.validate_pickup(&passenger)?;
        self.send(FleetMessage::PickupRequest { passenger, receipt: None })
    }

    /// Like [`FleetHandle::pickup`], with a channel that reports which unit
    /// ended up serving the passenger.
    pub fn pickup_with_receipt(&self, passenger: Passenger) -> Result<Receiver<PickupOutcome>, FleetError> {
        self.validate_pickup(&passenger)?;
        let (receipt_tx, receipt_rx) = bounded(1);
        self.send(FleetMessage::PickupRequest {
            passenger,
            receipt: Some(receipt_tx),
        })?;
        Ok(receipt_rx)
    }

    pub fn tick(&self) -> Result<(), FleetError> {
        self.send(FleetMessage::Tick)
    }

    /// Stops the coordinator and every unit, and waits for their threads.
    pub fn shutdown(mut self) -> Result<(), FleetError> {
        self.send(FleetMessage::Shutdown)?;
        self.join()
    }

    fn join(&mut self) -> Result<(), FleetError> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| FleetError::ThreadPanicked(String::from("fleet_coordinator"))),
            None => Ok(()),
        }
    }
}

impl Drop for FleetHandle {
    fn drop(&mut self) {
        if self.thread.is_none() {
            return;
        }
        debug!("Fleet handle dropped without shutdown, stopping the fleet");
        if self.send(FleetMessage::Shutdown).is_err() {
            debug!("Fleet coordinator already stopped");
        }
        if let Err(e) = self.join() {
            error!("{}", e);
        }
    }
}

pub fn run() -> Result<(), FleetError> {
    let fleet = FleetHandle::start(FleetConfig::get()?)?;
    let tick_period = fleet.config().timing.tick_period();

    let passengers = [
        Passenger::new(0, 5),
        Passenger::new(3, 9),
        Passenger::new(8, 2),
        Passenger::new(4, 7),
        Passenger::new(6, 1),
    ];
    let mut debug = Debug::new(stdout());

    for (step, passenger) in passengers.iter().enumerate() {
        let outcome = fleet.pickup_with_receipt(*passenger)?.recv().map_err(|_| FleetError::Disconnected)?;
        info!("Step {}: {:?} -> {:?}", step, passenger, outcome);
        for _ in 0..3 {
            fleet.tick()?;
            debug.printstatus(&fleet.status()?)?;
            thread::sleep(tick_period);
        }
    }

    loop {
        let snapshot = fleet.status()?;
        debug.printstatus(&snapshot)?;
        if snapshot.statuses.iter().all(|status| status.direction.is_idle()) {
            info!("Fleet at rest: {}", serde_json::to_string(&snapshot)?);
            break;
        }
        fleet.tick()?;
        thread::sleep(tick_period);
    }

    fleet.shutdown()
}
