/// ----- COORDINATOR MODULE -----
/// This module owns the elevator units. Status queries and pickups are
/// answered from a fresh snapshot collected by a status aggregator; pickups
/// are then handed to the unit chosen by the selection algorithm, and handed
/// on to the next candidate if that unit refuses or stays silent. A silent
/// unit has the ticket withdrawn so it cannot serve it late. Ticks are
/// broadcast to every unit, one epoch at a time when ticks are serialized.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver, Sender};
use log::{debug, error, info, warn};

use elevator_unit::{UnitAddress, UnitHandle};
use shared_resources::config::FleetConfig;
use shared_resources::elevator_message::{FleetMessage, PickupOutcome, UnitMessage};
use shared_resources::elevator_status::{FleetSnapshot, UnitId};
use shared_resources::passenger::{Passenger, PickupTicket};

use super::aggregator::{self, ReplyTo};
use crate::utilities::selection::select_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchStage {
    Querying,
    Awaiting { unit: UnitId, deadline: Instant },
}

#[derive(Debug)]
struct Dispatch {
    ticket: PickupTicket,
    receipt: Option<Sender<PickupOutcome>>,
    refused: BTreeSet<UnitId>,
    stage: DispatchStage,
}

#[derive(Debug)]
struct OpenTick {
    epoch: u64,
    outstanding: BTreeSet<UnitId>,
    deadline: Instant,
}

pub struct Coordinator {
    units: Vec<UnitHandle>,
    addresses: Vec<UnitAddress>,
    inbox_tx: Sender<FleetMessage>,
    status_timeout: Duration,
    serialize_ticks: bool,
    next_ticket: u64,
    dispatches: HashMap<u64, Dispatch>,
    epoch: u64,
    open_tick: Option<OpenTick>,
    backlog: VecDeque<FleetMessage>,
}

impl Coordinator {
    /// `units` must have distinct ids.
    pub fn new(config: &FleetConfig, mut units: Vec<UnitHandle>, inbox_tx: Sender<FleetMessage>) -> Self {
        units.sort_by_key(|unit| unit.id());
        let addresses = units.iter().map(|unit| unit.address()).collect();
        Coordinator {
            units,
            addresses,
            inbox_tx,
            status_timeout: config.timing.status_timeout(),
            serialize_ticks: config.dispatch.serialize_ticks,
            next_ticket: 0,
            dispatches: HashMap::new(),
            epoch: 0,
            open_tick: None,
            backlog: VecDeque::new(),
        }
    }

    fn is_busy(&self) -> bool {
        !self.dispatches.is_empty() || (self.serialize_ticks && self.open_tick.is_some())
    }

    fn handle(&mut self, message: FleetMessage) -> Flow {
        if message.is_external() && self.is_busy() {
            self.backlog.push_back(message);
            return Flow::Continue;
        }
        match message {
            FleetMessage::SystemStatusRequest { reply_to } => {
                self.query(ReplyTo::Caller(reply_to), &self.addresses);
            },
            FleetMessage::PickupRequest { passenger, receipt } => self.start_dispatch(passenger, receipt),
            FleetMessage::Tick => self.broadcast_tick(),
            FleetMessage::Shutdown => return Flow::Stop,
            FleetMessage::PickupStatus { ticket, snapshot } => self.on_pickup_status(ticket, snapshot),
            FleetMessage::PickupAnswered { ticket, unit, accepted } => {
                self.on_pickup_answered(ticket, unit, accepted)
            },
            FleetMessage::TickApplied { epoch, unit } => self.on_tick_applied(epoch, unit),
        }
        Flow::Continue
    }

    fn drain_backlog(&mut self) -> Flow {
        while !self.is_busy() {
            let Some(message) = self.backlog.pop_front() else {
                break;
            };
            if self.handle(message) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Returns false if no aggregator could be started.
    fn query(&self, reply_to: ReplyTo, units: &[UnitAddress]) -> bool {
        match aggregator::spawn(units, reply_to, self.status_timeout) {
            Ok(_) => true,
            Err(e) => {
                error!("Could not start status aggregator: {}", e);
                false
            },
        }
    }

    fn start_dispatch(&mut self, passenger: Passenger, receipt: Option<Sender<PickupOutcome>>) {
        self.next_ticket += 1;
        let ticket = PickupTicket { id: self.next_ticket, passenger };
        info!("Pickup {} requested for {:?}", ticket.id, passenger);
        self.dispatches.insert(
            ticket.id,
            Dispatch {
                ticket,
                receipt,
                refused: BTreeSet::new(),
                stage: DispatchStage::Querying,
            },
        );
        self.requery(ticket.id);
    }

    /// Collects a fresh snapshot of every unit that has not refused the ticket.
    fn requery(&mut self, ticket_id: u64) {
        let Some(dispatch) = self.dispatches.get_mut(&ticket_id) else {
            return;
        };
        let candidates: Vec<UnitAddress> = self
            .addresses
            .iter()
            .filter(|address| !dispatch.refused.contains(&address.id))
            .cloned()
            .collect();
        if candidates.is_empty() {
            error!("Pickup {} refused by every unit", ticket_id);
            self.finish(ticket_id, PickupOutcome::Unassigned);
            return;
        }
        dispatch.stage = DispatchStage::Querying;
        let reply_to = ReplyTo::Coordinator {
            inbox: self.inbox_tx.clone(),
            ticket: dispatch.ticket,
        };
        if !self.query(reply_to, &candidates) {
            self.finish(ticket_id, PickupOutcome::Unassigned);
        }
    }

    fn on_pickup_status(&mut self, ticket: PickupTicket, snapshot: FleetSnapshot) {
        let Some(dispatch) = self.dispatches.get_mut(&ticket.id) else {
            warn!("Ignoring snapshot for unknown pickup {}", ticket.id);
            return;
        };
        if dispatch.stage != DispatchStage::Querying {
            warn!("Ignoring late snapshot for pickup {}", ticket.id);
            return;
        }
        if !snapshot.is_complete() {
            warn!("Dispatching pickup {} without units {:?}", ticket.id, snapshot.missing);
        }

        let Some(selection) = select_unit(&snapshot, &ticket.passenger, &dispatch.refused) else {
            error!("No unit available for pickup {} ({:?})", ticket.id, ticket.passenger);
            self.finish(ticket.id, PickupOutcome::Unassigned);
            return;
        };
        info!(
            "Pickup {} goes to unit {} ({:?}, {} floors away)",
            ticket.id, selection.unit, selection.tier, selection.distance
        );

        let assignment = UnitMessage::Pickup {
            ticket,
            reply_to: self.inbox_tx.clone(),
        };
        let sent = self
            .addresses
            .iter()
            .find(|address| address.id == selection.unit)
            .map_or(false, |address| address.inbox.send(assignment).is_ok());
        if sent {
            dispatch.stage = DispatchStage::Awaiting {
                unit: selection.unit,
                deadline: Instant::now() + self.status_timeout,
            };
        } else {
            warn!("Unit {} is not running, reassigning pickup {}", selection.unit, ticket.id);
            dispatch.refused.insert(selection.unit);
            self.requery(ticket.id);
        }
    }

    fn on_pickup_answered(&mut self, ticket: PickupTicket, unit: UnitId, accepted: bool) {
        let Some(dispatch) = self.dispatches.get_mut(&ticket.id) else {
            if accepted {
                warn!("Unit {} accepted pickup {} after it was settled elsewhere", unit, ticket.id);
            }
            return;
        };
        match dispatch.stage {
            DispatchStage::Awaiting { unit: expected, .. } if expected == unit => {},
            _ => {
                warn!("Ignoring answer from unit {} for pickup {}", unit, ticket.id);
                return;
            },
        }
        if accepted {
            self.finish(ticket.id, PickupOutcome::Assigned(unit));
        } else {
            info!("Unit {} refused pickup {}, reassigning", unit, ticket.id);
            dispatch.refused.insert(unit);
            self.requery(ticket.id);
        }
    }

    /// Takes the ticket back from a unit that may still act on it late.
    fn withdraw(&self, unit: UnitId, ticket: PickupTicket) {
        let sent = self
            .addresses
            .iter()
            .find(|address| address.id == unit)
            .map_or(false, |address| address.inbox.send(UnitMessage::Withdraw { ticket }).is_ok());
        if !sent {
            debug!("Unit {} is not running, nothing to withdraw for pickup {}", unit, ticket.id);
        }
    }

    fn finish(&mut self, ticket_id: u64, outcome: PickupOutcome) {
        let Some(dispatch) = self.dispatches.remove(&ticket_id) else {
            return;
        };
        debug!("Pickup {} settled: {:?}", ticket_id, outcome);
        if let Some(receipt) = dispatch.receipt {
            if receipt.send(outcome).is_err() {
                debug!("Receipt for pickup {} was dropped", ticket_id);
            }
        }
    }

    fn broadcast_tick(&mut self) {
        self.epoch += 1;
        if let Some(previous) = &self.open_tick {
            debug!("Tick {} still unacknowledged by {:?}", previous.epoch, previous.outstanding);
        }
        let mut outstanding = BTreeSet::new();
        for address in &self.addresses {
            let message = UnitMessage::Tick {
                epoch: self.epoch,
                ack: self.inbox_tx.clone(),
            };
            if address.inbox.send(message).is_ok() {
                outstanding.insert(address.id);
            } else {
                warn!("Unit {} is not running, skipping tick {}", address.id, self.epoch);
            }
        }
        self.open_tick = if outstanding.is_empty() {
            None
        } else {
            Some(OpenTick {
                epoch: self.epoch,
                outstanding,
                deadline: Instant::now() + self.status_timeout,
            })
        };
    }

    fn on_tick_applied(&mut self, epoch: u64, unit: UnitId) {
        let Some(open_tick) = self.open_tick.as_mut() else {
            debug!("Late tick {} ack from unit {}", epoch, unit);
            return;
        };
        if open_tick.epoch != epoch {
            debug!("Late tick {} ack from unit {}", epoch, unit);
            return;
        }
        open_tick.outstanding.remove(&unit);
        if open_tick.outstanding.is_empty() {
            debug!("Tick {} applied by every unit", epoch);
            self.open_tick = None;
        }
    }

    /// Gives up on units that missed their deadline.
    fn expire(&mut self, now: Instant) {
        let overdue: Vec<(u64, UnitId)> = self
            .dispatches
            .values()
            .filter_map(|dispatch| match dispatch.stage {
                DispatchStage::Awaiting { unit, deadline } if deadline <= now => Some((dispatch.ticket.id, unit)),
                _ => None,
            })
            .collect();
        for (ticket_id, unit) in overdue {
            warn!("Unit {} did not answer pickup {}, reassigning", unit, ticket_id);
            if let Some(dispatch) = self.dispatches.get_mut(&ticket_id) {
                dispatch.refused.insert(unit);
                let ticket = dispatch.ticket;
                self.withdraw(unit, ticket);
            }
            self.requery(ticket_id);
        }

        let tick_overdue = self.open_tick.as_ref().map_or(false, |open_tick| open_tick.deadline <= now);
        if tick_overdue {
            if let Some(open_tick) = self.open_tick.take() {
                warn!("Tick {} not acknowledged by {:?}, moving on", open_tick.epoch, open_tick.outstanding);
            }
        }
    }

    fn shutdown(self) {
        info!("Shutting down {} elevator units", self.units.len());
        for dispatch in self.dispatches.into_values() {
            if let Some(receipt) = dispatch.receipt {
                if receipt.send(PickupOutcome::Unassigned).is_err() {
                    debug!("Receipt for pickup {} was dropped", dispatch.ticket.id);
                }
            }
        }
        for address in &self.addresses {
            if address.inbox.send(UnitMessage::Shutdown).is_err() {
                debug!("Unit {} already stopped", address.id);
            }
        }
        for unit in self.units {
            if let Err(e) = unit.join() {
                error!("{}", e);
            }
        }
    }
}

pub fn main(mut coordinator: Coordinator, inbox: Receiver<FleetMessage>, housekeeping: Duration) {
    let timer = tick(housekeeping);
    info!("Fleet coordinator started with {} units", coordinator.addresses.len());

    loop {
        let mut flow = Flow::Continue;
        select! {
            recv(inbox) -> msg => {
                flow = match msg {
                    Ok(message) => coordinator.handle(message),
                    Err(_) => Flow::Stop,
                };
            },
            recv(timer) -> _ => {
                coordinator.expire(Instant::now());
            },
        }
        if flow == Flow::Stop || coordinator.drain_backlog() == Flow::Stop {
            break;
        }
    }

    coordinator.shutdown();
    info!("Fleet coordinator stopped");
}
