/// ----- FSM MODULE -----
/// This module runs the state machine of one elevator unit. It receives
/// status queries, pickup assignments and ticks from its inbox, one at a
/// time and in delivery order, and answers whoever asked.

use crossbeam_channel::Receiver;
use log::{debug, info, warn};

use shared_resources::elevator_message::{FleetMessage, UnitMessage};

use crate::utilities::car::{Car, PickupDecision};

pub fn main(mut car: Car, inbox: Receiver<UnitMessage>) {
    let id = car.id();
    info!("Elevator unit {} started at {:?}", id, car.direction());

    while let Ok(message) = inbox.recv() {
        match message {
            UnitMessage::StatusRequest { reply_to } => {
                if reply_to.send(car.status()).is_err() {
                    debug!("Unit {}: status requester went away", id);
                }
            },
            UnitMessage::Pickup { ticket, reply_to } => {
                let decision = car.assign(&ticket);
                match decision {
                    PickupDecision::Accepted => {
                        debug!("Unit {} accepted {:?}, now {:?}", id, ticket.passenger, car.direction());
                    },
                    PickupDecision::Rejected => {
                        warn!(
                            "Unit {} rejected {:?} while {:?}",
                            id, ticket.passenger, car.direction()
                        );
                    },
                }
                let answer = FleetMessage::PickupAnswered {
                    ticket,
                    unit: id,
                    accepted: decision == PickupDecision::Accepted,
                };
                if reply_to.send(answer).is_err() {
                    warn!("Unit {}: coordinator went away before pickup answer", id);
                }
            },
            UnitMessage::Tick { epoch, ack } => {
                if car.tick(epoch) {
                    debug!("Unit {} tick {} -> {:?}", id, epoch, car.direction());
                } else {
                    debug!("Unit {} ignored repeated tick {}", id, epoch);
                }
                if ack.send(FleetMessage::TickApplied { epoch, unit: id }).is_err() {
                    debug!("Unit {}: coordinator went away before tick ack", id);
                }
            },
            UnitMessage::Withdraw { ticket } => {
                if car.withdraw(ticket.id) {
                    info!("Unit {} dropped pickup {}, stopped at {:?}", id, ticket.id, car.direction());
                } else {
                    debug!("Unit {} has no run of its own for pickup {}", id, ticket.id);
                }
            },
            UnitMessage::Shutdown => break,
        }
    }

    info!("Elevator unit {} stopped at {:?}", id, car.direction());
}
