/// ----- STATUS AGGREGATOR MODULE -----
/// Short-lived thread that asks a fixed set of units for their status and
/// hands the collected snapshot to whoever asked for it. It gives up on
/// silent units once its deadline passes and always terminates after
/// delivering exactly one snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{after, select, unbounded, Receiver, Sender};
use log::{debug, warn};

use elevator_unit::UnitAddress;
use shared_resources::elevator_message::{FleetMessage, UnitMessage};
use shared_resources::elevator_status::{ElevatorStatus, FleetSnapshot, UnitId};
use shared_resources::error::FleetError;
use shared_resources::passenger::PickupTicket;

/// Who receives the snapshot, and in which form.
#[derive(Debug, Clone)]
pub enum ReplyTo {
    /// Plain status query, answered directly to the caller.
    Caller(Sender<FleetSnapshot>),
    /// Part of a pickup dispatch, answered to the coordinator.
    Coordinator {
        inbox: Sender<FleetMessage>,
        ticket: PickupTicket,
    },
}

/// Sends the status query to every unit right away, from the calling
/// thread, so it is ordered before anything the caller sends afterwards.
/// Replies are joined on a new thread.
pub fn spawn(
    units: &[UnitAddress],
    reply_to: ReplyTo,
    timeout: Duration,
) -> Result<JoinHandle<()>, FleetError> {
    let (status_tx, status_rx) = unbounded::<ElevatorStatus>();
    let mut waiting: BTreeSet<UnitId> = BTreeSet::new();
    let mut missing: Vec<UnitId> = Vec::new();
    for unit in units {
        let request = UnitMessage::StatusRequest { reply_to: status_tx.clone() };
        if unit.inbox.send(request).is_ok() {
            waiting.insert(unit.id);
        } else {
            warn!("Unit {} is not running, leaving it out of the snapshot", unit.id);
            missing.push(unit.id);
        }
    }
    // only the units hold reply senders now, so a dead fleet disconnects the channel
    drop(status_tx);
    let deadline = after(timeout);

    let handle = thread::Builder::new()
        .name("status_aggregator".to_string())
        .spawn(move || {
            let snapshot = collect(status_rx, waiting, missing, deadline, timeout);
            deliver(reply_to, snapshot);
        })?;
    Ok(handle)
}

fn collect(
    status_rx: Receiver<ElevatorStatus>,
    mut waiting: BTreeSet<UnitId>,
    mut missing: Vec<UnitId>,
    deadline: Receiver<Instant>,
    timeout: Duration,
) -> FleetSnapshot {
    let mut replies: BTreeMap<UnitId, ElevatorStatus> = BTreeMap::new();
    while !waiting.is_empty() {
        select! {
            recv(status_rx) -> msg => {
                let status = match msg {
                    Ok(status) => status,
                    Err(_) => break,
                };
                if waiting.remove(&status.id) {
                    replies.insert(status.id, status);
                } else if replies.contains_key(&status.id) {
                    warn!("Ignoring duplicate status from unit {}", status.id);
                } else {
                    warn!("Ignoring status from unit {} which was not asked", status.id);
                }
            },
            recv(deadline) -> _ => {
                warn!("Status query timed out after {:?}, no answer from {:?}", timeout, waiting);
                break;
            },
        }
    }
    missing.extend(waiting);

    FleetSnapshot::new(replies, missing)
}

fn deliver(reply_to: ReplyTo, snapshot: FleetSnapshot) {
    match reply_to {
        ReplyTo::Caller(caller) => {
            if caller.send(snapshot).is_err() {
                debug!("Status caller went away before the snapshot was ready");
            }
        },
        ReplyTo::Coordinator { inbox, ticket } => {
            if inbox.send(FleetMessage::PickupStatus { ticket, snapshot }).is_err() {
                warn!("Coordinator went away before the snapshot for ticket {} was ready", ticket.id);
            }
        },
    }
}
