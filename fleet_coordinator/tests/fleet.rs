use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Sender};

use elevator_unit::{UnitAddress, UnitHandle};
use fleet_coordinator::FleetHandle;
use shared_resources::config::{FleetConfig, MovingPickupPolicy};
use shared_resources::direction::Direction;
use shared_resources::elevator_message::{PickupOutcome, UnitMessage};
use shared_resources::elevator_status::{ElevatorStatus, FleetSnapshot, UnitId};
use shared_resources::error::FleetError;
use shared_resources::passenger::Passenger;

const WAIT: Duration = Duration::from_secs(5);

fn assign(fleet: &FleetHandle, passenger: Passenger) -> PickupOutcome {
    fleet
        .pickup_with_receipt(passenger)
        .unwrap()
        .recv_timeout(WAIT)
        .unwrap()
}

fn direction_of(fleet: &FleetHandle, id: UnitId) -> Direction {
    fleet.status().unwrap().get(id).unwrap().direction
}

fn fleet_of(units: &[(UnitId, Direction)], policy: MovingPickupPolicy) -> FleetHandle {
    let mut config = FleetConfig::with_elevators(units.len() as u32);
    config.dispatch.moving_pickup_policy = policy;
    let handles = units
        .iter()
        .map(|&(id, direction)| elevator_unit::spawn_at(id, direction, policy).unwrap())
        .collect();
    FleetHandle::start_with_units(config, handles).unwrap()
}

/// Reports `Idle(floor)` forever and never answers pickups. Signals on
/// `stopped` once its loop ends.
fn watched_unit(id: UnitId, floor: i32, stopped: Sender<()>) -> UnitHandle {
    let (inbox_tx, inbox_rx) = unbounded::<UnitMessage>();
    let thread = thread::spawn(move || {
        for message in inbox_rx {
            match message {
                UnitMessage::StatusRequest { reply_to } => {
                    let _ = reply_to.send(ElevatorStatus { id, direction: Direction::Idle { floor } });
                },
                UnitMessage::Shutdown => break,
                UnitMessage::Pickup { .. } | UnitMessage::Tick { .. } | UnitMessage::Withdraw { .. } => {},
            }
        }
        let _ = stopped.send(());
    });
    UnitHandle::new(UnitAddress { id, inbox: inbox_tx }, thread)
}

fn unresponsive_unit(id: UnitId, floor: i32) -> UnitHandle {
    let (stopped_tx, _stopped_rx) = bounded(1);
    watched_unit(id, floor, stopped_tx)
}

/// A real unit behind a relay that holds every pickup back for `delay`.
fn slow_unit(id: UnitId, floor: i32, delay: Duration) -> UnitHandle {
    let inner = elevator_unit::spawn_at(id, Direction::Idle { floor }, MovingPickupPolicy::default()).unwrap();
    let (inbox_tx, inbox_rx) = unbounded::<UnitMessage>();
    let thread = thread::spawn(move || {
        let relay = inner.address().inbox;
        for message in inbox_rx {
            let stop = matches!(message, UnitMessage::Shutdown);
            if matches!(message, UnitMessage::Pickup { .. }) {
                thread::sleep(delay);
            }
            let _ = relay.send(message);
            if stop {
                break;
            }
        }
        let _ = relay.send(UnitMessage::Shutdown);
        inner.join().unwrap();
    });
    UnitHandle::new(UnitAddress { id, inbox: inbox_tx }, thread)
}

/// Retries the status query until every unit answered in time.
fn complete_status(fleet: &FleetHandle) -> FleetSnapshot {
    for _ in 0..50 {
        let snapshot = fleet.status().unwrap();
        if snapshot.is_complete() {
            return snapshot;
        }
    }
    panic!("fleet never answered in full");
}

#[test]
fn initial_status_lists_every_unit_idle_at_ground_floor() {
    for size in [1, 2, 5] {
        let fleet = FleetHandle::start(FleetConfig::with_elevators(size)).unwrap();
        let snapshot = fleet.status().unwrap();
        assert!(snapshot.is_complete());
        let expected: Vec<ElevatorStatus> = (1..=size)
            .map(|id| ElevatorStatus { id, direction: Direction::Idle { floor: 0 } })
            .collect();
        assert_eq!(snapshot.statuses, expected);
        fleet.shutdown().unwrap();
    }
}

#[test]
fn repeated_status_queries_agree() {
    let fleet = FleetHandle::start(FleetConfig::with_elevators(3)).unwrap();
    assign(&fleet, Passenger::new(2, 6));
    let first = fleet.status().unwrap();
    let second = fleet.status().unwrap();
    assert_eq!(first, second);
    fleet.shutdown().unwrap();
}

#[test]
fn tie_between_idle_units_goes_to_unit_one() {
    let fleet = FleetHandle::start(FleetConfig::with_elevators(3)).unwrap();
    assert_eq!(assign(&fleet, Passenger::new(5, 9)), PickupOutcome::Assigned(1));
    assert_eq!(direction_of(&fleet, 1), Direction::MovingUp { floor: 0, goal: 9 });
    assert_eq!(direction_of(&fleet, 2), Direction::Idle { floor: 0 });
    fleet.shutdown().unwrap();
}

#[test]
fn mixed_fleet_prefers_lowest_idle_unit() {
    let fleet = fleet_of(
        &[
            (1, Direction::Idle { floor: 0 }),
            (2, Direction::MovingUp { floor: 2, goal: 10 }),
            (3, Direction::Idle { floor: 8 }),
        ],
        MovingPickupPolicy::AcceptOnTheWay,
    );
    assert_eq!(assign(&fleet, Passenger::new(4, 6)), PickupOutcome::Assigned(1));
    assert_eq!(direction_of(&fleet, 1), Direction::MovingUp { floor: 0, goal: 6 });
    fleet.shutdown().unwrap();
}

#[test]
fn busy_unit_is_skipped_for_an_idle_one() {
    let fleet = FleetHandle::start(FleetConfig::with_elevators(2)).unwrap();
    assert_eq!(assign(&fleet, Passenger::new(0, 10)), PickupOutcome::Assigned(1));
    assert_eq!(assign(&fleet, Passenger::new(3, 8)), PickupOutcome::Assigned(2));
    fleet.shutdown().unwrap();
}

#[test]
fn moving_unit_on_the_way_takes_the_passenger() {
    let fleet = fleet_of(
        &[
            (1, Direction::MovingDown { floor: 9, goal: 0 }),
            (2, Direction::MovingUp { floor: 0, goal: 10 }),
        ],
        MovingPickupPolicy::AcceptOnTheWay,
    );
    assert_eq!(assign(&fleet, Passenger::new(2, 6)), PickupOutcome::Assigned(2));
    // the goal of the run is unchanged
    assert_eq!(direction_of(&fleet, 2), Direction::MovingUp { floor: 0, goal: 10 });
    fleet.shutdown().unwrap();
}

#[test]
fn ticks_move_cars_one_floor_at_a_time() {
    let fleet = FleetHandle::start(FleetConfig::with_elevators(1)).unwrap();
    fleet.pickup(Passenger::new(0, 10)).unwrap();
    for _ in 0..3 {
        fleet.tick().unwrap();
    }
    assert_eq!(direction_of(&fleet, 1), Direction::MovingUp { floor: 3, goal: 10 });
    for _ in 0..7 {
        fleet.tick().unwrap();
    }
    assert_eq!(direction_of(&fleet, 1), Direction::Idle { floor: 10 });
    fleet.tick().unwrap();
    assert_eq!(direction_of(&fleet, 1), Direction::Idle { floor: 10 });
    fleet.shutdown().unwrap();
}

#[test]
fn unit_in_motion_settles_on_its_goal() {
    let fleet = fleet_of(
        &[(1, Direction::MovingUp { floor: 3, goal: 10 })],
        MovingPickupPolicy::AcceptOnTheWay,
    );
    for _ in 0..7 {
        fleet.tick().unwrap();
    }
    assert_eq!(direction_of(&fleet, 1), Direction::Idle { floor: 10 });
    fleet.shutdown().unwrap();
}

#[test]
fn unserialized_ticks_still_reach_every_unit() {
    let mut config = FleetConfig::with_elevators(2);
    config.dispatch.serialize_ticks = false;
    let fleet = FleetHandle::start(config).unwrap();
    assert_eq!(assign(&fleet, Passenger::new(0, 4)), PickupOutcome::Assigned(1));
    assert_eq!(assign(&fleet, Passenger::new(0, -2)), PickupOutcome::Assigned(2));
    for _ in 0..4 {
        fleet.tick().unwrap();
    }
    let snapshot = fleet.status().unwrap();
    assert_eq!(snapshot.get(1).unwrap().direction, Direction::Idle { floor: 4 });
    assert_eq!(snapshot.get(2).unwrap().direction, Direction::Idle { floor: -2 });
    fleet.shutdown().unwrap();
}

#[test]
fn refused_pickup_is_offered_to_every_unit_before_giving_up() {
    let fleet = fleet_of(
        &[
            (1, Direction::MovingUp { floor: 0, goal: 10 }),
            (2, Direction::MovingUp { floor: 0, goal: 8 }),
        ],
        MovingPickupPolicy::RejectWhileMoving,
    );
    assert_eq!(assign(&fleet, Passenger::new(3, 1)), PickupOutcome::Unassigned);
    assert_eq!(direction_of(&fleet, 1), Direction::MovingUp { floor: 0, goal: 10 });
    assert_eq!(direction_of(&fleet, 2), Direction::MovingUp { floor: 0, goal: 8 });
    fleet.shutdown().unwrap();
}

#[test]
fn silent_unit_loses_its_pickup_to_the_next_candidate() {
    let mut config = FleetConfig::with_elevators(2);
    config.timing.status_timeout_ms = 100;
    config.timing.housekeeping_ms = 10;
    let units = vec![
        unresponsive_unit(1, 0),
        elevator_unit::spawn_at(2, Direction::Idle { floor: 5 }, MovingPickupPolicy::default()).unwrap(),
    ];
    let fleet = FleetHandle::start_with_units(config, units).unwrap();
    assert_eq!(assign(&fleet, Passenger::new(0, 3)), PickupOutcome::Assigned(2));
    assert_eq!(direction_of(&fleet, 2), Direction::MovingDown { floor: 5, goal: 3 });
    fleet.shutdown().unwrap();
}

#[test]
fn late_acceptance_is_withdrawn_after_reassignment() {
    let mut config = FleetConfig::with_elevators(2);
    config.timing.status_timeout_ms = 100;
    config.timing.housekeeping_ms = 10;
    let units = vec![
        slow_unit(1, 0, Duration::from_millis(300)),
        elevator_unit::spawn_at(2, Direction::Idle { floor: 5 }, MovingPickupPolicy::default()).unwrap(),
    ];
    let fleet = FleetHandle::start_with_units(config, units).unwrap();
    assert_eq!(assign(&fleet, Passenger::new(0, 3)), PickupOutcome::Assigned(2));

    // unit 1 only answers again once its delayed pickup went through
    let snapshot = complete_status(&fleet);
    assert_eq!(snapshot.get(1).unwrap().direction, Direction::Idle { floor: 0 });
    assert_eq!(snapshot.get(2).unwrap().direction, Direction::MovingDown { floor: 5, goal: 3 });
    fleet.shutdown().unwrap();
}

#[test]
fn refusal_on_the_way_passes_to_the_next_unit_on_the_way() {
    let fleet = fleet_of(
        &[
            (1, Direction::MovingUp { floor: 2, goal: 10 }),
            (2, Direction::MovingUp { floor: 0, goal: 15 }),
        ],
        MovingPickupPolicy::AcceptOnTheWay,
    );
    // unit 1 is closer but its run ends below the target
    assert_eq!(assign(&fleet, Passenger::new(4, 12)), PickupOutcome::Assigned(2));
    assert_eq!(direction_of(&fleet, 1), Direction::MovingUp { floor: 2, goal: 10 });
    assert_eq!(direction_of(&fleet, 2), Direction::MovingUp { floor: 0, goal: 15 });
    fleet.shutdown().unwrap();
}

#[test]
fn nearest_unit_moving_away_leaves_pickup_unassigned() {
    let fleet = fleet_of(
        &[
            (1, Direction::MovingDown { floor: 5, goal: 0 }),
            (2, Direction::MovingDown { floor: 9, goal: 1 }),
        ],
        MovingPickupPolicy::AcceptOnTheWay,
    );
    assert_eq!(assign(&fleet, Passenger::new(4, 6)), PickupOutcome::Unassigned);
    assert_eq!(direction_of(&fleet, 1), Direction::MovingDown { floor: 5, goal: 0 });
    assert_eq!(direction_of(&fleet, 2), Direction::MovingDown { floor: 9, goal: 1 });
    fleet.shutdown().unwrap();
}

#[test]
fn dropping_the_handle_stops_every_unit() {
    let (stopped_tx, stopped_rx) = bounded(1);
    let fleet = FleetHandle::start_with_units(
        FleetConfig::with_elevators(1),
        vec![watched_unit(1, 0, stopped_tx)],
    )
    .unwrap();
    assert_eq!(fleet.status().unwrap().len(), 1);
    drop(fleet);
    assert!(stopped_rx.recv_timeout(WAIT).is_ok());
}

#[test]
fn invalid_pickups_never_reach_the_fleet() {
    let mut config = FleetConfig::with_elevators(2);
    config.fleet.min_floor = Some(0);
    config.fleet.max_floor = Some(10);
    let fleet = FleetHandle::start(config).unwrap();

    assert!(matches!(fleet.pickup(Passenger::new(4, 4)), Err(FleetError::InvalidPickup(4))));
    assert!(matches!(
        fleet.pickup(Passenger::new(3, 11)),
        Err(FleetError::FloorOutOfBounds { floor: 11, .. })
    ));
    assert!(matches!(
        fleet.pickup_with_receipt(Passenger::new(-1, 3)),
        Err(FleetError::FloorOutOfBounds { floor: -1, .. })
    ));

    let snapshot = fleet.status().unwrap();
    assert!(snapshot.statuses.iter().all(|status| status.direction == Direction::Idle { floor: 0 }));
    fleet.shutdown().unwrap();
}

#[test]
fn fleet_without_units_is_rejected() {
    assert!(matches!(
        FleetHandle::start(FleetConfig::with_elevators(0)),
        Err(FleetError::EmptyFleet)
    ));
}

#[test]
fn duplicate_unit_ids_are_rejected() {
    let units = vec![
        elevator_unit::spawn(1, MovingPickupPolicy::default()).unwrap(),
        elevator_unit::spawn(1, MovingPickupPolicy::default()).unwrap(),
    ];
    assert!(matches!(
        FleetHandle::start_with_units(FleetConfig::with_elevators(2), units),
        Err(FleetError::InvalidConfig(_))
    ));
}

#[test]
fn shutdown_waits_for_pending_requests() {
    let fleet = FleetHandle::start(FleetConfig::with_elevators(2)).unwrap();
    let receipt = fleet.pickup_with_receipt(Passenger::new(1, 2)).unwrap();
    let status = fleet.request_status().unwrap();
    fleet.shutdown().unwrap();
    assert_eq!(receipt.recv_timeout(WAIT).unwrap(), PickupOutcome::Assigned(1));
    assert_eq!(status.recv_timeout(WAIT).unwrap().len(), 2);
}

#[test]
fn dropped_receipt_does_not_stall_the_fleet() {
    let fleet = FleetHandle::start(FleetConfig::with_elevators(2)).unwrap();
    drop(fleet.pickup_with_receipt(Passenger::new(2, 7)).unwrap());
    assert_eq!(direction_of(&fleet, 1), Direction::MovingUp { floor: 0, goal: 7 });
    fleet.shutdown().unwrap();
}
