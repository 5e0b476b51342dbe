use shared_resources::config::MovingPickupPolicy;
use shared_resources::direction::Direction;
use shared_resources::elevator_status::{ElevatorStatus, UnitId};
use shared_resources::passenger::{Passenger, PickupTicket};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupDecision {
    Accepted,
    Rejected,
}

/// State of one car. Owned by exactly one unit thread.
#[derive(Debug, Clone)]
pub struct Car {
    id: UnitId,
    direction: Direction,
    policy: MovingPickupPolicy,
    last_epoch: Option<u64>,
    /// Ticket that started the current run, while no other passenger shares it.
    run_owner: Option<u64>,
}

impl Car {
    pub fn new(id: UnitId, policy: MovingPickupPolicy) -> Self {
        Car::with_direction(id, Direction::default(), policy)
    }

    pub fn with_direction(id: UnitId, direction: Direction, policy: MovingPickupPolicy) -> Self {
        Car {
            id,
            direction: Direction::toward(direction.floor(), direction.goal().unwrap_or(direction.floor())),
            policy,
            last_epoch: None,
            run_owner: None,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn status(&self) -> ElevatorStatus {
        ElevatorStatus {
            id: self.id,
            direction: self.direction,
        }
    }

    pub fn pickup(&mut self, passenger: &Passenger) -> PickupDecision {
        match self.direction {
            Direction::Idle { floor } => {
                // target == floor leaves the car idle: the passenger is already there
                self.direction = Direction::toward(floor, passenger.target_floor);
                PickupDecision::Accepted
            }
            Direction::MovingUp { .. } | Direction::MovingDown { .. } => match self.policy {
                MovingPickupPolicy::RejectWhileMoving => PickupDecision::Rejected,
                MovingPickupPolicy::AcceptOnTheWay => {
                    let on_the_way = passenger.travel_direction().map_or(false, |travel| {
                        self.direction.is_on_the_way(passenger.start_floor, travel)
                    });
                    if on_the_way && self.direction.passes_strictly(passenger.target_floor) {
                        PickupDecision::Accepted
                    } else {
                        PickupDecision::Rejected
                    }
                }
            },
        }
    }

    /// Like [`Car::pickup`], remembering which ticket the run belongs to so
    /// that it can be withdrawn later.
    pub fn assign(&mut self, ticket: &PickupTicket) -> PickupDecision {
        let was_idle = self.direction.is_idle();
        let decision = self.pickup(&ticket.passenger);
        if decision == PickupDecision::Accepted {
            self.run_owner = if was_idle && !self.direction.is_idle() {
                Some(ticket.id)
            } else {
                None
            };
        }
        decision
    }

    /// Cancels the run started for `ticket_id`; the car stops at its current
    /// floor. Returns false if the ticket does not own the current run.
    pub fn withdraw(&mut self, ticket_id: u64) -> bool {
        if self.run_owner != Some(ticket_id) {
            return false;
        }
        self.run_owner = None;
        self.direction = Direction::Idle { floor: self.direction.floor() };
        true
    }

    /// Moves one floor toward the goal, settling on `Idle(goal)` on arrival.
    pub fn step(&mut self) -> Direction {
        self.direction = match self.direction {
            Direction::Idle { floor } => Direction::Idle { floor },
            Direction::MovingUp { floor, goal } => Direction::toward(floor + 1, goal),
            Direction::MovingDown { floor, goal } => Direction::toward(floor - 1, goal),
        };
        if self.direction.is_idle() {
            self.run_owner = None;
        }
        self.direction
    }

    /// Applies the tick of broadcast `epoch`. Returns false for an epoch that
    /// was already applied.
    pub fn tick(&mut self, epoch: u64) -> bool {
        if self.last_epoch.map_or(false, |last| epoch <= last) {
            return false;
        }
        self.last_epoch = Some(epoch);
        self.step();
        true
    }
}
