use std::cmp::Ordering;

pub type Floor = i32;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelDirection {
    Up,
    Down,
}

impl TravelDirection {
    /// Direction needed to get from `from` to `to`, `None` if already there.
    pub fn between(from: Floor, to: Floor) -> Option<Self> {
        match to.cmp(&from) {
            Ordering::Greater => Some(TravelDirection::Up),
            Ordering::Less => Some(TravelDirection::Down),
            Ordering::Equal => None,
        }
    }
}

/// Motion state of a single car.
///
/// Moving variants always satisfy `goal != floor` with the variant matching
/// the sign of `goal - floor`; build them through [`Direction::toward`].
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Idle { floor: Floor },
    MovingUp { floor: Floor, goal: Floor },
    MovingDown { floor: Floor, goal: Floor },
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Idle { floor: 0 }
    }
}

impl Direction {
    pub fn toward(floor: Floor, goal: Floor) -> Self {
        match TravelDirection::between(floor, goal) {
            Some(TravelDirection::Up) => Direction::MovingUp { floor, goal },
            Some(TravelDirection::Down) => Direction::MovingDown { floor, goal },
            None => Direction::Idle { floor },
        }
    }

    pub fn floor(&self) -> Floor {
        match *self {
            Direction::Idle { floor }
            | Direction::MovingUp { floor, .. }
            | Direction::MovingDown { floor, .. } => floor,
        }
    }

    pub fn goal(&self) -> Option<Floor> {
        match *self {
            Direction::Idle { .. } => None,
            Direction::MovingUp { goal, .. } | Direction::MovingDown { goal, .. } => Some(goal),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Direction::Idle { .. })
    }

    pub fn distance_to(&self, floor: Floor) -> u32 {
        self.floor().abs_diff(floor)
    }

    /// True if the car is moving in `travel` and will pass `pickup_floor`
    /// before reaching its goal. The current floor counts, the goal does not.
    pub fn is_on_the_way(&self, pickup_floor: Floor, travel: TravelDirection) -> bool {
        match (*self, travel) {
            (Direction::MovingUp { floor, goal }, TravelDirection::Up) => {
                floor <= pickup_floor && pickup_floor < goal
            }
            (Direction::MovingDown { floor, goal }, TravelDirection::Down) => {
                goal < pickup_floor && pickup_floor <= floor
            }
            _ => false,
        }
    }

    /// True if `floor` lies strictly between the current floor and the goal.
    pub fn passes_strictly(&self, floor: Floor) -> bool {
        match *self {
            Direction::MovingUp { floor: current, goal } => current < floor && floor < goal,
            Direction::MovingDown { floor: current, goal } => goal < floor && floor < current,
            Direction::Idle { .. } => false,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Direction::Idle { .. } => String::from("idle"),
            Direction::MovingUp { .. } => String::from("up"),
            Direction::MovingDown { .. } => String::from("down"),
        }
    }
}
