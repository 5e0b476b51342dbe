use thiserror::Error;

use super::direction::Floor;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("pickup start floor {0} equals its target floor")]
    InvalidPickup(Floor),

    #[error("floor {floor} is outside the building ({min:?}..={max:?})")]
    FloorOutOfBounds {
        floor: Floor,
        min: Option<Floor>,
        max: Option<Floor>,
    },

    #[error("fleet must have at least one elevator")]
    EmptyFleet,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fleet coordinator is no longer running")]
    Disconnected,

    #[error("thread {0} panicked")]
    ThreadPanicked(String),
}
