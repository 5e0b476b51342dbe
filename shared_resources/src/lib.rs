pub mod config;
pub mod direction;
pub mod elevator_message;
pub mod elevator_status;
pub mod error;
pub mod passenger;
