pub mod modules;
pub mod utilities;

pub use modules::{spawn, spawn_at, UnitAddress, UnitHandle};
