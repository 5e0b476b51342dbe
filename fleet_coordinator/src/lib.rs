pub mod modules;
pub mod utilities;

pub use modules::FleetHandle;
