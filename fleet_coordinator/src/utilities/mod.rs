pub mod debug;
pub mod selection;
