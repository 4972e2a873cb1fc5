//! Game simulation modules

pub mod bots;
pub mod driver;
pub mod physics;
pub mod player;
pub mod snapshot;
pub mod vehicle;

pub use driver::{DriverError, DriverHandle, PlayerCommand, SimulationDriver};
pub use player::SimPlayer;
pub use snapshot::MovementSnapshot;
pub use vehicle::SimVehicle;
