//! Player movement command interception

pub mod base;
pub mod command;
pub mod context;
pub mod interceptor;
pub mod move_data;
pub mod traits;

pub use base::{BasePlayerMove, TouchList};
pub use command::{CommandButtons, UserCmd};
pub use context::{PlayerMoveContext, VehicleOccupancy};
pub use interceptor::MovementInterceptor;
pub use move_data::MoveData;
pub use traits::{
    ClassMovement, Condition, MoveHelper, MovePlayer, PlayerClass, ServerVehicle,
    TickPhaseHandler,
};
