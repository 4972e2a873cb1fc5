//! Per-player movement state persisted across ticks

use glam::Vec3;
use serde::Serialize;

/// Vehicle occupancy as seen by the interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleOccupancy {
    OnFoot,
    /// Entered this tick, vehicle not yet finished a move.
    EnteringVehicle,
    InVehicle,
    /// Vehicle is overturned and at rest.
    SettledFlipped,
}

/// Movement state the interceptor keeps for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerMoveContext {
    /// Last stable position. `None` until the first physics sample after
    /// entering a vehicle.
    pub saved_origin: Option<Vec3>,
    pub was_in_vehicle: bool,
    /// Set by the setup that seats the player, cleared by the next finish.
    pub entering_vehicle: bool,
    /// Always false while on foot.
    pub vehicle_flipped: bool,
    /// Last accepted yaw, baseline for the charge turn clamp.
    pub previous_charge_yaw: f32,
}

impl PlayerMoveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupancy(&self) -> VehicleOccupancy {
        if !self.was_in_vehicle {
            VehicleOccupancy::OnFoot
        } else if self.entering_vehicle {
            VehicleOccupancy::EnteringVehicle
        } else if self.vehicle_flipped {
            VehicleOccupancy::SettledFlipped
        } else {
            VehicleOccupancy::InVehicle
        }
    }
}
