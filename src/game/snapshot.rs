//! Periodic movement snapshots

use std::collections::HashMap;

use glam::Vec3;
use serde::Serialize;
use uuid::Uuid;

use crate::movement::{
    MovePlayer, MovementInterceptor, ServerVehicle, TickPhaseHandler, VehicleOccupancy,
};

use super::player::SimPlayer;
use super::vehicle::{SimVehicle, VehicleKind};

/// Movement state of one player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMoveSnapshot {
    pub player_id: Uuid,
    pub origin: Vec3,
    pub yaw: f32,
    pub occupancy: VehicleOccupancy,
    pub vehicle_flipped: bool,
    pub last_command: Option<u32>,
}

/// State of one vehicle, occupied or not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub vehicle_id: Uuid,
    pub kind: VehicleKind,
    pub position: Vec3,
    pub overturned: Option<bool>,
    pub driver: Option<Uuid>,
}

/// World movement snapshot for one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementSnapshot {
    pub tick: u64,
    pub players: Vec<PlayerMoveSnapshot>,
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Decides when to emit snapshots and builds them
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for occupancy changes)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot of every player and vehicle
    pub fn build<S: TickPhaseHandler>(
        &self,
        tick: u64,
        interceptor: &MovementInterceptor<S>,
        players: &HashMap<Uuid, SimPlayer>,
        parked: &[SimVehicle],
    ) -> MovementSnapshot {
        let mut player_snapshots: Vec<PlayerMoveSnapshot> = players
            .values()
            .map(|p| PlayerMoveSnapshot {
                player_id: p.id,
                origin: p.abs_origin(),
                yaw: p.eye_angles().y,
                occupancy: interceptor.occupancy(&p.id),
                vehicle_flipped: interceptor
                    .context(&p.id)
                    .map(|ctx| ctx.vehicle_flipped)
                    .unwrap_or(false),
                last_command: p.current_command().map(|cmd| cmd.command_number),
            })
            .collect();
        player_snapshots.sort_by_key(|p| p.player_id);

        let occupied = players
            .values()
            .filter_map(|p| p.occupied_vehicle().map(|v| (v, Some(p.id))));
        let mut vehicles: Vec<VehicleSnapshot> = parked
            .iter()
            .map(|v| (v, None))
            .chain(occupied)
            .map(|(v, driver)| VehicleSnapshot {
                vehicle_id: v.id(),
                kind: v.kind(),
                position: v.position(),
                overturned: v.try_overturn_status(),
                driver,
            })
            .collect();
        vehicles.sort_by_key(|v| v.vehicle_id);

        MovementSnapshot {
            tick,
            players: player_snapshots,
            vehicles,
        }
    }
}
