//! Simulated vehicles players can occupy

use glam::Vec3;
use serde::Serialize;
use uuid::Uuid;

use crate::movement::{CommandButtons, MoveData, MoveHelper, ServerVehicle, UserCmd};

use super::physics::{PhysicsSystem, VehicleBody, VehicleStats};

/// Move intent that maps to full throttle / full steer
const FULL_INPUT: f32 = 450.0;

/// Vehicle kinds available in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    /// Driveable, can roll over
    Buggy,
    /// Stationary mounted gun
    Turret,
}

/// Driveable four-wheeler
#[derive(Debug, Clone)]
pub struct Buggy {
    pub id: Uuid,
    pub body: VehicleBody,
    pub stats: VehicleStats,
    throttle: f32,
    steer: f32,
    righting: bool,
}

impl Buggy {
    pub fn new(position: Vec3) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: VehicleBody::at(position),
            stats: VehicleStats::default(),
            throttle: 0.0,
            steer: 0.0,
            righting: false,
        }
    }

    pub fn is_overturned(&self) -> bool {
        PhysicsSystem::is_overturned(&self.body, &self.stats)
    }
}

impl ServerVehicle for Buggy {
    fn setup_move(&mut self, cmd: &UserCmd, _helper: &mut dyn MoveHelper, mv: &mut MoveData) {
        self.throttle = (cmd.forward_move / FULL_INPUT).clamp(-1.0, 1.0);
        // Positive side move is a right turn, which lowers yaw
        self.steer = (-cmd.side_move / FULL_INPUT).clamp(-1.0, 1.0);
        self.righting = self.is_overturned() && cmd.buttons.pressed(CommandButtons::JUMP);
        mv.max_speed = self.stats.max_speed;
    }

    fn finish_move(&mut self, _cmd: &UserCmd, mv: &mut MoveData) {
        if self.righting {
            PhysicsSystem::right_vehicle(&mut self.body, &self.stats, mv.frame_time);
        } else {
            PhysicsSystem::update_vehicle(
                &mut self.body,
                self.throttle,
                self.steer,
                &self.stats,
                mv.frame_time,
            );
        }
        mv.origin = self.body.position;
        mv.velocity = self.body.velocity;
    }

    fn physics_position(&self) -> Option<Vec3> {
        Some(self.body.position)
    }

    fn try_overturn_status(&self) -> Option<bool> {
        Some(self.is_overturned())
    }
}

/// Mounted gun. Has no physics body and cannot overturn.
#[derive(Debug, Clone)]
pub struct Turret {
    pub id: Uuid,
    pub position: Vec3,
    pub aim_yaw: f32,
}

impl Turret {
    pub fn new(position: Vec3) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            aim_yaw: 0.0,
        }
    }
}

impl ServerVehicle for Turret {
    fn setup_move(&mut self, cmd: &UserCmd, _helper: &mut dyn MoveHelper, mv: &mut MoveData) {
        self.aim_yaw = cmd.yaw();
        mv.max_speed = 0.0;
    }

    fn finish_move(&mut self, _cmd: &UserCmd, mv: &mut MoveData) {
        mv.origin = self.position;
        mv.velocity = Vec3::ZERO;
    }

    fn physics_position(&self) -> Option<Vec3> {
        None
    }
}

/// A vehicle placed in the world
#[derive(Debug, Clone)]
pub enum SimVehicle {
    Buggy(Buggy),
    Turret(Turret),
}

impl SimVehicle {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Buggy(buggy) => buggy.id,
            Self::Turret(turret) => turret.id,
        }
    }

    pub fn kind(&self) -> VehicleKind {
        match self {
            Self::Buggy(_) => VehicleKind::Buggy,
            Self::Turret(_) => VehicleKind::Turret,
        }
    }

    /// World position, physics-backed or not
    pub fn position(&self) -> Vec3 {
        match self {
            Self::Buggy(buggy) => buggy.body.position,
            Self::Turret(turret) => turret.position,
        }
    }
}

impl ServerVehicle for SimVehicle {
    fn setup_move(&mut self, cmd: &UserCmd, helper: &mut dyn MoveHelper, mv: &mut MoveData) {
        match self {
            Self::Buggy(buggy) => buggy.setup_move(cmd, helper, mv),
            Self::Turret(turret) => turret.setup_move(cmd, helper, mv),
        }
    }

    fn finish_move(&mut self, cmd: &UserCmd, mv: &mut MoveData) {
        match self {
            Self::Buggy(buggy) => buggy.finish_move(cmd, mv),
            Self::Turret(turret) => turret.finish_move(cmd, mv),
        }
    }

    fn physics_position(&self) -> Option<Vec3> {
        match self {
            Self::Buggy(buggy) => buggy.physics_position(),
            Self::Turret(turret) => turret.physics_position(),
        }
    }

    fn try_overturn_status(&self) -> Option<bool> {
        match self {
            Self::Buggy(buggy) => buggy.try_overturn_status(),
            Self::Turret(turret) => turret.try_overturn_status(),
        }
    }
}
