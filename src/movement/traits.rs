//! Collaborator seams for the movement tick phases

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::command::UserCmd;
use super::move_data::MoveData;

/// Player classes with class-specific movement rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerClass {
    Scout,
    Soldier,
    Pyro,
    Demoman,
    /// Heavy weapons class. Locked in place while crouch-firing.
    Heavy,
    Engineer,
    Medic,
    Sniper,
    Spy,
}

/// Ability conditions that alter movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Weapon spun up / scoped, movement-restricted aim.
    Aiming,
    /// Shield charge, turn rate limited.
    ShieldCharge,
}

/// The three ordered phases run for every player command.
///
/// `start_command` → `setup_move` → (solver integration) → `finish_move`,
/// exactly once each per player per tick.
pub trait TickPhaseHandler {
    fn start_command(&mut self, player: &mut dyn MovePlayer, cmd: &UserCmd);

    fn setup_move(
        &mut self,
        player: &mut dyn MovePlayer,
        cmd: &mut UserCmd,
        helper: &mut dyn MoveHelper,
        mv: &mut MoveData,
    );

    fn finish_move(&mut self, player: &mut dyn MovePlayer, cmd: &UserCmd, mv: &mut MoveData);

    /// Release anything kept for a player whose session ended.
    fn forget_player(&mut self, _id: &Uuid) {}
}

/// Query surface of a simulated player
pub trait MovePlayer {
    fn id(&self) -> Uuid;

    /// Kinematic world position.
    fn abs_origin(&self) -> Vec3;
    fn set_abs_origin(&mut self, origin: Vec3);

    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);

    fn max_speed(&self) -> f32;

    fn eye_angles(&self) -> Vec3;
    /// Force the externally visible eye angles (no interpolation).
    fn snap_eye_angles(&mut self, angles: Vec3);

    /// Store the command currently being processed.
    fn set_current_command(&mut self, cmd: &UserCmd);

    /// The vehicle the player occupies, if any.
    fn vehicle(&mut self) -> Option<&mut dyn ServerVehicle>;

    /// Game-specific class state. `None` for plain players.
    fn class_movement(&mut self) -> Option<&mut dyn ClassMovement>;
}

/// Class and ability state consulted by the command rules
pub trait ClassMovement {
    fn player_class(&self) -> PlayerClass;
    fn in_condition(&self, condition: Condition) -> bool;
    fn is_ducking(&self) -> bool;
    /// Per-tick turn cap in degrees while charging.
    fn charge_turn_cap(&self) -> f32;
}

/// Movement delegate for an occupied vehicle
pub trait ServerVehicle {
    fn setup_move(&mut self, cmd: &UserCmd, helper: &mut dyn MoveHelper, mv: &mut MoveData);

    fn finish_move(&mut self, cmd: &UserCmd, mv: &mut MoveData);

    /// World position of the vehicle's physics object, if it has one.
    fn physics_position(&self) -> Option<Vec3>;

    /// `Some(overturned)` for vehicles that can flip, `None` otherwise.
    fn try_overturn_status(&self) -> Option<bool> {
        None
    }
}

/// Movement helper handed through to the solver and vehicle
pub trait MoveHelper {
    fn reset_touch_list(&mut self);

    /// Record a touch. Returns false if the entity was already touched this tick.
    fn add_to_touched(&mut self, entity: Uuid, impact_velocity: Vec3) -> bool;
}
