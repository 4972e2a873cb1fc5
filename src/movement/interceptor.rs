//! Game-specific movement interception around the generic solver
//!
//! Each player command passes through three phases:
//! - start: forwarded untouched to the solver
//! - setup: class rules rewrite the command, then the solver and the
//!   occupied vehicle (if any) prepare the move
//! - finish: the solver settles on-foot kinematics, then the vehicle is
//!   reconciled and the per-player context is updated
//!
//! Zero-duration ticks are backlog resimulations and never touch the
//! persistent per-player context.

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::MovementConfig;

use super::base::BasePlayerMove;
use super::command::{CommandButtons, UserCmd};
use super::context::{PlayerMoveContext, VehicleOccupancy};
use super::move_data::MoveData;
use super::traits::{
    ClassMovement, Condition, MoveHelper, MovePlayer, PlayerClass, TickPhaseHandler,
};

/// Movement interceptor owning every player's movement context
pub struct MovementInterceptor<S = BasePlayerMove> {
    solver: S,
    config: MovementConfig,
    contexts: HashMap<Uuid, PlayerMoveContext>,
}

impl MovementInterceptor<BasePlayerMove> {
    pub fn with_base_solver(config: MovementConfig) -> Self {
        Self::new(BasePlayerMove::new(), config)
    }
}

impl<S: TickPhaseHandler> MovementInterceptor<S> {
    pub fn new(solver: S, config: MovementConfig) -> Self {
        Self {
            solver,
            config,
            contexts: HashMap::new(),
        }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn context(&self, id: &Uuid) -> Option<&PlayerMoveContext> {
        self.contexts.get(id)
    }

    /// Occupancy state for a player. Unknown players are on foot.
    pub fn occupancy(&self, id: &Uuid) -> VehicleOccupancy {
        self.contexts
            .get(id)
            .map(PlayerMoveContext::occupancy)
            .unwrap_or(VehicleOccupancy::OnFoot)
    }

    /// Tear down a player's movement state at session end.
    pub fn remove_player(&mut self, id: &Uuid) -> Option<PlayerMoveContext> {
        self.solver.forget_player(id);
        self.contexts.remove(id)
    }
}

impl<S: TickPhaseHandler> TickPhaseHandler for MovementInterceptor<S> {
    fn start_command(&mut self, player: &mut dyn MovePlayer, cmd: &UserCmd) {
        self.solver.start_command(player, cmd);
    }

    fn setup_move(
        &mut self,
        player: &mut dyn MovePlayer,
        cmd: &mut UserCmd,
        helper: &mut dyn MoveHelper,
        mv: &mut MoveData,
    ) {
        let id = player.id();
        let ctx = self.contexts.entry(id).or_default();

        apply_class_rules(&self.config, player, cmd, ctx);

        self.solver.setup_move(player, cmd, helper, mv);

        if !mv.is_live_tick() {
            return;
        }

        if let Some(vehicle) = player.vehicle() {
            vehicle.setup_move(cmd, helper, mv);

            if !ctx.was_in_vehicle {
                ctx.was_in_vehicle = true;
                ctx.entering_vehicle = true;
                ctx.saved_origin = None;
                debug!(player_id = %id, "Player entered vehicle");
            }
        } else {
            ctx.saved_origin = Some(player.abs_origin());

            if ctx.was_in_vehicle {
                ctx.was_in_vehicle = false;
                ctx.entering_vehicle = false;
                ctx.vehicle_flipped = false;
                debug!(player_id = %id, "Player left vehicle");
            }
        }
    }

    fn finish_move(&mut self, player: &mut dyn MovePlayer, cmd: &UserCmd, mv: &mut MoveData) {
        self.solver.finish_move(player, cmd, mv);

        if !mv.is_live_tick() {
            return;
        }

        let id = player.id();
        let config = self.config;
        let ctx = self.contexts.entry(id).or_default();

        if let Some(vehicle) = player.vehicle() {
            vehicle.finish_move(cmd, mv);
            ctx.entering_vehicle = false;

            let mut distance = 0.0;
            if let Some(new_pos) = vehicle.physics_position() {
                distance =
                    vehicle_displacement(ctx.saved_origin, new_pos, config.vehicle_teleport_distance);
                ctx.saved_origin = Some(new_pos);
            }

            // Overturned and at rest; a vehicle still moving can right itself
            let flipped = vehicle
                .try_overturn_status()
                .map(|overturned| overturned && distance < config.vehicle_settle_distance)
                .unwrap_or(false);

            if ctx.vehicle_flipped != flipped {
                ctx.vehicle_flipped = flipped;
                debug!(player_id = %id, flipped, distance, "Vehicle flip state changed");
            }
        } else {
            ctx.vehicle_flipped = false;

            if let Some(saved) = ctx.saved_origin {
                let distance = player.abs_origin().distance(saved);
                trace!(player_id = %id, distance, "On-foot displacement");
            }
        }
    }

    fn forget_player(&mut self, id: &Uuid) {
        self.remove_player(id);
    }
}

/// Class rules applied to the command before the solver sees it.
fn apply_class_rules(
    config: &MovementConfig,
    player: &mut dyn MovePlayer,
    cmd: &mut UserCmd,
    ctx: &mut PlayerMoveContext,
) {
    let eye_angles = player.eye_angles();

    let Some(class) = player.class_movement() else {
        return;
    };

    apply_aim_lock(class, cmd);

    let charge_cap = class
        .in_condition(Condition::ShieldCharge)
        .then(|| class.charge_turn_cap() * config.charge_yaw_tolerance);

    match charge_cap {
        Some(cap) => {
            if let Some(clamped) = clamp_charge_yaw(ctx.previous_charge_yaw, cmd.yaw(), cap) {
                debug!(
                    player_id = %player.id(),
                    requested = cmd.yaw(),
                    clamped,
                    "Clamped charge yaw"
                );
                cmd.set_yaw(clamped);
                player.snap_eye_angles(cmd.view_angles);
            }
            ctx.previous_charge_yaw = cmd.yaw();
        }
        None => {
            ctx.previous_charge_yaw = eye_angles.y;
        }
    }
}

/// Crouched heavies firing their weapon are pinned in place and cannot jump.
///
/// Returns true if the command was rewritten.
pub fn apply_aim_lock(class: &dyn ClassMovement, cmd: &mut UserCmd) -> bool {
    let locked = class.player_class() == PlayerClass::Heavy
        && class.in_condition(Condition::Aiming)
        && class.is_ducking();

    if locked {
        cmd.forward_move = 0.0;
        cmd.side_move = 0.0;
        cmd.buttons.release(CommandButtons::JUMP);
    }
    locked
}

/// Clamp a requested yaw to within `cap` degrees of the previous yaw.
///
/// Returns `None` when the request is within the cap (a change exactly equal
/// to the cap is allowed). Otherwise the result is `previous ± cap` on the
/// side of the requested value.
pub fn clamp_charge_yaw(previous: f32, requested: f32, cap: f32) -> Option<f32> {
    if (requested - previous).abs() <= cap {
        return None;
    }

    if requested > previous {
        Some(previous + cap)
    } else {
        Some(previous - cap)
    }
}

/// Distance a vehicle moved since the last sample.
///
/// Zero when there is no previous sample or the jump exceeds `teleport_distance`.
fn vehicle_displacement(saved: Option<Vec3>, new_pos: Vec3, teleport_distance: f32) -> f32 {
    match saved {
        Some(saved) => {
            let distance = new_pos.distance(saved);
            if distance > teleport_distance {
                0.0
            } else {
                distance
            }
        }
        None => 0.0,
    }
}
