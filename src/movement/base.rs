//! Generic, game-agnostic tick phase handling

use std::collections::HashMap;

use glam::Vec3;
use uuid::Uuid;

use super::command::{CommandButtons, UserCmd};
use super::move_data::MoveData;
use super::traits::{MoveHelper, MovePlayer, TickPhaseHandler};

/// Default phase handler: copies player state into the move data before
/// integration and back onto the player afterwards.
#[derive(Debug, Default)]
pub struct BasePlayerMove {
    last_buttons: HashMap<Uuid, CommandButtons>,
}

impl BasePlayerMove {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickPhaseHandler for BasePlayerMove {
    fn start_command(&mut self, player: &mut dyn MovePlayer, cmd: &UserCmd) {
        player.set_current_command(cmd);
    }

    fn setup_move(
        &mut self,
        player: &mut dyn MovePlayer,
        cmd: &mut UserCmd,
        helper: &mut dyn MoveHelper,
        mv: &mut MoveData,
    ) {
        helper.reset_touch_list();

        mv.origin = player.abs_origin();
        mv.velocity = player.velocity();
        mv.max_speed = player.max_speed();
        mv.view_angles = cmd.view_angles;
        mv.forward_move = cmd.forward_move;
        mv.side_move = cmd.side_move;
        mv.old_buttons = self
            .last_buttons
            .get(&player.id())
            .copied()
            .unwrap_or_default();
        mv.buttons = cmd.buttons;
    }

    fn finish_move(&mut self, player: &mut dyn MovePlayer, cmd: &UserCmd, mv: &mut MoveData) {
        player.set_abs_origin(mv.origin);
        player.set_velocity(mv.velocity);
        player.snap_eye_angles(mv.view_angles);
        self.last_buttons.insert(player.id(), cmd.buttons);
    }

    fn forget_player(&mut self, id: &Uuid) {
        self.last_buttons.remove(id);
    }
}

/// Touch list kept for the duration of one command
#[derive(Debug, Default)]
pub struct TouchList {
    touched: Vec<(Uuid, Vec3)>,
}

impl TouchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touched(&self) -> &[(Uuid, Vec3)] {
        &self.touched
    }
}

impl MoveHelper for TouchList {
    fn reset_touch_list(&mut self) {
        self.touched.clear();
    }

    fn add_to_touched(&mut self, entity: Uuid, impact_velocity: Vec3) -> bool {
        if self.touched.iter().any(|(id, _)| *id == entity) {
            return false;
        }
        self.touched.push((entity, impact_velocity));
        true
    }
}
