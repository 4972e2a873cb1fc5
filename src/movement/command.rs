//! Per-tick client input command

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Button state flags carried by a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandButtons(pub u32);

impl CommandButtons {
    pub const ATTACK: u32 = 1 << 0;
    pub const JUMP: u32 = 1 << 1;
    pub const DUCK: u32 = 1 << 2;
    pub const FORWARD: u32 = 1 << 3;
    pub const BACK: u32 = 1 << 4;
    pub const USE: u32 = 1 << 5;
    pub const MOVE_LEFT: u32 = 1 << 9;
    pub const MOVE_RIGHT: u32 = 1 << 10;
    /// Secondary attack (minigun spin-up, shield charge).
    pub const ATTACK2: u32 = 1 << 11;
    pub const RELOAD: u32 = 1 << 13;

    #[inline]
    pub fn pressed(self, button: u32) -> bool {
        (self.0 & button) != 0
    }

    #[inline]
    pub fn press(&mut self, button: u32) {
        self.0 |= button;
    }

    #[inline]
    pub fn release(&mut self, button: u32) {
        self.0 &= !button;
    }
}

/// Input command submitted by a client for a single tick.
///
/// View angles are in degrees, stored as (pitch, yaw, roll).
/// Only the interceptor's setup phase rewrites fields, and only before the
/// movement solver consumes the command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCmd {
    /// Client-side command sequence number.
    pub command_number: u32,
    pub buttons: CommandButtons,
    /// Forward/backward intent in world units per second.
    pub forward_move: f32,
    /// Strafe intent in world units per second. Positive is right.
    pub side_move: f32,
    pub view_angles: Vec3,
}

impl UserCmd {
    /// Yaw component of the view angles.
    #[inline]
    pub fn yaw(&self) -> f32 {
        self.view_angles.y
    }

    #[inline]
    pub fn set_yaw(&mut self, yaw: f32) {
        self.view_angles.y = yaw;
    }

    #[inline]
    pub fn wants_jump(&self) -> bool {
        self.buttons.pressed(CommandButtons::JUMP)
    }

    #[inline]
    pub fn has_movement_input(&self) -> bool {
        self.forward_move != 0.0 || self.side_move != 0.0
    }
}
