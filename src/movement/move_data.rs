//! Shared scratch data exchanged with the movement solver for one tick

use glam::Vec3;

use super::command::CommandButtons;

/// Movement scratch state for a single tick.
///
/// Filled during setup, consumed and rewritten by the solver (or vehicle),
/// read back during finish. Must not be kept past the tick it was built for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveData {
    /// Tick duration in seconds. Zero marks a detached or backlog resimulation.
    pub frame_time: f32,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub view_angles: Vec3,
    pub buttons: CommandButtons,
    pub old_buttons: CommandButtons,
    pub forward_move: f32,
    pub side_move: f32,
    /// Maximum ground speed for this tick.
    pub max_speed: f32,
}

impl MoveData {
    pub fn new(frame_time: f32) -> Self {
        Self {
            frame_time,
            ..Default::default()
        }
    }

    /// True when this tick advances simulated time.
    #[inline]
    pub fn is_live_tick(&self) -> bool {
        self.frame_time != 0.0
    }
}
