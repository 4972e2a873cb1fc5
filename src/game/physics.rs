//! Kinematic integrators used by the simulation driver
//!
//! Z is up. Angles are in degrees.

use glam::{Vec2, Vec3};

use crate::movement::{CommandButtons, MoveData};

/// On-foot movement constants
#[derive(Debug, Clone, Copy)]
pub struct WalkStats {
    /// Ground acceleration factor
    pub acceleration: f32,
    /// Ground friction factor
    pub friction: f32,
    /// Speed below which friction stops the player outright
    pub stop_speed: f32,
    /// Upward velocity applied on jump
    pub jump_speed: f32,
    pub gravity: f32,
}

impl Default for WalkStats {
    fn default() -> Self {
        Self {
            acceleration: 10.0,
            friction: 4.0,
            stop_speed: 100.0,
            jump_speed: 289.0,
            gravity: 800.0,
        }
    }
}

/// Vehicle body constants
#[derive(Debug, Clone, Copy)]
pub struct VehicleStats {
    pub max_speed: f32,
    pub acceleration: f32,
    /// Per-tick velocity retention
    pub drag: f32,
    /// Turn rate in degrees per second at full steer
    pub turn_rate: f32,
    /// Roll gained per second per unit of lateral load
    pub roll_rate: f32,
    /// Roll recovered per second when upright-ish
    pub roll_recovery: f32,
    /// Roll beyond which the body is overturned
    pub overturn_roll: f32,
}

impl Default for VehicleStats {
    fn default() -> Self {
        Self {
            max_speed: 900.0,
            acceleration: 600.0,
            drag: 0.99,
            turn_rate: 90.0,
            roll_rate: 0.25,
            roll_recovery: 30.0,
            overturn_roll: 100.0,
        }
    }
}

/// Rigid-ish vehicle body state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleBody {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading in degrees
    pub yaw: f32,
    /// Roll in degrees (0 = upright)
    pub roll: f32,
}

impl VehicleBody {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Physics system for players and vehicles
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Integrate on-foot movement for one tick. Ground is the plane z = 0.
    pub fn walk_move(mv: &mut MoveData, stats: &WalkStats) {
        let dt = mv.frame_time;
        if dt <= 0.0 {
            return;
        }

        let on_ground = mv.origin.z <= 0.0 && mv.velocity.z <= 0.0;

        // Wish direction from yaw and move intents
        let (sin_yaw, cos_yaw) = mv.view_angles.y.to_radians().sin_cos();
        let forward = Vec2::new(cos_yaw, sin_yaw);
        let right = Vec2::new(sin_yaw, -cos_yaw);
        let wish = forward * mv.forward_move + right * mv.side_move;
        let wish_speed = wish.length().min(mv.max_speed);
        let wish_dir = wish.normalize_or_zero();

        let mut horizontal = Vec2::new(mv.velocity.x, mv.velocity.y);

        if on_ground {
            horizontal = Self::apply_friction(horizontal, stats, dt);
            horizontal = Self::accelerate(horizontal, wish_dir, wish_speed, stats.acceleration, dt);

            let jump_pressed = mv.buttons.pressed(CommandButtons::JUMP)
                && !mv.old_buttons.pressed(CommandButtons::JUMP);
            mv.velocity.z = if jump_pressed { stats.jump_speed } else { 0.0 };
        } else {
            mv.velocity.z -= stats.gravity * dt;
        }

        mv.velocity.x = horizontal.x;
        mv.velocity.y = horizontal.y;
        mv.origin += mv.velocity * dt;

        if mv.origin.z < 0.0 {
            mv.origin.z = 0.0;
            mv.velocity.z = 0.0;
        }
    }

    fn apply_friction(velocity: Vec2, stats: &WalkStats, dt: f32) -> Vec2 {
        let speed = velocity.length();
        if speed < 0.1 {
            return Vec2::ZERO;
        }
        let control = speed.max(stats.stop_speed);
        let new_speed = (speed - control * stats.friction * dt).max(0.0);
        velocity * (new_speed / speed)
    }

    fn accelerate(velocity: Vec2, wish_dir: Vec2, wish_speed: f32, accel: f32, dt: f32) -> Vec2 {
        let current = velocity.dot(wish_dir);
        let add = wish_speed - current;
        if add <= 0.0 {
            return velocity;
        }
        let step = (accel * wish_speed * dt).min(add);
        velocity + wish_dir * step
    }

    /// Update a vehicle body from driver input.
    ///
    /// `throttle` and `steer` are clamped to [-1, 1]. An overturned body
    /// ignores input and only slides to a stop.
    pub fn update_vehicle(
        body: &mut VehicleBody,
        throttle: f32,
        steer: f32,
        stats: &VehicleStats,
        dt: f32,
    ) {
        if dt <= 0.0 {
            return;
        }

        let throttle = throttle.clamp(-1.0, 1.0);
        let steer = steer.clamp(-1.0, 1.0);
        let overturned = Self::is_overturned(body, stats);

        if !overturned {
            let speed_fraction = (body.velocity.length() / stats.max_speed).min(1.0);
            body.yaw = (body.yaw + steer * stats.turn_rate * dt).rem_euclid(360.0);

            // Hard turns at speed load the outside wheels
            let lateral_load = steer.abs() * speed_fraction * stats.max_speed;
            if lateral_load > stats.max_speed * 0.5 {
                body.roll += steer.signum() * lateral_load * stats.roll_rate * dt;
            } else {
                body.roll = Self::approach_zero(body.roll, stats.roll_recovery * dt);
            }

            let (sin_yaw, cos_yaw) = body.yaw.to_radians().sin_cos();
            let thrust_power = if throttle >= 0.0 {
                throttle * stats.acceleration
            } else {
                throttle * stats.acceleration * 0.5 // Reverse is slower
            };
            body.velocity.x += cos_yaw * thrust_power * dt;
            body.velocity.y += sin_yaw * thrust_power * dt;
        }

        body.velocity *= stats.drag;
        body.velocity.z = 0.0;

        let speed = body.velocity.length();
        if speed > stats.max_speed {
            body.velocity *= stats.max_speed / speed;
        } else if overturned && speed < 1.0 {
            body.velocity = Vec3::ZERO;
        }

        body.position += body.velocity * dt;
    }

    /// Roll the body back upright (driver pushing it over).
    pub fn right_vehicle(body: &mut VehicleBody, stats: &VehicleStats, dt: f32) {
        body.roll = Self::approach_zero(body.roll, stats.roll_recovery * 4.0 * dt);
        // Rocking the chassis shifts it a little
        body.position.x += 20.0 * dt;
    }

    pub fn is_overturned(body: &VehicleBody, stats: &VehicleStats) -> bool {
        body.roll.abs() > stats.overturn_roll
    }

    fn approach_zero(value: f32, step: f32) -> f32 {
        if value.abs() <= step {
            0.0
        } else {
            value - step.copysign(value)
        }
    }

    /// Check if a point is within `radius` of `center` on the ground plane
    pub fn within_reach(point: Vec3, center: Vec3, radius: f32) -> bool {
        let dx = point.x - center.x;
        let dy = point.y - center.y;
        dx * dx + dy * dy <= radius * radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 66.0;

    fn walk_data(forward_move: f32) -> MoveData {
        MoveData {
            frame_time: DT,
            forward_move,
            max_speed: 300.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_walk_accelerates_forward() {
        let mut mv = walk_data(450.0);
        PhysicsSystem::walk_move(&mut mv, &WalkStats::default());
        assert!(mv.velocity.x > 0.0);
        assert!(mv.origin.x > 0.0);
        assert!(mv.velocity.y.abs() < 1e-3);
    }

    #[test]
    fn test_walk_respects_max_speed() {
        let mut mv = walk_data(10_000.0);
        for _ in 0..500 {
            PhysicsSystem::walk_move(&mut mv, &WalkStats::default());
        }
        assert!(mv.velocity.length() <= 300.0 + 1e-2);
    }

    #[test]
    fn test_zero_frame_time_does_not_move() {
        let mut mv = walk_data(450.0);
        mv.frame_time = 0.0;
        PhysicsSystem::walk_move(&mut mv, &WalkStats::default());
        assert_eq!(mv.origin, Vec3::ZERO);
        assert_eq!(mv.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_jump_needs_fresh_press() {
        let mut mv = walk_data(0.0);
        mv.buttons.press(CommandButtons::JUMP);
        PhysicsSystem::walk_move(&mut mv, &WalkStats::default());
        assert!(mv.origin.z > 0.0);

        let mut held = walk_data(0.0);
        held.buttons.press(CommandButtons::JUMP);
        held.old_buttons.press(CommandButtons::JUMP);
        PhysicsSystem::walk_move(&mut held, &WalkStats::default());
        assert_eq!(held.origin.z, 0.0);
    }

    #[test]
    fn test_hard_turn_at_speed_overturns() {
        let stats = VehicleStats::default();
        let mut body = VehicleBody::default();
        for _ in 0..200 {
            PhysicsSystem::update_vehicle(&mut body, 1.0, 0.0, &stats, DT);
        }
        assert!(body.velocity.length() > stats.max_speed * 0.5);

        for _ in 0..400 {
            PhysicsSystem::update_vehicle(&mut body, 1.0, 1.0, &stats, DT);
        }
        assert!(PhysicsSystem::is_overturned(&body, &stats));
    }

    #[test]
    fn test_overturned_vehicle_comes_to_rest() {
        let stats = VehicleStats::default();
        let mut body = VehicleBody {
            velocity: Vec3::new(200.0, 0.0, 0.0),
            roll: 150.0,
            ..Default::default()
        };
        for _ in 0..1000 {
            PhysicsSystem::update_vehicle(&mut body, 1.0, 0.0, &stats, DT);
        }
        assert_eq!(body.velocity, Vec3::ZERO);
        assert!(PhysicsSystem::is_overturned(&body, &stats));
    }

    #[test]
    fn test_righting_restores_upright() {
        let stats = VehicleStats::default();
        let mut body = VehicleBody {
            roll: 150.0,
            ..Default::default()
        };
        for _ in 0..200 {
            PhysicsSystem::right_vehicle(&mut body, &stats, DT);
        }
        assert!(!PhysicsSystem::is_overturned(&body, &stats));
    }
}
