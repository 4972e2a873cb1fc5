//! Simulated players and their class state

use glam::Vec3;
use uuid::Uuid;

use crate::movement::{
    ClassMovement, CommandButtons, Condition, MovePlayer, PlayerClass, ServerVehicle, UserCmd,
};

use super::vehicle::SimVehicle;

/// Seconds a shield charge lasts
pub const CHARGE_DURATION: f32 = 1.5;
/// Seconds to refill an empty charge meter
pub const CHARGE_RECHARGE_TIME: f32 = 12.0;
/// Base charge turn cap in degrees per tick
pub const CHARGE_TURN_CAP: f32 = 0.45;
/// Where a player is dropped relative to the vehicle they leave
const EXIT_OFFSET: Vec3 = Vec3::new(0.0, 64.0, 0.0);

/// Class and ability conditions for one player
#[derive(Debug, Clone)]
pub struct ClassState {
    pub class: PlayerClass,
    pub ducking: bool,
    aiming: bool,
    charge_remaining: f32,
    charge_meter: f32,
}

impl ClassState {
    pub fn new(class: PlayerClass) -> Self {
        Self {
            class,
            ducking: false,
            aiming: false,
            charge_remaining: 0.0,
            charge_meter: 1.0,
        }
    }

    /// Derive conditions from the buttons held this tick.
    pub fn update_from_command(&mut self, cmd: &UserCmd, dt: f32) {
        self.ducking = cmd.buttons.pressed(CommandButtons::DUCK);

        self.aiming = self.class == PlayerClass::Heavy
            && (cmd.buttons.pressed(CommandButtons::ATTACK)
                || cmd.buttons.pressed(CommandButtons::ATTACK2));

        if self.class != PlayerClass::Demoman {
            return;
        }

        if self.charge_remaining > 0.0 {
            self.charge_remaining = (self.charge_remaining - dt).max(0.0);
        } else {
            self.charge_meter = (self.charge_meter + dt / CHARGE_RECHARGE_TIME).min(1.0);
            if cmd.buttons.pressed(CommandButtons::ATTACK2) && self.charge_meter >= 1.0 {
                self.charge_remaining = CHARGE_DURATION;
                self.charge_meter = 0.0;
            }
        }
    }

    pub fn is_aiming(&self) -> bool {
        self.aiming
    }

    pub fn is_charging(&self) -> bool {
        self.charge_remaining > 0.0
    }

    /// Ground speed cap for the class in its current state
    pub fn max_speed(&self) -> f32 {
        if self.is_charging() {
            return 750.0;
        }
        if self.aiming {
            return 110.0;
        }
        match self.class {
            PlayerClass::Scout => 400.0,
            PlayerClass::Soldier => 240.0,
            PlayerClass::Pyro | PlayerClass::Engineer | PlayerClass::Sniper => 300.0,
            PlayerClass::Demoman => 280.0,
            PlayerClass::Heavy => 230.0,
            PlayerClass::Medic | PlayerClass::Spy => 320.0,
        }
    }
}

impl ClassMovement for ClassState {
    fn player_class(&self) -> PlayerClass {
        self.class
    }

    fn in_condition(&self, condition: Condition) -> bool {
        match condition {
            Condition::Aiming => self.aiming,
            Condition::ShieldCharge => self.is_charging(),
        }
    }

    fn is_ducking(&self) -> bool {
        self.ducking
    }

    fn charge_turn_cap(&self) -> f32 {
        CHARGE_TURN_CAP
    }
}

/// A player simulated by the driver
#[derive(Debug, Clone)]
pub struct SimPlayer {
    pub id: Uuid,
    pub display_name: String,
    origin: Vec3,
    velocity: Vec3,
    eye_angles: Vec3,
    class: Option<ClassState>,
    vehicle: Option<SimVehicle>,
    current_command: Option<UserCmd>,
}

impl SimPlayer {
    /// A player with class-specific movement rules
    pub fn new(id: Uuid, display_name: String, class: PlayerClass, spawn: Vec3) -> Self {
        Self {
            class: Some(ClassState::new(class)),
            ..Self::plain(id, display_name, spawn)
        }
    }

    /// A player without class state; class rules never apply
    pub fn plain(id: Uuid, display_name: String, spawn: Vec3) -> Self {
        Self {
            id,
            display_name,
            origin: spawn,
            velocity: Vec3::ZERO,
            eye_angles: Vec3::ZERO,
            class: None,
            vehicle: None,
            current_command: None,
        }
    }

    pub fn class_state(&self) -> Option<&ClassState> {
        self.class.as_ref()
    }

    pub fn class_state_mut(&mut self) -> Option<&mut ClassState> {
        self.class.as_mut()
    }

    pub fn current_command(&self) -> Option<&UserCmd> {
        self.current_command.as_ref()
    }

    pub fn occupied_vehicle(&self) -> Option<&SimVehicle> {
        self.vehicle.as_ref()
    }

    pub fn in_vehicle(&self) -> bool {
        self.vehicle.is_some()
    }

    /// Take the driver's seat. Returns the vehicle back if already occupying one.
    pub fn enter_vehicle(&mut self, vehicle: SimVehicle) -> Result<(), SimVehicle> {
        if self.vehicle.is_some() {
            return Err(vehicle);
        }
        self.velocity = Vec3::ZERO;
        self.vehicle = Some(vehicle);
        Ok(())
    }

    /// Leave the occupied vehicle, stepping out beside it.
    pub fn exit_vehicle(&mut self) -> Option<SimVehicle> {
        let vehicle = self.vehicle.take()?;
        self.origin = vehicle.position() + EXIT_OFFSET;
        self.velocity = Vec3::ZERO;
        Some(vehicle)
    }
}

impl MovePlayer for SimPlayer {
    fn id(&self) -> Uuid {
        self.id
    }

    fn abs_origin(&self) -> Vec3 {
        // Seated players ride along with the vehicle
        match &self.vehicle {
            Some(vehicle) => vehicle.position(),
            None => self.origin,
        }
    }

    fn set_abs_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn max_speed(&self) -> f32 {
        self.class.as_ref().map(ClassState::max_speed).unwrap_or(300.0)
    }

    fn eye_angles(&self) -> Vec3 {
        self.eye_angles
    }

    fn snap_eye_angles(&mut self, angles: Vec3) {
        self.eye_angles = angles;
    }

    fn set_current_command(&mut self, cmd: &UserCmd) {
        self.current_command = Some(cmd.clone());
    }

    fn vehicle(&mut self) -> Option<&mut dyn ServerVehicle> {
        match self.vehicle.as_mut() {
            Some(vehicle) => Some(vehicle),
            None => None,
        }
    }

    fn class_movement(&mut self) -> Option<&mut dyn ClassMovement> {
        match self.class.as_mut() {
            Some(class) => Some(class),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::vehicle::Buggy;

    fn held(buttons: &[u32]) -> UserCmd {
        let mut cmd = UserCmd::default();
        for button in buttons {
            cmd.buttons.press(*button);
        }
        cmd
    }

    #[test]
    fn test_heavy_aims_while_firing() {
        let mut state = ClassState::new(PlayerClass::Heavy);
        state.update_from_command(&held(&[CommandButtons::ATTACK, CommandButtons::DUCK]), 0.015);
        assert!(state.in_condition(Condition::Aiming));
        assert!(state.is_ducking());
        assert_eq!(state.max_speed(), 110.0);

        state.update_from_command(&UserCmd::default(), 0.015);
        assert!(!state.in_condition(Condition::Aiming));
    }

    #[test]
    fn test_only_heavy_aims() {
        let mut state = ClassState::new(PlayerClass::Soldier);
        state.update_from_command(&held(&[CommandButtons::ATTACK]), 0.015);
        assert!(!state.is_aiming());
    }

    #[test]
    fn test_demoman_charge_lifecycle() {
        let mut state = ClassState::new(PlayerClass::Demoman);
        state.update_from_command(&held(&[CommandButtons::ATTACK2]), 0.1);
        assert!(state.in_condition(Condition::ShieldCharge));

        // Runs out after the charge duration
        for _ in 0..16 {
            state.update_from_command(&UserCmd::default(), 0.1);
        }
        assert!(!state.is_charging());

        // Meter is empty, cannot charge again right away
        state.update_from_command(&held(&[CommandButtons::ATTACK2]), 0.1);
        assert!(!state.is_charging());
    }

    #[test]
    fn test_seated_player_follows_vehicle() {
        let mut player = SimPlayer::plain(Uuid::new_v4(), "p".into(), Vec3::ZERO);
        let mut buggy = Buggy::new(Vec3::new(100.0, 0.0, 0.0));
        buggy.body.position.y = 20.0;

        assert!(player.enter_vehicle(SimVehicle::Buggy(buggy)).is_ok());
        assert!(MovePlayer::vehicle(&mut player).is_some());
        assert_eq!(player.abs_origin(), Vec3::new(100.0, 20.0, 0.0));

        let vehicle = player.exit_vehicle().unwrap();
        assert_eq!(vehicle.position(), Vec3::new(100.0, 20.0, 0.0));
        assert_eq!(player.abs_origin(), Vec3::new(100.0, 84.0, 0.0));
        assert!(!player.in_vehicle());
    }

    #[test]
    fn test_plain_player_has_no_class_movement() {
        let mut player = SimPlayer::plain(Uuid::new_v4(), "p".into(), Vec3::ZERO);
        assert!(player.class_movement().is_none());
        assert_eq!(player.max_speed(), 300.0);
    }
}
