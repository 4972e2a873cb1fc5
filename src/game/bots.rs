//! Scripted bots that feed commands into the driver
//!
//! Used by the demo binary to exercise aim lock, charge turning and
//! vehicle occupancy without real clients.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::movement::{CommandButtons, PlayerClass, TickPhaseHandler, UserCmd};
use crate::util::time::tick_duration;

use super::driver::{DriverError, DriverHandle, SimulationDriver};
use super::player::SimPlayer;
use super::vehicle::{Buggy, SimVehicle, Turret};

/// Full move intent on one axis
const FULL_MOVE: f32 = 450.0;

/// What a bot does every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotScript {
    /// Random walking and looking around
    Wander,
    /// Crouched minigun fire while trying to move and jump
    CrouchFire,
    /// Periodic shield charges with wild turning
    ChargeTurn,
    /// Climbs into the nearest vehicle and drives hard turns
    Drive,
}

/// A scripted player
pub struct Bot {
    pub player_id: Uuid,
    pub script: BotScript,
    rng: ChaCha8Rng,
    command_number: u32,
    yaw: f32,
}

impl Bot {
    pub fn new(player_id: Uuid, script: BotScript, seed: u64) -> Self {
        Self {
            player_id,
            script,
            rng: ChaCha8Rng::seed_from_u64(seed),
            command_number: 0,
            yaw: 0.0,
        }
    }

    /// Produce the next command in sequence
    pub fn next_command(&mut self) -> UserCmd {
        self.command_number += 1;
        let tick = self.command_number;

        let mut cmd = UserCmd {
            command_number: tick,
            ..Default::default()
        };

        match self.script {
            BotScript::Wander => {
                self.yaw += self.rng.gen_range(-5.0..5.0);
                cmd.forward_move = self.rng.gen_range(0.0..FULL_MOVE);
                cmd.side_move = self.rng.gen_range(-FULL_MOVE..FULL_MOVE) * 0.5;
                if self.rng.gen_bool(0.02) {
                    cmd.buttons.press(CommandButtons::JUMP);
                }
            }
            BotScript::CrouchFire => {
                self.yaw += self.rng.gen_range(-1.0..1.0);
                cmd.buttons.press(CommandButtons::ATTACK);
                cmd.buttons.press(CommandButtons::DUCK);
                cmd.forward_move = FULL_MOVE;
                cmd.side_move = self.rng.gen_range(-FULL_MOVE..FULL_MOVE);
                if tick % 30 == 0 {
                    cmd.buttons.press(CommandButtons::JUMP);
                }
            }
            BotScript::ChargeTurn => {
                cmd.forward_move = FULL_MOVE;
                self.yaw += self.rng.gen_range(-45.0..45.0);
                if tick % 200 == 1 {
                    cmd.buttons.press(CommandButtons::ATTACK2);
                }
            }
            BotScript::Drive => {
                if tick == 1 {
                    cmd.buttons.press(CommandButtons::USE);
                } else {
                    cmd.forward_move = FULL_MOVE;
                    // Long hard turns to roll the buggy, then try to right it
                    let phase = tick % 600;
                    if phase < 400 {
                        cmd.side_move = FULL_MOVE;
                    } else if phase % 2 == 0 {
                        cmd.buttons.press(CommandButtons::JUMP);
                    }
                }
            }
        }

        self.yaw = self.yaw.rem_euclid(360.0);
        cmd.set_yaw(self.yaw);
        cmd
    }
}

/// Fill the driver with a small scripted world and return the bots to drive it.
pub fn populate_demo_world<S: TickPhaseHandler>(
    driver: &mut SimulationDriver<S>,
    seed: u64,
) -> Result<Vec<Bot>, DriverError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut spawn = || Vec3::new(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0), 0.0);

    let roster = [
        ("heavy", Some(PlayerClass::Heavy), BotScript::CrouchFire),
        ("demoman", Some(PlayerClass::Demoman), BotScript::ChargeTurn),
        ("scout", Some(PlayerClass::Scout), BotScript::Drive),
        ("spectator", None, BotScript::Wander),
    ];

    let mut bots = Vec::with_capacity(roster.len());
    for (index, (name, class, script)) in roster.into_iter().enumerate() {
        let id = Uuid::new_v4();
        let position = spawn();

        let player = match class {
            Some(class) => SimPlayer::new(id, name.to_string(), class, position),
            None => SimPlayer::plain(id, name.to_string(), position),
        };
        driver.add_player(player)?;

        if script == BotScript::Drive {
            driver.spawn_vehicle(SimVehicle::Buggy(Buggy::new(position + Vec3::X * 40.0)));
        }

        bots.push(Bot::new(id, script, seed.wrapping_add(index as u64 + 1)));
    }

    driver.spawn_vehicle(SimVehicle::Turret(Turret::new(spawn())));

    info!(bots = bots.len(), seed, "Demo world populated");
    Ok(bots)
}

/// Submit one command per bot per tick until the driver goes away.
pub async fn run_bots(mut bots: Vec<Bot>, handle: DriverHandle, tps: u32) {
    let mut tick_interval = interval(tick_duration(tps));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick_interval.tick().await;
        for bot in bots.iter_mut() {
            let cmd = bot.next_command();
            if let Err(e) = handle.submit(bot.player_id, cmd).await {
                debug!(error = %e, "Bot input stopped");
                return;
            }
        }
    }
}
