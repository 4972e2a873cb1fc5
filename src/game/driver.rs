//! Authoritative fixed-step movement loop
//!
//! The driver owns the movement interceptor and every simulated player, and
//! runs one start/setup/integrate/finish cycle per player per tick.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::movement::{
    BasePlayerMove, CommandButtons, MoveData, MovePlayer, MovementInterceptor, TickPhaseHandler,
    TouchList, UserCmd,
};
use crate::util::rate_limit::CommandRateLimiter;
use crate::util::time::{tick_delta, tick_duration, unix_millis, Timer};

use super::physics::{PhysicsSystem, WalkStats};
use super::player::SimPlayer;
use super::snapshot::{MovementSnapshot, SnapshotBuilder};
use super::vehicle::SimVehicle;

/// How close a player must be to a vehicle to climb in
pub const USE_REACH: f32 = 96.0;

/// A command received from a client
#[derive(Debug, Clone)]
pub struct PlayerCommand {
    pub player_id: Uuid,
    pub cmd: UserCmd,
    pub received_at: u64,
}

/// Driver errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Unknown player: {0}")]
    UnknownPlayer(Uuid),

    #[error("Player already in simulation: {0}")]
    DuplicatePlayer(Uuid),

    #[error("Command channel closed")]
    ChannelClosed,
}

/// Handle for feeding commands to a running driver
#[derive(Clone)]
pub struct DriverHandle {
    pub command_tx: mpsc::Sender<PlayerCommand>,
    pub snapshot_tx: broadcast::Sender<MovementSnapshot>,
}

impl DriverHandle {
    /// Queue a command for the next tick
    pub async fn submit(&self, player_id: Uuid, cmd: UserCmd) -> Result<(), DriverError> {
        self.command_tx
            .send(PlayerCommand {
                player_id,
                cmd,
                received_at: unix_millis(),
            })
            .await
            .map_err(|_| DriverError::ChannelClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MovementSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

/// Pending commands for one player
struct CommandQueue {
    pending: VecDeque<UserCmd>,
    limiter: CommandRateLimiter,
    last_command_number: u32,
}

impl CommandQueue {
    fn new(commands_per_second: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            limiter: CommandRateLimiter::new(commands_per_second),
            last_command_number: 0,
        }
    }
}

/// The simulation driver
pub struct SimulationDriver<S = BasePlayerMove> {
    interceptor: MovementInterceptor<S>,
    players: HashMap<Uuid, SimPlayer>,
    queues: HashMap<Uuid, CommandQueue>,
    parked: Vec<SimVehicle>,
    walk_stats: WalkStats,
    helper: TouchList,
    command_rx: mpsc::Receiver<PlayerCommand>,
    snapshot_tx: broadcast::Sender<MovementSnapshot>,
    snapshot_builder: SnapshotBuilder,
    tick: u64,
    tps: u32,
    max_backlog: usize,
    command_rate_limit: u32,
}

impl<S: TickPhaseHandler> SimulationDriver<S> {
    /// Create a driver around an already-built interceptor
    pub fn new(config: &Config, interceptor: MovementInterceptor<S>) -> (Self, DriverHandle) {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = DriverHandle {
            command_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let driver = Self {
            interceptor,
            players: HashMap::new(),
            queues: HashMap::new(),
            parked: Vec::new(),
            walk_stats: WalkStats::default(),
            helper: TouchList::new(),
            command_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(config.snapshot_interval_ticks),
            tick: 0,
            tps: config.simulation_tps,
            max_backlog: config.max_backlog_commands,
            command_rate_limit: config.command_rate_limit,
        };

        (driver, handle)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn interceptor(&self) -> &MovementInterceptor<S> {
        &self.interceptor
    }

    pub fn player(&self, id: &Uuid) -> Option<&SimPlayer> {
        self.players.get(id)
    }

    pub fn parked_vehicles(&self) -> &[SimVehicle] {
        &self.parked
    }

    pub fn add_player(&mut self, player: SimPlayer) -> Result<(), DriverError> {
        if self.players.contains_key(&player.id) {
            return Err(DriverError::DuplicatePlayer(player.id));
        }

        info!(
            player_id = %player.id,
            name = %player.display_name,
            "Player joined simulation"
        );
        self.queues
            .insert(player.id, CommandQueue::new(self.command_rate_limit));
        self.players.insert(player.id, player);
        Ok(())
    }

    /// Remove a player, parking any vehicle they were driving
    pub fn remove_player(&mut self, id: &Uuid) -> Result<SimPlayer, DriverError> {
        let mut player = self
            .players
            .remove(id)
            .ok_or(DriverError::UnknownPlayer(*id))?;
        self.queues.remove(id);
        self.interceptor.remove_player(id);

        if let Some(vehicle) = player.exit_vehicle() {
            self.parked.push(vehicle);
        }

        info!(player_id = %id, "Player left simulation");
        Ok(player)
    }

    pub fn spawn_vehicle(&mut self, vehicle: SimVehicle) {
        info!(vehicle_id = %vehicle.id(), kind = ?vehicle.kind(), "Vehicle spawned");
        self.parked.push(vehicle);
    }

    /// Queue a command. Returns false if it was dropped (rate limit or stale).
    pub fn enqueue(&mut self, command: PlayerCommand) -> Result<bool, DriverError> {
        let queue = self
            .queues
            .get_mut(&command.player_id)
            .ok_or(DriverError::UnknownPlayer(command.player_id))?;

        if !queue.limiter.check() {
            warn!(player_id = %command.player_id, "Command rate limit exceeded");
            return Ok(false);
        }

        if command.cmd.command_number <= queue.last_command_number {
            debug!(
                player_id = %command.player_id,
                command_number = command.cmd.command_number,
                "Dropping stale command"
            );
            return Ok(false);
        }

        queue.last_command_number = command.cmd.command_number;
        queue.pending.push_back(command.cmd);
        Ok(true)
    }

    /// Process all pending commands from the channel
    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            if let Err(e) = self.enqueue(command) {
                warn!(error = %e, "Rejected command");
            }
        }
    }

    /// Run a single simulation tick
    pub fn step(&mut self) -> Option<MovementSnapshot> {
        let timer = Timer::new();
        self.drain_commands();
        self.tick += 1;

        let dt = tick_delta(self.tps);
        let mut occupancy_changed = false;

        for (id, player) in self.players.iter_mut() {
            let Some(queue) = self.queues.get_mut(id) else {
                continue;
            };
            let Some(live) = queue.pending.pop_back() else {
                continue;
            };

            // Older commands are replayed without advancing time
            let dropped = queue.pending.len().saturating_sub(self.max_backlog);
            if dropped > 0 {
                warn!(player_id = %id, dropped, "Backlog over limit, dropping oldest commands");
                queue.pending.drain(..dropped);
            }

            let mut phases = Phases {
                interceptor: &mut self.interceptor,
                helper: &mut self.helper,
                walk_stats: &self.walk_stats,
                parked: &mut self.parked,
            };

            for cmd in queue.pending.drain(..) {
                occupancy_changed |= phases.run_command(player, cmd, 0.0);
            }
            occupancy_changed |= phases.run_command(player, live, dt);
        }

        if occupancy_changed {
            self.snapshot_builder.force_next();
        }

        let elapsed = timer.elapsed();
        if elapsed > tick_duration(self.tps) {
            warn!(
                tick = self.tick,
                elapsed_us = timer.elapsed_micros(),
                "Tick overran its budget"
            );
        }

        if !self.snapshot_builder.should_send() {
            return None;
        }

        let snapshot =
            self.snapshot_builder
                .build(self.tick, &self.interceptor, &self.players, &self.parked);
        let _ = self.snapshot_tx.send(snapshot.clone());
        Some(snapshot)
    }

    /// Run the fixed-step loop until `max_ticks` (forever when `None`)
    pub async fn run(mut self, max_ticks: Option<u64>) -> Self {
        info!(tps = self.tps, players = self.players.len(), "Simulation started");

        let mut tick_interval = interval(tick_duration(self.tps));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.step();

            if max_ticks.is_some_and(|max| self.tick >= max) {
                break;
            }
        }

        info!(ticks = self.tick, "Simulation stopped");
        self
    }
}

/// Borrowed pieces needed to run one player command
struct Phases<'a, S> {
    interceptor: &'a mut MovementInterceptor<S>,
    helper: &'a mut TouchList,
    walk_stats: &'a WalkStats,
    parked: &'a mut Vec<SimVehicle>,
}

impl<S: TickPhaseHandler> Phases<'_, S> {
    /// Run one command through every phase. Returns true if the player
    /// entered or left a vehicle.
    fn run_command(&mut self, player: &mut SimPlayer, mut cmd: UserCmd, frame_time: f32) -> bool {
        let use_pressed = cmd.buttons.pressed(CommandButtons::USE)
            && !player
                .current_command()
                .is_some_and(|prev| prev.buttons.pressed(CommandButtons::USE));

        if let Some(class) = player.class_state_mut() {
            class.update_from_command(&cmd, frame_time);
        }

        let toggled = frame_time > 0.0 && use_pressed && self.toggle_vehicle(player);

        self.interceptor.start_command(player, &cmd);

        let mut mv = MoveData::new(frame_time);
        self.interceptor
            .setup_move(player, &mut cmd, &mut *self.helper, &mut mv);

        if !player.in_vehicle() {
            PhysicsSystem::walk_move(&mut mv, self.walk_stats);
        }

        self.interceptor.finish_move(player, &cmd, &mut mv);
        toggled
    }

    /// Enter the nearest parked vehicle in reach, or leave the current one.
    fn toggle_vehicle(&mut self, player: &mut SimPlayer) -> bool {
        if let Some(vehicle) = player.exit_vehicle() {
            debug!(player_id = %player.id, vehicle_id = %vehicle.id(), "Exited vehicle");
            self.parked.push(vehicle);
            return true;
        }

        let origin = player.abs_origin();
        let nearest = self
            .parked
            .iter()
            .enumerate()
            .filter(|(_, v)| PhysicsSystem::within_reach(origin, v.position(), USE_REACH))
            .min_by(|(_, a), (_, b)| {
                let da = a.position().distance_squared(origin);
                let db = b.position().distance_squared(origin);
                da.total_cmp(&db)
            })
            .map(|(idx, _)| idx);

        let Some(idx) = nearest else {
            return false;
        };

        let vehicle = self.parked.swap_remove(idx);
        let vehicle_id = vehicle.id();
        match player.enter_vehicle(vehicle) {
            Ok(()) => {
                debug!(player_id = %player.id, vehicle_id = %vehicle_id, "Entered vehicle");
                true
            }
            Err(vehicle) => {
                self.parked.push(vehicle);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::vehicle::{Buggy, Turret};
    use crate::movement::{PlayerClass, VehicleOccupancy};
    use glam::Vec3;

    fn driver() -> (SimulationDriver, DriverHandle) {
        let config = Config {
            snapshot_interval_ticks: 1,
            ..Config::default()
        };
        let interceptor = MovementInterceptor::with_base_solver(config.movement);
        SimulationDriver::new(&config, interceptor)
    }

    fn command(player_id: Uuid, number: u32, cmd: UserCmd) -> PlayerCommand {
        PlayerCommand {
            player_id,
            cmd: UserCmd {
                command_number: number,
                ..cmd
            },
            received_at: 0,
        }
    }

    fn forward() -> UserCmd {
        UserCmd {
            forward_move: 450.0,
            ..Default::default()
        }
    }

    fn pressing(button: u32) -> UserCmd {
        let mut cmd = UserCmd::default();
        cmd.buttons.press(button);
        cmd
    }

    #[test]
    fn test_add_player_twice_fails() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();
        let err = driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap_err();
        assert!(matches!(err, DriverError::DuplicatePlayer(_)));
    }

    #[test]
    fn test_unknown_player_command_rejected() {
        let (mut driver, _handle) = driver();
        let err = driver
            .enqueue(command(Uuid::new_v4(), 1, forward()))
            .unwrap_err();
        assert!(matches!(err, DriverError::UnknownPlayer(_)));
    }

    #[test]
    fn test_stale_command_dropped() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();

        assert!(driver.enqueue(command(id, 5, forward())).unwrap());
        assert!(!driver.enqueue(command(id, 5, forward())).unwrap());
        assert!(!driver.enqueue(command(id, 3, forward())).unwrap());
    }

    #[test]
    fn test_step_moves_player_and_records_origin() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::new(id, "a".into(), PlayerClass::Scout, Vec3::ZERO))
            .unwrap();

        driver.enqueue(command(id, 1, forward())).unwrap();
        let snapshot = driver.step().unwrap();

        let player = driver.player(&id).unwrap();
        assert!(player.abs_origin().x > 0.0);
        assert_eq!(snapshot.players[0].last_command, Some(1));
        assert_eq!(snapshot.players[0].occupancy, VehicleOccupancy::OnFoot);

        // Saved origin is taken during setup, before this tick's movement
        let ctx = driver.interceptor().context(&id).unwrap();
        assert_eq!(ctx.saved_origin, Some(Vec3::ZERO));
    }

    #[test]
    fn test_backlog_commands_do_not_advance_time() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::new(id, "a".into(), PlayerClass::Scout, Vec3::ZERO))
            .unwrap();

        for number in 1..=4 {
            driver.enqueue(command(id, number, forward())).unwrap();
        }
        driver.step();
        let after_burst = driver.player(&id).unwrap().abs_origin();

        let (mut single, _handle) = self::driver();
        single
            .add_player(SimPlayer::new(id, "a".into(), PlayerClass::Scout, Vec3::ZERO))
            .unwrap();
        single.enqueue(command(id, 1, forward())).unwrap();
        single.step();

        assert_eq!(after_burst, single.player(&id).unwrap().abs_origin());
        assert_eq!(
            driver.player(&id).unwrap().current_command().map(|c| c.command_number),
            Some(4)
        );
    }

    #[test]
    fn test_use_enters_and_leaves_vehicle() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::new(id, "a".into(), PlayerClass::Scout, Vec3::ZERO))
            .unwrap();
        driver.spawn_vehicle(SimVehicle::Buggy(Buggy::new(Vec3::new(50.0, 0.0, 0.0))));

        driver
            .enqueue(command(id, 1, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();

        assert!(driver.player(&id).unwrap().in_vehicle());
        assert!(driver.parked_vehicles().is_empty());
        // First finish sampled the buggy, so the entry tick is over
        assert_eq!(
            driver.interceptor().occupancy(&id),
            VehicleOccupancy::InVehicle
        );

        // Holding use does not toggle again
        driver
            .enqueue(command(id, 2, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();
        assert!(driver.player(&id).unwrap().in_vehicle());

        driver.enqueue(command(id, 3, UserCmd::default())).unwrap();
        driver.step();
        driver
            .enqueue(command(id, 4, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();

        assert!(!driver.player(&id).unwrap().in_vehicle());
        assert_eq!(driver.parked_vehicles().len(), 1);
        let ctx = driver.interceptor().context(&id).unwrap();
        assert!(!ctx.was_in_vehicle);
        assert!(!ctx.vehicle_flipped);
    }

    #[test]
    fn test_vehicle_out_of_reach_is_ignored() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();
        driver.spawn_vehicle(SimVehicle::Turret(Turret::new(Vec3::new(500.0, 0.0, 0.0))));

        driver
            .enqueue(command(id, 1, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();

        assert!(!driver.player(&id).unwrap().in_vehicle());
    }

    #[test]
    fn test_turret_occupant_settles_in_vehicle() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();
        driver.spawn_vehicle(SimVehicle::Turret(Turret::new(Vec3::new(20.0, 0.0, 0.0))));

        driver
            .enqueue(command(id, 1, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();

        for number in 2..=6 {
            driver
                .enqueue(command(id, number, UserCmd::default()))
                .unwrap();
            let snapshot = driver.step().unwrap();
            assert_eq!(snapshot.players[0].occupancy, VehicleOccupancy::InVehicle);
        }
        assert!(driver.player(&id).unwrap().in_vehicle());
    }

    #[test]
    fn test_flipped_buggy_is_reported() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();
        let mut buggy = Buggy::new(Vec3::new(10.0, 0.0, 0.0));
        buggy.body.roll = 160.0;
        driver.spawn_vehicle(SimVehicle::Buggy(buggy));

        driver
            .enqueue(command(id, 1, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();
        driver.enqueue(command(id, 2, UserCmd::default())).unwrap();
        let snapshot = driver.step().unwrap();

        assert_eq!(snapshot.players[0].occupancy, VehicleOccupancy::SettledFlipped);
        assert!(snapshot.players[0].vehicle_flipped);
        assert_eq!(snapshot.vehicles[0].overturned, Some(true));
    }

    #[test]
    fn test_remove_player_parks_vehicle() {
        let (mut driver, _handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();
        driver.spawn_vehicle(SimVehicle::Buggy(Buggy::new(Vec3::ZERO)));
        driver
            .enqueue(command(id, 1, pressing(CommandButtons::USE)))
            .unwrap();
        driver.step();

        driver.remove_player(&id).unwrap();
        assert_eq!(driver.parked_vehicles().len(), 1);
        assert!(driver.interceptor().context(&id).is_none());
        assert!(matches!(
            driver.remove_player(&id),
            Err(DriverError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_handle_submits_through_channel() {
        let (mut driver, handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();

        let cmd = UserCmd {
            command_number: 1,
            ..forward()
        };
        tokio_test::assert_ok!(tokio_test::block_on(handle.submit(id, cmd)));

        let mut snapshots = handle.subscribe();
        driver.step();

        let snapshot = snapshots.try_recv().unwrap();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.players[0].last_command, Some(1));
    }

    #[tokio::test]
    async fn test_run_stops_after_max_ticks() {
        let (mut driver, handle) = driver();
        let id = Uuid::new_v4();
        driver
            .add_player(SimPlayer::plain(id, "a".into(), Vec3::ZERO))
            .unwrap();
        handle
            .submit(id, UserCmd { command_number: 1, ..forward() })
            .await
            .unwrap();

        let driver = driver.run(Some(3)).await;
        assert_eq!(driver.tick(), 3);
        assert!(driver.player(&id).unwrap().abs_origin().x > 0.0);
    }
}
