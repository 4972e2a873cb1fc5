//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

/// Tunables for the movement interception rules
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementConfig {
    /// Multiplier applied to the class charge cap (lag tolerance)
    pub charge_yaw_tolerance: f32,
    /// Vehicle displacement above which a sample is treated as a teleport
    pub vehicle_teleport_distance: f32,
    /// Vehicle displacement below which an overturned vehicle counts as settled
    pub vehicle_settle_distance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            charge_yaw_tolerance: 2.5,
            vehicle_teleport_distance: 100.0,
            vehicle_settle_distance: 0.5,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Fixed-step simulation rate
    pub simulation_tps: u32,
    /// Ticks between movement snapshots
    pub snapshot_interval_ticks: u32,
    /// Zero-duration replays allowed per player per tick
    pub max_backlog_commands: usize,
    /// Commands accepted per second per player
    pub command_rate_limit: u32,

    /// Ticks to run before exiting (0 = until Ctrl+C)
    pub demo_ticks: u64,
    /// Seed for synthetic bot input
    pub demo_seed: u64,

    pub movement: MovementConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            simulation_tps: 66,
            snapshot_interval_ticks: 33,
            max_backlog_commands: 8,
            command_rate_limit: 128,
            demo_ticks: 0,
            demo_seed: 42,
            movement: MovementConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();
        let movement_defaults = MovementConfig::default();

        let config = Self {
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            simulation_tps: parse_or(&lookup, "SIMULATION_TPS", defaults.simulation_tps)?,
            snapshot_interval_ticks: parse_or(
                &lookup,
                "SNAPSHOT_INTERVAL_TICKS",
                defaults.snapshot_interval_ticks,
            )?,
            max_backlog_commands: parse_or(
                &lookup,
                "MAX_BACKLOG_COMMANDS",
                defaults.max_backlog_commands,
            )?,
            command_rate_limit: parse_or(&lookup, "COMMAND_RATE_LIMIT", defaults.command_rate_limit)?,
            demo_ticks: parse_or(&lookup, "DEMO_TICKS", defaults.demo_ticks)?,
            demo_seed: parse_or(&lookup, "DEMO_SEED", defaults.demo_seed)?,
            movement: MovementConfig {
                charge_yaw_tolerance: parse_or(
                    &lookup,
                    "CHARGE_YAW_TOLERANCE",
                    movement_defaults.charge_yaw_tolerance,
                )?,
                vehicle_teleport_distance: parse_or(
                    &lookup,
                    "VEHICLE_TELEPORT_DISTANCE",
                    movement_defaults.vehicle_teleport_distance,
                )?,
                vehicle_settle_distance: parse_or(
                    &lookup,
                    "VEHICLE_SETTLE_DISTANCE",
                    movement_defaults.vehicle_settle_distance,
                )?,
            },
        };

        if config.simulation_tps == 0 {
            return Err(ConfigError::Invalid {
                name: "SIMULATION_TPS",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.simulation_tps, 66);
        assert_eq!(config.movement, MovementConfig::default());
        assert_eq!(config.movement.charge_yaw_tolerance, 2.5);
        assert_eq!(config.movement.vehicle_teleport_distance, 100.0);
        assert_eq!(config.movement.vehicle_settle_distance, 0.5);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LOG_LEVEL", "debug"),
            ("SIMULATION_TPS", "30"),
            ("VEHICLE_SETTLE_DISTANCE", " 1.25 "),
        ]))
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.simulation_tps, 30);
        assert_eq!(config.movement.vehicle_settle_distance, 1.25);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("MAX_BACKLOG_COMMANDS", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "MAX_BACKLOG_COMMANDS", .. }
        ));
    }

    #[test]
    fn test_zero_tick_rate_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("SIMULATION_TPS", "0")])).is_err());
    }
}
