//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Default tick rate
pub const DEFAULT_SIMULATION_TPS: u32 = 66;

/// Seconds simulated by one tick at the given rate
pub fn tick_delta(tps: u32) -> f32 {
    1.0 / tps.max(1) as f32
}

/// Wall-clock duration of one tick at the given rate
pub fn tick_duration(tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / tps.max(1) as u64)
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_delta_matches_duration() {
        assert_eq!(tick_duration(DEFAULT_SIMULATION_TPS), Duration::from_micros(15_151));
        assert!((tick_delta(DEFAULT_SIMULATION_TPS) - 0.015_151_5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_rate_does_not_divide_by_zero() {
        assert_eq!(tick_delta(0), 1.0);
        assert_eq!(tick_duration(0), Duration::from_secs(1));
    }
}
