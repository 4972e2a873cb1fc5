//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Default command intake limit per player (about two ticks' worth per tick)
pub const COMMAND_RATE_LIMIT: u32 = 128;

/// Per-player command rate limiter state
#[derive(Clone)]
pub struct CommandRateLimiter {
    limiter: Arc<Limiter>,
}

impl CommandRateLimiter {
    pub fn new(commands_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(commands_per_second),
        }
    }

    /// Check if a command is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for CommandRateLimiter {
    fn default() -> Self {
        Self::new(COMMAND_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_capped() {
        let limiter = CommandRateLimiter::new(3);
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }
}
