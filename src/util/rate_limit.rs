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

/// Default commands per second from one connection
pub const MOVE_RATE_LIMIT: u32 = 10;

/// Per-connection command limiter
#[derive(Clone)]
pub struct SessionRateLimiter {
    commands: Arc<Limiter>,
}

impl SessionRateLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            commands: create_limiter(per_second),
        }
    }

    /// Check if a command is allowed (returns true if allowed)
    pub fn check_command(&self) -> bool {
        self.commands.check().is_ok()
    }
}

impl Default for SessionRateLimiter {
    fn default() -> Self {
        Self::new(MOVE_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_rejected() {
        let limiter = SessionRateLimiter::new(3);
        let allowed = (0..10).filter(|_| limiter.check_command()).count();
        assert_eq!(allowed, 3);
    }

    #[test]
    fn zero_quota_still_allows_one() {
        let limiter = SessionRateLimiter::new(0);
        assert!(limiter.check_command());
        assert!(!limiter.check_command());
    }
}
