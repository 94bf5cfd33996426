//! Inter-call throttling for external services.
//!
//! A governor quota with one cell per `delay` and a burst of one: the first
//! call goes through immediately, each later call waits until `delay` has
//! passed since the previous one.

use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Enforces a fixed minimum gap between calls to one service.
///
/// Cloning shares the limiter, so clones throttle together.
#[derive(Clone)]
pub struct Throttle {
    limiter: Option<Arc<DefaultRateLimiter>>,
    delay: Duration,
}

impl Throttle {
    /// Create a throttle. A zero delay disables throttling.
    pub fn new(delay: Duration) -> Self {
        let limiter = Quota::with_period(delay)
            .map(|quota| quota.allow_burst(nonzero_ext::nonzero!(1u32)))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));

        Self { limiter, delay }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured gap.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for permission to make the next call.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").field("delay", &self.delay).finish()
    }
}
