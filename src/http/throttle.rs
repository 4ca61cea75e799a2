//! Request throttling
//!
//! Token bucket over the governor crate, shared by every worker that holds a
//! clone of the client.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared requests-per-second limit
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    per_second: NonZeroU32,
}

impl Throttle {
    /// Limit to `per_second` requests, bursting up to the same amount.
    /// Returns `None` for zero, which means unthrottled.
    pub fn per_second(per_second: u32) -> Option<Self> {
        let per_second = NonZeroU32::new(per_second)?;
        Some(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            per_second,
        })
    }

    /// Wait for a permit
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("per_second", &self.per_second)
            .finish()
    }
}
