//! Request rate limiter
//!
//! Token bucket expressed as a theoretical arrival time (GCRA): permits are
//! issued at a steady `rate` per second, with up to `burst` permits
//! available back to back after an idle period. One limiter is shared by
//! every in-flight request of a transport.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Rate limiter handing out permits at a fixed steady rate.
#[derive(Debug)]
pub struct RateLimiter {
    /// Spacing between permits at the steady rate
    interval: Duration,
    /// How far ahead of schedule a caller may run (burst - 1 intervals)
    tolerance: Duration,
    /// Theoretical arrival time of the next permit
    next_at: Mutex<Instant>,
}

impl RateLimiter {
    /// Create a limiter issuing `per_second` permits per second with a
    /// burst capacity of `burst`. Zero values are raised to one.
    pub fn new(per_second: u32, burst: u32) -> Self {
        let interval = Duration::from_secs(1) / per_second.max(1);
        let tolerance = interval * (burst.max(1) - 1);
        Self {
            interval,
            tolerance,
            next_at: Mutex::new(Instant::now()),
        }
    }

    /// Spacing between two permits at the steady rate.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a permit is available and take it.
    ///
    /// The schedule lock is held while waiting, so callers are served in
    /// the order they arrived and no permit is handed out twice.
    pub async fn acquire(&self) {
        let mut next_at = self.next_at.lock().await;
        let now = Instant::now();
        let tat = (*next_at).max(now);
        if tat > now + self.tolerance {
            sleep_until(tat - self.tolerance).await;
        }
        *next_at = tat + self.interval;
    }

    /// Take a permit only if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut next_at) = self.next_at.try_lock() else {
            return false;
        };
        let now = Instant::now();
        let tat = (*next_at).max(now);
        if tat > now + self.tolerance {
            return false;
        }
        *next_at = tat + self.interval;
        true
    }
}
