//! Sliding-window rate limiting for remote API calls.
//!
//! The remote service enforces a per-minute request quota. One
//! [`RateLimiter`] instance is shared (via `Arc`) by every worker in the map
//! stage, so the cap holds across the whole pool rather than per worker.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Safety margin added to the computed wait so a call issued right at the
/// window edge cannot still trip the remote quota.
const SAFETY_MARGIN: Duration = Duration::from_secs(1);

/// Bounds outbound call rate to at most `max_calls` per trailing window.
///
/// Maintains a FIFO of call timestamps. `acquire` evicts timestamps older
/// than the window, sleeps while the remaining count is at the cap, then
/// records the new call. The timestamp queue is the only state shared
/// between workers and is guarded by an async mutex; the lock is held across
/// the sleep so waiters are admitted one per wakeup, in arrival order.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter over the standard 60-second trailing window.
    pub fn new(max_calls_per_minute: usize) -> Self {
        Self::with_window(max_calls_per_minute, Duration::from_secs(60))
    }

    /// Create a limiter with a custom window length.
    pub fn with_window(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until one more call fits inside the trailing window, then record
    /// it and return.
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;

        Self::evict(&mut calls, self.window);

        while calls.len() >= self.max_calls {
            // The front entry is the oldest call still inside the window;
            // once it ages out there is room for one more.
            let oldest = *calls.front().expect("queue at cap is non-empty");
            let wait = (oldest + self.window + SAFETY_MARGIN)
                .saturating_duration_since(Instant::now());

            if !wait.is_zero() {
                debug!("Rate limit reached, waiting {:.1}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }

            Self::evict(&mut calls, self.window);
        }

        calls.push_back(Instant::now());
    }

    fn evict(calls: &mut VecDeque<Instant>, window: Duration) {
        let now = Instant::now();
        while let Some(front) = calls.front() {
            if now.duration_since(*front) > window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
