//! Admission control for outbound upload requests.
//!
//! Bounds requests with two rules:
//! - A minimum cooldown between consecutive admitted requests
//! - A maximum number of admitted requests per 60-second window
//!
//! The decision logic is a pure transition over millisecond timestamps so it
//! can be exercised without real timers. [`RateLimiter`] wraps it with a
//! monotonic clock.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Length of the counting window
pub const WINDOW_MS: u64 = 60_000;

/// Rate limiting configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Maximum admitted requests per window (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests_per_minute: u32,

    /// Minimum gap between admitted requests in ms (default: 5000)
    #[serde(default = "default_cooldown_ms")]
    pub request_cooldown_ms: u64,
}

fn default_max_requests() -> u32 {
    10
}
fn default_cooldown_ms() -> u64 {
    5_000
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests(),
            request_cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Counters behind an admission decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Time of the last admitted request
    pub last_request_at: Option<u64>,

    /// Admitted requests in the current window
    pub request_count_in_window: u32,

    /// Start of the current window
    pub window_start_at: Option<u64>,
}

/// Why a request was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("cooldown active ({remaining_ms}ms remaining)")]
    Cooldown { remaining_ms: u64 },

    #[error("max requests per minute reached ({count}/{max})")]
    Quota { count: u32, max: u32 },
}

/// Result of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(Rejection),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

impl RateLimiterState {
    /// Decide whether a request at `now_ms` is admitted.
    ///
    /// Returns the next state and the decision. A rejection leaves the state
    /// untouched. Timestamps are expected to be non-decreasing.
    pub fn try_acquire(self, limits: &RateLimits, now_ms: u64) -> (Self, Admission) {
        if let Some(last) = self.last_request_at {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < limits.request_cooldown_ms {
                let rejection = Rejection::Cooldown {
                    remaining_ms: limits.request_cooldown_ms - elapsed,
                };
                return (self, Admission::Rejected(rejection));
            }
        }

        let mut next = self;
        let window_elapsed = match next.window_start_at {
            Some(start) => now_ms.saturating_sub(start) >= WINDOW_MS,
            None => true,
        };
        if window_elapsed {
            next.request_count_in_window = 0;
            next.window_start_at = Some(now_ms);
        }

        if next.request_count_in_window >= limits.max_requests_per_minute {
            let rejection = Rejection::Quota {
                count: next.request_count_in_window,
                max: limits.max_requests_per_minute,
            };
            return (self, Admission::Rejected(rejection));
        }

        next.request_count_in_window += 1;
        next.last_request_at = Some(now_ms);
        (next, Admission::Admitted)
    }
}

/// Clock-backed limiter owned by the upload dispatcher
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    state: RateLimiterState,
    epoch: Instant,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            state: RateLimiterState::default(),
            epoch: Instant::now(),
        }
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    pub fn state(&self) -> RateLimiterState {
        self.state
    }

    /// Check admission at the current time
    pub fn try_acquire(&mut self) -> Admission {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.try_acquire_at(now_ms)
    }

    /// Check admission at an explicit offset (ms since the limiter was created)
    pub fn try_acquire_at(&mut self, now_ms: u64) -> Admission {
        let (next, admission) = self.state.try_acquire(&self.limits, now_ms);
        self.state = next;

        match admission {
            Admission::Admitted => tracing::debug!(
                count = self.state.request_count_in_window,
                max = self.limits.max_requests_per_minute,
                "Request admitted"
            ),
            Admission::Rejected(reason) => tracing::info!(%reason, "Request blocked"),
        }

        admission
    }
}
