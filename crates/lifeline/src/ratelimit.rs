//! Per-caller rate limiting for sensitive operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::CollaboratorError;

/// Decides whether a keyed call may proceed.
///
/// Keys have the form `"{operation}:{caller_id}"`.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one call against `key`. Returns `false` once the budget is spent.
    async fn check(&self, key: &str) -> Result<bool, CollaboratorError>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    count: u32,
}

/// In-process fixed-window counter.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window_millis: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<Windows>,
}

struct Windows {
    by_key: HashMap<String, Window>,
    /// When expired windows were last swept out of `by_key`.
    swept_at: i64,
}

impl Windows {
    /// Drop expired windows, at most once per window length.
    fn sweep(&mut self, now: i64, window_millis: i64) {
        if now.saturating_sub(self.swept_at) < window_millis {
            return;
        }
        self.by_key
            .retain(|_, w| now.saturating_sub(w.started_at) < window_millis);
        self.swept_at = now;
    }
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let swept_at = clock.now_millis();
        Self {
            max_requests,
            window_millis: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            clock,
            state: Mutex::new(Windows {
                by_key: HashMap::new(),
                swept_at,
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.max_requests, config.window(), clock)
    }

    /// Number of keys with a window in memory.
    pub fn tracked_keys(&self) -> usize {
        self.state.lock().map(|s| s.by_key.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, key: &str) -> Result<bool, CollaboratorError> {
        let now = self.clock.now_millis();
        let mut state = self
            .state
            .lock()
            .map_err(|_| CollaboratorError::new("rate limiter", "lock poisoned"))?;
        state.sweep(now, self.window_millis);

        let window = state.by_key.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.saturating_sub(window.started_at) >= self.window_millis {
            *window = Window {
                started_at: now,
                count: 0,
            };
        }
        if window.count >= self.max_requests {
            return Ok(false);
        }
        window.count += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_budget_per_key_and_window() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60), clock.clone());

        assert!(limiter.check("request:a").await.unwrap());
        assert!(limiter.check("request:a").await.unwrap());
        assert!(!limiter.check("request:a").await.unwrap());

        // Separate budget for another caller.
        assert!(limiter.check("request:b").await.unwrap());

        clock.advance(Duration::from_secs(60));
        assert!(limiter.check("request:a").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_not_reset_early() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(10), clock.clone());

        assert!(limiter.check("k").await.unwrap());
        clock.advance(Duration::from_millis(9_999));
        assert!(!limiter.check("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_idle_keys_swept_once_per_window() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(10), clock.clone());

        for caller in ["a", "b", "c"] {
            assert!(limiter.check(&format!("request:{caller}")).await.unwrap());
        }
        assert_eq!(limiter.tracked_keys(), 3);

        // Inside the window nothing is swept.
        clock.advance(Duration::from_secs(9));
        assert!(limiter.check("request:d").await.unwrap());
        assert_eq!(limiter.tracked_keys(), 4);

        // One window on, the expired callers are gone and the recent one stays.
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check("request:e").await.unwrap());
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn test_expired_window_resets_between_sweeps() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(10), clock.clone());

        clock.advance(Duration::from_secs(5));
        assert!(limiter.check("k").await.unwrap());
        assert!(!limiter.check("k").await.unwrap());

        // The sweep at 10s keeps the open window.
        clock.advance(Duration::from_secs(5));
        assert!(limiter.check("other").await.unwrap());
        assert!(!limiter.check("k").await.unwrap());

        // At 15s the window has ended while the next sweep is 5s away.
        clock.advance(Duration::from_secs(5));
        assert!(limiter.check("k").await.unwrap());
        assert_eq!(limiter.tracked_keys(), 2);
    }
}
