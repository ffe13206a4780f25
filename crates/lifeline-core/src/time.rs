//! Timestamp helpers.
//!
//! All timestamps are Unix milliseconds (`i64`), matching the persisted
//! record format.

/// Milliseconds in one day.
pub const DAY_MILLIS: i64 = 86_400_000;

/// Compute when a wait period started at `requested_at` elapses.
///
/// Saturates instead of overflowing for absurd inputs.
pub fn wait_expiry(requested_at: i64, wait_days: u32) -> i64 {
    requested_at.saturating_add(i64::from(wait_days).saturating_mul(DAY_MILLIS))
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
