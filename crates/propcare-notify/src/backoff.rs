// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry delay schedule for failed deliveries.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Delay in seconds, indexed by attempt count and clamped to the last entry.
pub const BACKOFF_SCHEDULE_SECS: [u64; 6] = [60, 120, 300, 600, 1800, 3600];

/// Delay before the next attempt, given the attempt count *after* the failure
/// was counted. The first failure therefore waits 120 seconds.
pub fn backoff(attempt_count: u32) -> Duration {
    let idx = (attempt_count as usize).min(BACKOFF_SCHEDULE_SECS.len() - 1);
    Duration::from_secs(BACKOFF_SCHEDULE_SECS[idx])
}

/// Counts one more failure and returns `(attempt_count, next_attempt_at)`.
pub fn next_attempt(previous_attempts: u32, now: DateTime<Utc>) -> (u32, DateTime<Utc>) {
    let attempt_count = previous_attempts.saturating_add(1);
    let delay = TimeDelta::from_std(backoff(attempt_count)).unwrap_or(TimeDelta::MAX);
    (attempt_count, now + delay)
}
