// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use slotline_config::RetryConfig;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidRetryPolicy {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("base delay must be greater than zero")]
    ZeroBaseDelay,
    #[error("base delay ({base:?}) must not exceed max delay ({max:?})")]
    BaseExceedsMax { base: Duration, max: Duration },
}

/// Exponential backoff schedule.
///
/// The delay after failed attempt `n` (1-indexed) is
/// `min(base_delay * 2^(n-1), max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, InvalidRetryPolicy> {
        if max_attempts == 0 {
            return Err(InvalidRetryPolicy::ZeroAttempts);
        }
        if base_delay.is_zero() {
            return Err(InvalidRetryPolicy::ZeroBaseDelay);
        }
        if base_delay > max_delay {
            return Err(InvalidRetryPolicy::BaseExceedsMax {
                base: base_delay,
                max: max_delay,
            });
        }
        Ok(Self { max_attempts, base_delay, max_delay })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Time to wait after attempt `attempt` failed, before the next one.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        if exponent >= 64 {
            return self.max_delay;
        }
        let max = self.max_delay.as_nanos();
        let capped = self
            .base_delay
            .as_nanos()
            .checked_mul(1u128 << exponent)
            .map_or(max, |scaled| scaled.min(max));
        nanos_to_duration(capped)
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = InvalidRetryPolicy;

    fn try_from(cfg: &RetryConfig) -> Result<Self, Self::Error> {
        Self::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.base_delay_ms),
            Duration::from_millis(cfg.max_delay_ms),
        )
    }
}
