// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnection policy and per-send retry state.

use std::time::Duration;

use rand::Rng;
use ripple_config::ReconnectConfig;
use ripple_core::StreamFailure;

/// Bounded exponential backoff with additive jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            max_jitter: config.max_jitter(),
        }
    }

    /// Delay before retry `attempt` (1-based), without jitter:
    /// `min(base_delay * 2^(attempt - 1), max_delay)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1));
        factor
            .and_then(|f| self.base_delay.checked_mul(f))
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// [`backoff`](Self::backoff) plus a uniform random jitter in `[0, max_jitter]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.backoff(attempt) + jitter
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

/// Outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then reissue the request as retry number `attempt`.
    Retry { attempt: u32, delay: Duration },
    GiveUp,
}

/// Retry counter owned by a single send.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    retry_count: u32,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            retry_count: 0,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.policy.max_retries
    }

    /// Decides whether `failure` earns another attempt, consuming one retry if so.
    pub fn on_failure(&mut self, failure: &StreamFailure) -> RetryDecision {
        if !failure.is_retryable() || self.retry_count >= self.policy.max_retries {
            return RetryDecision::GiveUp;
        }
        self.retry_count += 1;
        RetryDecision::Retry {
            attempt: self.retry_count,
            delay: self.policy.delay_for(self.retry_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::NetworkKind;

    fn policy(jitter_ms: u64) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            max_jitter: Duration::from_millis(jitter_ms),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let p = policy(0);
        let delays: Vec<u64> = (1..=6).map(|k| p.backoff(k).as_millis() as u64).collect();
        assert_eq!(delays, [1000, 2000, 4000, 8000, 10_000, 10_000]);
        assert_eq!(p.backoff(200), p.max_delay);
    }

    #[test]
    fn jitter_stays_bounded() {
        let p = policy(500);
        for k in 1..=5 {
            let d = p.delay_for(k);
            assert!(d >= p.backoff(k));
            assert!(d <= p.backoff(k) + Duration::from_millis(500));
        }
    }

    #[test]
    fn network_failures_retry_until_exhausted() {
        let mut state = ReconnectState::new(policy(0));
        let failure = StreamFailure::network(NetworkKind::ConnectionReset, "reset");
        for expected in 1..=5 {
            assert!(matches!(
                state.on_failure(&failure),
                RetryDecision::Retry { attempt, .. } if attempt == expected
            ));
        }
        assert_eq!(state.on_failure(&failure), RetryDecision::GiveUp);
        assert_eq!(state.retry_count(), 5);
    }

    #[test]
    fn non_network_failures_never_retry() {
        let mut state = ReconnectState::new(policy(0));
        let failure = StreamFailure::Http {
            status: 503,
            body: String::new(),
        };
        assert_eq!(state.on_failure(&failure), RetryDecision::GiveUp);
        assert_eq!(state.retry_count(), 0);
    }
}
