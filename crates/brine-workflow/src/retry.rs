use std::time::Duration;

use brine_config::{RetryBackoff, RetryDef};
use serde::{Deserialize, Serialize};

/// Upper bound on the exponential growth factor.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Retry policy for a unit that timed out.
///
/// Only timeouts are retried; a unit that reports its own failure is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub initial_delay_ms: u64,
  pub backoff: RetryBackoff,
}

impl RetryPolicy {
  /// A single attempt, no retries.
  pub const fn none() -> Self {
    Self {
      max_attempts: 1,
      initial_delay_ms: 0,
      backoff: RetryBackoff::Constant,
    }
  }

  /// Whether another attempt is allowed after `attempt` (1-based) failed.
  pub fn allows_retry_after(&self, attempt: u32) -> bool {
    attempt < self.max_attempts
  }

  /// Delay before the attempt following `attempt` (1-based).
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let initial = self.initial_delay_ms;
    let attempt = attempt.max(1);
    let millis = match self.backoff {
      RetryBackoff::Constant => initial,
      RetryBackoff::Linear => initial.saturating_mul(u64::from(attempt)),
      RetryBackoff::Exponential => {
        let shift = (attempt - 1).min(MAX_BACKOFF_SHIFT);
        initial.saturating_mul(1u64 << shift)
      }
    };
    Duration::from_millis(millis)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::none()
  }
}

impl From<RetryDef> for RetryPolicy {
  fn from(def: RetryDef) -> Self {
    Self {
      max_attempts: def.max_attempts.max(1),
      initial_delay_ms: def.initial_delay_ms,
      backoff: def.backoff,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn policy(backoff: RetryBackoff) -> RetryPolicy {
    RetryPolicy {
      max_attempts: 3,
      initial_delay_ms: 100,
      backoff,
    }
  }

  #[test]
  fn test_backoff_delays() {
    let constant = policy(RetryBackoff::Constant);
    assert_eq!(constant.delay_for_attempt(3), Duration::from_millis(100));

    let linear = policy(RetryBackoff::Linear);
    assert_eq!(linear.delay_for_attempt(1), Duration::from_millis(100));
    assert_eq!(linear.delay_for_attempt(3), Duration::from_millis(300));

    let exponential = policy(RetryBackoff::Exponential);
    assert_eq!(exponential.delay_for_attempt(1), Duration::from_millis(100));
    assert_eq!(exponential.delay_for_attempt(2), Duration::from_millis(200));
    assert_eq!(exponential.delay_for_attempt(4), Duration::from_millis(800));
  }

  #[test]
  fn test_attempt_bounds() {
    let retry = policy(RetryBackoff::Constant);
    assert!(retry.allows_retry_after(1));
    assert!(retry.allows_retry_after(2));
    assert!(!retry.allows_retry_after(3));
    assert!(!RetryPolicy::none().allows_retry_after(1));
  }

  #[test]
  fn test_zero_attempts_clamped() {
    let def = RetryDef {
      max_attempts: 0,
      initial_delay_ms: 10,
      backoff: RetryBackoff::Linear,
    };
    assert_eq!(RetryPolicy::from(def).max_attempts, 1);
  }
}
