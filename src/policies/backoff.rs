//! # Backoff between retries of a timed-out request.
//!
//! The delay before retry `n` (0-based) is `first × factor^n`, clamped to `max`, then
//! jittered. The base is derived from `n` alone, so jitter never feeds back into later
//! delays.
//!
//! ```rust
//! use std::time::Duration;
//! use courseload::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(2), Duration::from_millis(400));
//! assert_eq!(backoff.next(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use super::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth factor per retry; `1.0` keeps the delay constant.
    pub factor: f64,
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 100 ms, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(5),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn default_is_constant() {
        let p = BackoffPolicy::default();
        for attempt in 0..20 {
            assert_eq!(p.next(attempt), Duration::from_millis(100));
        }
    }

    #[test]
    fn grows_and_clamps() {
        let p = policy(100, 1000, 2.0);
        assert_eq!(p.next(1), Duration::from_millis(200));
        assert_eq!(p.next(3), Duration::from_millis(800));
        assert_eq!(p.next(4), Duration::from_millis(1000));
        assert_eq!(p.next(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn first_above_max_is_clamped() {
        assert_eq!(policy(5000, 1000, 1.0).next(0), Duration::from_millis(1000));
    }

    #[test]
    fn equal_jitter_keeps_half() {
        let p = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..policy(400, 10_000, 1.0)
        };
        for attempt in 0..50 {
            let d = p.next(attempt);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(400));
        }
    }
}
