//! # Jitter for retry delays.
//!
//! - [`JitterPolicy::None`] exact delay
//! - [`JitterPolicy::Full`] uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2` plus uniform in `[0, delay/2]`

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the delay as computed.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2 + uniform[0, delay/2]`; keeps at least half of the delay.
    Equal,
}

impl JitterPolicy {
    /// Parses `none`, `full` or `equal` (any case).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(JitterPolicy::None),
            "full" => Some(JitterPolicy::Full),
            "equal" => Some(JitterPolicy::Equal),
            _ => None,
        }
    }

    /// Applies the jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return delay;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rand::rng().random_range(0..=ms - half))
            }
        }
    }
}
