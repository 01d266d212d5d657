//! # Benchmark configuration.
//!
//! Provides [`Config`], the centralized settings for the load engine and its supervisor.
//!
//! Config is used in two ways:
//! 1. **Environment**: [`Config::from_env`] reads `TARGET`, `TLS`, `TIMEOUT`, `NO_LOAD`,
//!    `EXIT_STATUS` and `RETRY_JITTER` (optionally from a `.env` file).
//! 2. **Tunable constants**: seat caps, wait durations and the load window are plain
//!    public fields with the defaults below; tests shrink them freely.
//!
//! ## Sentinel values
//! - `request_timeout = 0s` → no per-request timeout.

use std::time::Duration;

use crate::{
    error::RuntimeError,
    policies::{BackoffPolicy, JitterPolicy},
};

/// Global configuration for the benchmark runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Target `host:port`.
    pub target: String,
    /// Use `https` when talking to the target.
    pub use_tls: bool,
    /// Per-request deadline (`0s` = none).
    pub request_timeout: Duration,
    /// Stop after the prepare phase.
    pub no_load: bool,
    /// Exit non-zero when the run fails.
    pub exit_status_on_fail: bool,

    /// Students activated when the load phase starts.
    pub initial_students: usize,
    /// Courses added when the load phase starts.
    pub initial_courses: usize,
    /// Simultaneous registrations allowed per student.
    pub registration_cap: usize,
    /// Seats per course.
    pub seat_cap: usize,
    /// Classes held per course before it closes.
    pub classes_per_course: usize,
    /// Course searches performed before each registration attempt.
    pub searches_per_registration: usize,

    /// Minimum delay between two announcement list pages.
    pub min_page_interval: Duration,
    /// How long a partially filled course waits after its first registration.
    pub course_full_wait: Duration,
    /// How long a teacher waits for a student to read a class announcement.
    pub read_announcement_wait: Duration,
    /// How long a saturated student waits for a released timeslot before polling grades again.
    pub grade_retry_wait: Duration,
    /// Window during which new requests are sent.
    pub load_window: Duration,
    /// Extra window in which timed-out requests may still be retried.
    pub retry_window: Duration,
    /// Maximum wait for workers to stop after cancellation.
    pub grace: Duration,
    /// Cadence of intermediate reports.
    pub report_interval: Duration,
    /// Deductible errors tolerated before the run is aborted.
    pub error_fail_threshold: u64,
    /// Capacity of the runtime event bus.
    pub bus_capacity: usize,
    /// Delay policy between retries of timed-out requests.
    pub retry_backoff: BackoffPolicy,
}

impl Config {
    /// Loads `.env` (if any) and overlays the recognised environment options on the defaults.
    pub fn from_env() -> Result<Self, RuntimeError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(target) = lookup("TARGET").filter(|t| !t.trim().is_empty()) {
            cfg.target = target.trim().to_string();
        }
        if let Some(v) = lookup("TLS") {
            cfg.use_tls = parse_bool("TLS", &v)?;
        }
        if let Some(v) = lookup("TIMEOUT") {
            cfg.request_timeout = parse_duration("TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("NO_LOAD") {
            cfg.no_load = parse_bool("NO_LOAD", &v)?;
        }
        if let Some(v) = lookup("EXIT_STATUS") {
            cfg.exit_status_on_fail = parse_bool("EXIT_STATUS", &v)?;
        }
        if let Some(v) = lookup("RETRY_JITTER") {
            cfg.retry_backoff.jitter =
                JitterPolicy::parse(&v).ok_or_else(|| RuntimeError::Config {
                    key: "RETRY_JITTER",
                    reason: format!("{v:?} is not one of none, full, equal"),
                })?;
        }
        Ok(cfg)
    }

    /// Returns the base URL of the target.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}", self.target)
    }

    /// Returns the per-request timeout as an `Option`.
    #[inline]
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout == Duration::ZERO {
            None
        } else {
            Some(self.request_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: "localhost:8080".to_string(),
            use_tls: false,
            request_timeout: Duration::from_secs(5),
            no_load: false,
            exit_status_on_fail: false,

            initial_students: 50,
            initial_courses: 30,
            registration_cap: 20,
            seat_cap: 50,
            classes_per_course: 5,
            searches_per_registration: 3,

            min_page_interval: Duration::from_millis(100),
            course_full_wait: Duration::from_secs(2),
            read_announcement_wait: Duration::from_secs(5),
            grade_retry_wait: Duration::from_secs(10),
            load_window: Duration::from_secs(60),
            retry_window: Duration::from_secs(5),
            grace: Duration::from_secs(10),
            report_interval: Duration::from_secs(3),
            error_fail_threshold: 100,
            bus_capacity: 1024,
            retry_backoff: BackoffPolicy::default(),
        }
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, RuntimeError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(RuntimeError::Config {
            key,
            reason: format!("{other:?} is not a boolean"),
        }),
    }
}

/// Parses Go-style durations such as `500ms`, `5s`, `1m30s`. A bare number means seconds.
fn parse_duration(key: &'static str, raw: &str) -> Result<Duration, RuntimeError> {
    let invalid = |reason: &str| RuntimeError::Config {
        key,
        reason: format!("{raw:?}: {reason}"),
    };
    let s = raw.trim();
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid("missing unit"))?;
        if digits == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| invalid("bad number"))?;
        rest = &rest[digits..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let secs = match unit {
            "ns" => value / 1e9,
            "us" | "µs" => value / 1e6,
            "ms" => value / 1e3,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return Err(invalid("unknown unit")),
        };
        total += Duration::from_secs_f64(secs);
    }
    Ok(total)
}
