//! Error types used by the load engine, its workers and the benchmark runtime.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the benchmark runtime itself (configuration,
//!   client construction, shutdown).
//! - [`LoadError`]: errors raised while a worker drives load against the target.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! [`LoadError::kind`] classifies an error into a [`FailureKind`] so the score
//! counter can decide whether it is fatal, deductible, or a timeout.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the benchmark runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers remained stuck.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of workers that did not stop in time.
        stuck: Vec<String>,
    },

    /// An environment option could not be parsed.
    #[error("invalid configuration {key}: {reason}")]
    Config {
        /// Environment key.
        key: &'static str,
        /// What was wrong with the value.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    Client(String),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use courseload::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Config { .. } => "runtime_config",
            RuntimeError::Client(_) => "runtime_client",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Config { key, reason } => format!("{key}: {reason}"),
            RuntimeError::Client(msg) => format!("client: {msg}"),
        }
    }
}

/// Coarse classification of a [`LoadError`] used for counting and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Invariant violation in the engine; aborts the run.
    Critical,
    /// The target returned data that contradicts what the engine recorded.
    Application,
    /// Transport failure, unexpected status code or malformed body.
    Http,
    /// Request deadline exceeded.
    Timeout,
}

/// # Errors produced while driving load.
///
/// Only [`LoadError::Timeout`] is retryable; every other kind is reported and the
/// worker decides whether to continue.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// Invariant violation in core logic (e.g. committing a seat that had no reservation).
    #[error("critical: {error}")]
    Critical {
        /// The underlying error message.
        error: String,
    },

    /// The remote server contradicted the engine's bookkeeping.
    #[error("application error: {error}")]
    Application {
        /// The underlying error message.
        error: String,
    },

    /// Connection error, unexpected status code or malformed body.
    #[error("http error: {error}")]
    Http {
        /// The underlying error message.
        error: String,
    },

    /// Request deadline exceeded.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The worker observed root cancellation.
    #[error("context cancelled")]
    Canceled,
}

impl LoadError {
    /// Shorthand for [`LoadError::Critical`].
    pub fn critical(error: impl Into<String>) -> Self {
        LoadError::Critical {
            error: error.into(),
        }
    }

    /// Shorthand for [`LoadError::Application`].
    pub fn application(error: impl Into<String>) -> Self {
        LoadError::Application {
            error: error.into(),
        }
    }

    /// Shorthand for [`LoadError::Http`].
    pub fn http(error: impl Into<String>) -> Self {
        LoadError::Http {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use courseload::LoadError;
    /// use std::time::Duration;
    ///
    /// let err = LoadError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "load_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Critical { .. } => "load_critical",
            LoadError::Application { .. } => "load_application",
            LoadError::Http { .. } => "load_http",
            LoadError::Timeout { .. } => "load_timeout",
            LoadError::Canceled => "load_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoadError::Critical { error } => format!("critical: {error}"),
            LoadError::Application { error } => format!("application: {error}"),
            LoadError::Http { error } => format!("http: {error}"),
            LoadError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            LoadError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Classifies the error for counting; `None` for cancellation, which is not a failure.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            LoadError::Critical { .. } => Some(FailureKind::Critical),
            LoadError::Application { .. } => Some(FailureKind::Application),
            LoadError::Http { .. } => Some(FailureKind::Http),
            LoadError::Timeout { .. } => Some(FailureKind::Timeout),
            LoadError::Canceled => None,
        }
    }

    /// Indicates whether the failed request may be sent again.
    ///
    /// ```
    /// use courseload::LoadError;
    /// use std::time::Duration;
    ///
    /// assert!(LoadError::Timeout { timeout: Duration::from_secs(1) }.is_retryable());
    /// assert!(!LoadError::http("status 500").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Timeout { .. })
    }
}
