//! # Score board: tag counters and the error counter.
//!
//! Every worker reports here. [`ScoreBoard::record_error`] classifies a [`LoadError`]
//! and tells the caller whether the run must be aborted: on any critical error, or
//! once the deductible errors (application + HTTP) exceed the threshold.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use super::{ScoreTable, ScoreTag};
use crate::error::{FailureKind, LoadError};

const KEPT_MESSAGES: usize = 100;

/// Outcome of recording an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Abort,
}

/// Snapshot of the error counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    pub critical: i64,
    /// Application and HTTP errors.
    pub deduction: i64,
    pub timeout: i64,
}

/// Shared score and error counters of one run.
#[derive(Debug)]
pub struct ScoreBoard {
    tags: [AtomicI64; ScoreTag::ALL.len()],
    critical: AtomicI64,
    deduction: AtomicI64,
    timeout: AtomicI64,
    fail_threshold: i64,
    messages: Mutex<Vec<String>>,
}

impl ScoreBoard {
    pub fn new(fail_threshold: u64) -> Self {
        Self {
            tags: std::array::from_fn(|_| AtomicI64::new(0)),
            critical: AtomicI64::new(0),
            deduction: AtomicI64::new(0),
            timeout: AtomicI64::new(0),
            fail_threshold: fail_threshold.min(i64::MAX as u64) as i64,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, tag: ScoreTag) {
        self.add_n(tag, 1);
    }

    pub fn add_n(&self, tag: ScoreTag, n: i64) {
        self.tags[tag.index()].fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self, tag: ScoreTag) -> i64 {
        self.tags[tag.index()].load(Ordering::Relaxed)
    }

    pub fn table(&self) -> ScoreTable {
        ScoreTable::from_fn(|tag| self.count(tag))
    }

    /// Counts `err`. Cancellation is not an error and is ignored.
    pub fn record_error(&self, err: &LoadError) -> Verdict {
        let Some(kind) = err.kind() else {
            return Verdict::Continue;
        };
        if kind != FailureKind::Timeout {
            let mut msgs = self.messages.lock().unwrap_or_else(|e| e.into_inner());
            if msgs.len() < KEPT_MESSAGES {
                msgs.push(err.as_message());
            }
        }
        match kind {
            FailureKind::Critical => {
                self.critical.fetch_add(1, Ordering::Relaxed);
                Verdict::Abort
            }
            FailureKind::Application | FailureKind::Http => {
                let n = self.deduction.fetch_add(1, Ordering::Relaxed) + 1;
                if n > self.fail_threshold {
                    Verdict::Abort
                } else {
                    Verdict::Continue
                }
            }
            FailureKind::Timeout => {
                self.timeout.fetch_add(1, Ordering::Relaxed);
                Verdict::Continue
            }
        }
    }

    pub fn errors(&self) -> ErrorCounts {
        ErrorCounts {
            critical: self.critical.load(Ordering::Relaxed),
            deduction: self.deduction.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
        }
    }

    pub fn fail_threshold(&self) -> i64 {
        self.fail_threshold
    }

    /// First recorded error messages (timeouts excluded).
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
