//! # Shared state of one load run.
//!
//! [`LoadContext`] is handed (as `Arc`) to every worker. It owns the domain state
//! (registry, capacity counter, matcher), the two work-graph topics, the score board
//! and the user pool, plus the two deadlines that bound the run:
//!
//! ```text
//!   begin_load()                 load_end                 load_end + retry_window
//!       │──── new requests allowed ──│── timed-out requests may be retried ──│
//! ```
//!
//! Errors go through [`LoadContext::report`]; a critical error, or one deductible error
//! too many, aborts the run by cancelling the root token.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{FailureKind, LoadError},
    events::{Bus, Event, EventKind, Topics},
    generate::Generator,
    model::{CapacityCounter, CourseRegistry, Matcher, Student, UserPool},
    score::{ScoreBoard, ScoreTag, Verdict},
};

/// Everything the workers of one run share.
pub struct LoadContext {
    pub cfg: Config,
    pub registry: Arc<CourseRegistry>,
    pub capacity: Arc<CapacityCounter>,
    pub matcher: Matcher,
    pub topics: Topics,
    pub board: ScoreBoard,
    pub users: UserPool,
    pub generator: Generator,
    bus: Bus,
    token: CancellationToken,
    load_end: Mutex<Instant>,
    students: Mutex<Vec<Arc<Student>>>,
    active_students: AtomicUsize,
    abort_reason: OnceLock<String>,
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("courses", &self.registry.count())
            .field("active_students", &self.active_students())
            .field("aborted", &self.abort_reason())
            .finish()
    }
}

impl LoadContext {
    /// Creates the context. The load window starts now; call
    /// [`LoadContext::begin_load`] to restart it when the load phase begins.
    pub fn new(cfg: Config, users: UserPool, bus: Bus, token: CancellationToken) -> Self {
        let registry = Arc::new(CourseRegistry::new());
        let capacity = Arc::new(CapacityCounter::new());
        let load_end = Instant::now() + cfg.load_window;
        Self {
            matcher: Matcher::new(Arc::clone(&registry), Arc::clone(&capacity)),
            registry,
            capacity,
            topics: Topics::new(),
            board: ScoreBoard::new(cfg.error_fail_threshold),
            users,
            generator: Generator::new(),
            bus,
            token,
            load_end: Mutex::new(load_end),
            students: Mutex::new(Vec::new()),
            active_students: AtomicUsize::new(0),
            abort_reason: OnceLock::new(),
            cfg,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Root token of the run.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Starts the load window; returns its end.
    pub fn begin_load(&self) -> Instant {
        let end = Instant::now() + self.cfg.load_window;
        *self.load_end.lock().unwrap_or_else(|e| e.into_inner()) = end;
        end
    }

    /// End of the window in which new requests are sent.
    pub fn load_end(&self) -> Instant {
        *self.load_end.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// End of the window in which timed-out requests may be retried.
    pub fn retry_end(&self) -> Instant {
        self.load_end() + self.cfg.retry_window
    }

    /// No new request may be sent: the load window is over or `ctx` is cancelled.
    pub fn is_no_request_time(&self, ctx: &CancellationToken) -> bool {
        ctx.is_cancelled() || Instant::now() >= self.load_end()
    }

    /// No timed-out request may be retried any more.
    pub fn is_no_retry_time(&self, ctx: &CancellationToken) -> bool {
        ctx.is_cancelled() || Instant::now() >= self.retry_end()
    }

    // ---- scoring & errors ----

    pub fn score(&self, tag: ScoreTag) {
        self.board.add(tag);
    }

    /// Counts `err` and aborts the run when the board says so.
    pub fn report(&self, err: &LoadError) {
        match err.kind() {
            None => return,
            Some(FailureKind::Timeout) => debug!(error = %err, "request timed out"),
            Some(_) => warn!(error = %err, "load error"),
        }
        if self.board.record_error(err) == Verdict::Abort {
            let reason = match err.kind() {
                Some(FailureKind::Critical) => err.as_message(),
                _ => format!(
                    "more than {} errors occurred",
                    self.board.fail_threshold()
                ),
            };
            self.abort(reason);
        }
    }

    /// Reports `res`'s error and maps it for a worker loop:
    /// timeouts become `Ok(None)` (skip this step), other errors are returned.
    pub fn absorb_timeout<T>(&self, res: Result<T, LoadError>) -> Result<Option<T>, LoadError> {
        match res {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_retryable() => {
                self.report(&e);
                Ok(None)
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Sends `op` until it does not time out.
    ///
    /// Every timeout is reported. Retries are paced by `Config::retry_backoff` and stop
    /// once the retry window closes (the last timeout is returned) or `ctx` is cancelled.
    /// Other errors are returned unreported.
    pub async fn retrying<T, F, Fut>(
        &self,
        ctx: &CancellationToken,
        worker: &str,
        mut op: F,
    ) -> Result<T, LoadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LoadError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };
            self.report(&err);
            if self.is_no_retry_time(ctx) {
                return Err(err);
            }
            let delay = self.cfg.retry_backoff.next(attempt);
            attempt = attempt.saturating_add(1);
            self.bus.publish(
                Event::new(EventKind::RetryScheduled)
                    .with_task(worker)
                    .with_count(attempt as usize)
                    .with_delay(delay),
            );
            tokio::select! {
                _ = ctx.cancelled() => return Err(LoadError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Records `reason` (first one wins) and cancels the run.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.abort_reason.set(reason.clone()).is_ok() {
            self.bus
                .publish(Event::new(EventKind::AbortRequested).with_reason(reason));
        }
        self.token.cancel();
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.get().map(String::as_str)
    }

    // ---- students ----

    /// Remembers a logged-in student; returns the new active count.
    pub fn add_active_student(&self, student: &Arc<Student>) -> usize {
        self.students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(student));
        self.active_students.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn active_students(&self) -> usize {
        self.active_students.load(Ordering::Acquire)
    }

    /// Every student activated so far.
    pub fn students(&self) -> Vec<Arc<Student>> {
        self.students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
