//! # Supervisor: owns the worker pool, the event bus and graceful shutdown.
//!
//! ```text
//! topic subscriber ── spawn(task) ──► TaskTracker ──► run_once(task, child token)
//!                                                          │
//!                                          publish(Event) ─┘
//!                                                 │
//!                     Bus ──► subscriber_listener ──► AliveTracker::update
//!                                                 └──► SubscriberSet::emit
//!
//! drive(window):
//!   OS signal │ window elapsed │ root token cancelled (abort)
//!        └──► shutdown(reason):
//!               publish ShutdownRequested
//!               root token.cancel()           → every worker's child token
//!               tracker.close() + wait ≤ grace
//!                  ├─ all joined → AllStoppedWithin
//!                  └─ timed out  → GraceExceeded (stuck = AliveTracker::snapshot)
//! ```
//!
//! The pool is unbounded: every published student and course gets its own workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{alive::AliveTracker, runner::run_once, shutdown};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    tasks::TaskRef,
};

/// Why [`Supervisor::drive`] stopped the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Termination signal from the OS.
    Signal,
    /// The load window elapsed.
    Elapsed,
    /// The root token was cancelled from inside (abort).
    Cancelled,
}

impl StopCause {
    pub fn as_str(self) -> &'static str {
        match self {
            StopCause::Signal => "termination signal",
            StopCause::Elapsed => "load window elapsed",
            StopCause::Cancelled => "run aborted",
        }
    }
}

/// Coordinates workers, event delivery and graceful shutdown.
pub struct Supervisor {
    grace: Duration,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    alive: Arc<AliveTracker>,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl Supervisor {
    pub(super) fn new_internal(
        grace: Duration,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        alive: Arc<AliveTracker>,
    ) -> Self {
        let sup = Self {
            grace,
            bus,
            subs,
            alive,
            tracker: TaskTracker::new(),
            token: CancellationToken::new(),
        };
        sup.subscriber_listener();
        sup
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Root token of the run.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn alive(&self) -> &Arc<AliveTracker> {
        &self.alive
    }

    /// Number of workers not yet finished.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Spawns `task` on the pool under a child of the root token.
    ///
    /// Returns `false` (and drops the task) once shutdown has begun.
    pub fn spawn(&self, task: TaskRef) -> bool {
        if self.token.is_cancelled() || self.tracker.is_closed() {
            return false;
        }
        let token = self.token.clone();
        let bus = self.bus.clone();
        self.tracker.spawn(async move {
            let _ = run_once(task.as_ref(), &token, None, &bus).await;
        });
        true
    }

    /// Waits for the first of: OS signal, `window` elapsed, root token cancelled.
    /// Then shuts down.
    pub async fn drive(&self, window: Duration) -> (StopCause, Result<(), RuntimeError>) {
        let cause = tokio::select! {
            _ = shutdown::signal_or_pending() => StopCause::Signal,
            _ = tokio::time::sleep(window) => StopCause::Elapsed,
            _ = self.token.cancelled() => StopCause::Cancelled,
        };
        (cause, self.shutdown(cause.as_str()).await)
    }

    /// Cancels every worker and waits up to the grace period for them to finish.
    pub async fn shutdown(&self, reason: &str) -> Result<(), RuntimeError> {
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        self.token.cancel();
        self.tracker.close();

        match tokio::time::timeout(self.grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = self.alive.snapshot().await;
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_count(stuck.len()));
                Err(RuntimeError::GraceExceeded {
                    grace: self.grace,
                    stuck,
                })
            }
        }
    }

    /// Forwards bus events to the alive tracker and the subscriber set.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let alive = Arc::clone(&self.alive);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        set.emit(&ev);
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
