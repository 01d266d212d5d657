//! # Logging subscriber.
//!
//! [`LogWriter`] renders runtime events through `tracing`. Worker lifecycle and the
//! work graph go to `debug`, failures and shutdown problems to `warn`/`error`.
//!
//! ```text
//! DEBUG courseload::subscribers::log: course added course=01H... seq=42
//! WARN  courseload::subscribers::log: worker failed task=registration/S00003 reason="http: ..."
//! ERROR courseload::subscribers::log: shutdown grace exceeded stuck=2
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::Subscribe;
use crate::events::{Event, EventKind};

/// `tracing` backed event logger.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let course = e.course.as_deref().unwrap_or("-");
        let student = e.student.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let seq = e.seq;

        match e.kind {
            EventKind::TaskStarting => debug!(seq, task, "worker starting"),
            EventKind::TaskStopped => debug!(seq, task, "worker stopped"),
            EventKind::TaskFailed => warn!(seq, task, reason, "worker failed"),
            EventKind::TimeoutHit => warn!(seq, task, timeout_ms = ?e.timeout_ms, "worker timed out"),
            EventKind::RetryScheduled => {
                debug!(seq, task, retry = ?e.count, delay_ms = ?e.delay_ms, "request retry scheduled")
            }
            EventKind::CourseAdded => debug!(seq, course, "course added"),
            EventKind::StudentActivated => debug!(seq, student, "student activated"),
            EventKind::CourseFull => debug!(seq, course, registered = ?e.count, "course full"),
            EventKind::CourseStarted => {
                debug!(seq, course, registered = ?e.count, "course started")
            }
            EventKind::CourseClosed => debug!(seq, course, "course closed"),
            EventKind::ReservationRolledBack => {
                debug!(seq, student, seats = ?e.count, reason, "reservations rolled back")
            }
            EventKind::ShutdownRequested => info!(seq, reason, "shutdown requested"),
            EventKind::AllStoppedWithin => info!(seq, "all workers stopped within grace"),
            EventKind::GraceExceeded => error!(seq, stuck = ?e.count, "shutdown grace exceeded"),
            EventKind::AbortRequested => error!(seq, reason, "run aborted"),
            EventKind::SubscriberOverflow => warn!(seq, subscriber = task, reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => error!(seq, subscriber = task, reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}
