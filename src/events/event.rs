//! # Runtime events of one load run.
//!
//! Events come from the supervisor (shutdown), the runner (worker lifecycle), the
//! subscriber set (overflow, panics) and the load itself (courses, students,
//! reservations, abort). Every event gets the next value of a process-wide counter
//! as `seq`, so subscribers can order events that reach them out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use courseload::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("registration/S00001")
//!     .with_reason("unexpected status 500")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("registration/S00001"));
//! assert_eq!(ev.timeout_ms, Some(5000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Root cancellation requested (load window elapsed, abort or OS signal).
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets:
    /// - `count`: number of stuck workers
    GraceExceeded,

    /// The run is being aborted.
    ///
    /// Sets:
    /// - `reason`: human-readable abort reason
    AbortRequested,

    // === Worker lifecycle events ===
    /// Worker is starting.
    ///
    /// Sets:
    /// - `task`: worker name
    TaskStarting,

    /// Worker has stopped (finished **or** cancelled gracefully).
    ///
    /// Sets:
    /// - `task`: worker name
    TaskStopped,

    /// Worker returned an error.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `reason`: failure message
    TaskFailed,

    /// Worker exceeded its run timeout.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `timeout_ms`: configured timeout (ms)
    TimeoutHit,

    /// A timed-out request will be sent again.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `count`: retry number (1-based)
    /// - `delay_ms`: delay before the retry (ms)
    RetryScheduled,

    // === Work graph events ===
    /// A course was created on the target and published.
    ///
    /// Sets:
    /// - `course`: course id
    CourseAdded,

    /// A student was logged in and published.
    ///
    /// Sets:
    /// - `student`: student code
    StudentActivated,

    /// A course reached its seat cap (completion signal fired).
    ///
    /// Sets:
    /// - `course`: course id
    /// - `count`: registered students
    CourseFull,

    /// A course moved to `in-progress`.
    ///
    /// Sets:
    /// - `course`: course id
    /// - `count`: registered students
    CourseStarted,

    /// A course moved to `closed`.
    ///
    /// Sets:
    /// - `course`: course id
    CourseClosed,

    /// A reserved batch was rolled back.
    ///
    /// Sets:
    /// - `student`: student code
    /// - `count`: number of rolled back reservations
    /// - `reason`: why the batch was not committed
    ReservationRolledBack,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Delay before the next retry in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Generic counter (retry number, registered students, stuck workers).
    pub count: Option<u32>,
    /// Name of the worker or subscriber, if applicable.
    pub task: Option<Arc<str>>,
    /// Course id, if applicable.
    pub course: Option<Arc<str>>,
    /// Student code, if applicable.
    pub student: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            timeout_ms: None,
            delay_ms: None,
            reason: None,
            count: None,
            task: None,
            course: None,
            student: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a course id.
    #[inline]
    pub fn with_course(mut self, course: impl Into<Arc<str>>) -> Self {
        self.course = Some(course.into());
        self
    }

    /// Attaches a student code.
    #[inline]
    pub fn with_student(mut self, student: impl Into<Arc<str>>) -> Self {
        self.student = Some(student.into());
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::CourseAdded);
        let b = Event::new(EventKind::CourseAdded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn oversized_values_are_clamped() {
        let ev = Event::new(EventKind::RetryScheduled)
            .with_delay(Duration::from_secs(u64::MAX / 2))
            .with_count(usize::MAX);
        assert_eq!(ev.delay_ms, Some(u32::MAX));
        assert_eq!(ev.count, Some(u32::MAX));
    }
}
