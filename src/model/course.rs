//! # Course entity and the seat reservation protocol.
//!
//! Many registration workers race on the same course. Seats are taken in two steps:
//!
//! ```text
//!   reserve_if_available() ──► Succeeded ──► (HTTP registration) ──► commit(student)
//!            │                                       │
//!            └─► NotAvailable                        └─ failure ──► rollback()
//! ```
//!
//! All three steps run under the course lock, so `registered + reservations <= seat_cap`
//! holds at every observable point and the `(seat_cap + 1)`-th reservation sees
//! `NotAvailable`. Registration closes monotonically: a rollback after the cap was
//! reached does not reopen it.
//!
//! The registration phase is published through a [`watch`] channel:
//! `Waiting → Registering { since } → Full`. The teacher worker waits on it through
//! [`Course::wait_completion`] / [`Course::wait_start`].

use std::collections::HashMap;
use std::future;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{Announcement, Class, Student, Teacher, Timeslot};
use crate::error::LoadError;

/// Course category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseKind {
    Liberal,
    Major,
}

impl CourseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseKind::Liberal => "liberal-arts",
            CourseKind::Major => "major-subjects",
        }
    }
}

/// Lifecycle status; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CourseStatus {
    Registration,
    InProgress,
    Closed,
}

impl CourseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Registration => "registration",
            CourseStatus::InProgress => "in-progress",
            CourseStatus::Closed => "closed",
        }
    }
}

/// Parameters of a course before it is created on the target.
#[derive(Debug, Clone)]
pub struct CourseParam {
    pub code: String,
    pub kind: CourseKind,
    pub name: String,
    pub description: String,
    /// 1..=3
    pub credit: u8,
    /// Display name of the teacher.
    pub teacher: String,
    pub slot: Timeslot,
    /// Space separated.
    pub keywords: String,
}

/// Outcome of [`Course::reserve_if_available`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationResult {
    Succeeded,
    NotAvailable,
}

/// Outcome of [`Course::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Registered,
    /// Registered, and this commit filled the course (the completion signal fired).
    Filled,
    /// The course closed while the registration was in flight; the reservation was
    /// released and the student was not added.
    Refused,
}

/// Registration phase as seen by the teacher worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No student committed yet.
    Waiting,
    /// At least one commit; `since` is the first one.
    Registering { since: Instant },
    /// Seat cap reached with no reservation in flight.
    Full,
}

/// Why a wait on the course ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Full,
    /// The course-full wait elapsed after the first registration.
    Waited,
    Cancelled,
}

/// Point-in-time view of the seat bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSnapshot {
    pub registered: usize,
    pub reservations: usize,
    pub registration_closed: bool,
    pub status: CourseStatus,
}

#[derive(Debug)]
struct Seats {
    registered: HashMap<String, Arc<Student>>,
    reservations: usize,
    registration_closed: bool,
    status: CourseStatus,
    full_signalled: bool,
}

/// A course: seat bookkeeping, classes and lifecycle.
#[derive(Debug)]
pub struct Course {
    pub id: String,
    pub param: CourseParam,
    teacher: Arc<Teacher>,
    seat_cap: usize,
    seats: Mutex<Seats>,
    classes: RwLock<Vec<Arc<Class>>>,
    phase: watch::Sender<Phase>,
}

impl Course {
    pub fn new(
        id: impl Into<String>,
        param: CourseParam,
        teacher: Arc<Teacher>,
        seat_cap: usize,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Waiting);
        Self {
            id: id.into(),
            param,
            teacher,
            seat_cap,
            seats: Mutex::new(Seats {
                registered: HashMap::new(),
                reservations: 0,
                registration_closed: false,
                status: CourseStatus::Registration,
                full_signalled: false,
            }),
            classes: RwLock::new(Vec::new()),
            phase,
        }
    }

    #[inline]
    pub fn slot(&self) -> Timeslot {
        self.param.slot
    }

    #[inline]
    pub fn credit(&self) -> u8 {
        self.param.credit
    }

    #[inline]
    pub fn seat_cap(&self) -> usize {
        self.seat_cap
    }

    pub fn teacher(&self) -> &Arc<Teacher> {
        &self.teacher
    }

    /// Takes one seat if registration is open and a seat is free.
    pub fn reserve_if_available(&self) -> ReservationResult {
        let mut s = self.lock();
        if s.registration_closed {
            return ReservationResult::NotAvailable;
        }
        if s.registered.len() + s.reservations >= self.seat_cap {
            return ReservationResult::NotAvailable;
        }
        s.reservations += 1;
        if s.registered.len() + s.reservations == self.seat_cap {
            s.registration_closed = true;
        }
        ReservationResult::Succeeded
    }

    /// Turns one reservation into a registration of `student`.
    ///
    /// A commit without a reservation, or a second commit for the same student, is a
    /// critical error and leaves the course unchanged. A commit on a closed course
    /// gives the reservation back and returns [`CommitOutcome::Refused`].
    pub fn commit(&self, student: &Arc<Student>) -> Result<CommitOutcome, LoadError> {
        let mut s = self.lock();
        if s.reservations == 0 {
            return Err(LoadError::critical(format!(
                "commit without reservation (course={}, student={})",
                self.id, student.account.code
            )));
        }
        if s.registered.contains_key(&student.account.code) {
            return Err(LoadError::critical(format!(
                "student {} committed twice to course {}",
                student.account.code, self.id
            )));
        }
        s.reservations -= 1;
        if s.status == CourseStatus::Closed {
            return Ok(CommitOutcome::Refused);
        }
        s.registered
            .insert(student.account.code.clone(), Arc::clone(student));

        if !s.full_signalled && s.reservations == 0 && s.registered.len() == self.seat_cap {
            s.full_signalled = true;
            self.phase.send_replace(Phase::Full);
            return Ok(CommitOutcome::Filled);
        }
        self.begin_registering();
        Ok(CommitOutcome::Registered)
    }

    /// Releases one reservation. Registration stays closed if it was closed.
    pub fn rollback(&self) -> Result<(), LoadError> {
        let mut s = self.lock();
        if s.reservations == 0 {
            return Err(LoadError::critical(format!(
                "rollback without reservation (course={})",
                self.id
            )));
        }
        s.reservations -= 1;
        if s.registration_closed && s.reservations == 0 && s.registered.len() < self.seat_cap {
            // can no longer fill; let the course-full wait start it
            self.begin_registering();
        }
        Ok(())
    }

    /// Closes registration and moves to `in-progress` without reaching the cap.
    pub fn start_early(&self) -> Result<(), LoadError> {
        let mut s = self.lock();
        s.registration_closed = true;
        Self::transition(&self.id, &mut s, CourseStatus::InProgress)
    }

    /// Moves the status forward by at most one step; equal status is a no-op.
    pub fn set_status(&self, next: CourseStatus) -> Result<(), LoadError> {
        let mut s = self.lock();
        if next != CourseStatus::Registration {
            s.registration_closed = true;
        }
        Self::transition(&self.id, &mut s, next)
    }

    fn transition(id: &str, s: &mut Seats, next: CourseStatus) -> Result<(), LoadError> {
        let (cur, nxt) = (s.status as u8, next as u8);
        if nxt < cur || nxt > cur + 1 {
            return Err(LoadError::critical(format!(
                "course {id}: illegal status transition {} -> {}",
                s.status.as_str(),
                next.as_str()
            )));
        }
        s.status = next;
        Ok(())
    }

    pub fn status(&self) -> CourseStatus {
        self.lock().status
    }

    pub fn is_registration_closed(&self) -> bool {
        self.lock().registration_closed
    }

    pub fn snapshot(&self) -> SeatSnapshot {
        let s = self.lock();
        SeatSnapshot {
            registered: s.registered.len(),
            reservations: s.reservations,
            registration_closed: s.registration_closed,
            status: s.status,
        }
    }

    /// Registered students, sorted by code.
    pub fn students(&self) -> Vec<Arc<Student>> {
        let mut out: Vec<Arc<Student>> = self.lock().registered.values().cloned().collect();
        out.sort_by(|a, b| a.account.code.cmp(&b.account.code));
        out
    }

    pub fn is_registered(&self, student_code: &str) -> bool {
        self.lock().registered.contains_key(student_code)
    }

    /// Appends a class; indices stay stable.
    pub fn add_class(&self, class: Arc<Class>) {
        self.classes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(class);
    }

    pub fn classes(&self) -> Vec<Arc<Class>> {
        self.classes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Sum of the student's scores over all classes.
    pub fn total_score_of(&self, student_code: &str) -> u32 {
        self.classes()
            .iter()
            .filter_map(|c| c.submission_of(student_code).and_then(|s| s.score))
            .sum()
    }

    /// Pushes `a` onto every registered student's unread queue; returns the fan-out.
    ///
    /// The student list is snapshotted first so no student lock is taken under the
    /// course lock.
    pub fn broadcast_announcement(&self, a: &Arc<Announcement>) -> usize {
        let students = self.students();
        for s in &students {
            s.push_announcement(Arc::clone(a));
        }
        students.len()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Resolves when the course is full or `token` is cancelled.
    pub async fn wait_completion(&self, token: &CancellationToken) -> Completion {
        let mut rx = self.phase.subscribe();
        tokio::select! {
            res = rx.wait_for(|p| matches!(p, Phase::Full)) => match res {
                Ok(_) => Completion::Full,
                Err(_) => Completion::Cancelled,
            },
            _ = token.cancelled() => Completion::Cancelled,
        }
    }

    /// Like [`Course::wait_completion`], but also resolves with [`Completion::Waited`]
    /// once `full_wait` has passed since the first registration.
    pub async fn wait_start(&self, token: &CancellationToken, full_wait: Duration) -> Completion {
        let mut rx = self.phase.subscribe();
        loop {
            let phase = *rx.borrow_and_update();
            let deadline = match phase {
                Phase::Full => return Completion::Full,
                Phase::Registering { since } => Some(since + full_wait),
                Phase::Waiting => None,
            };
            let timer = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = token.cancelled() => return Completion::Cancelled,
                _ = timer => return Completion::Waited,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Completion::Cancelled;
                    }
                }
            }
        }
    }

    fn begin_registering(&self) {
        self.phase.send_if_modified(|p| {
            if matches!(p, Phase::Waiting) {
                *p = Phase::Registering {
                    since: Instant::now(),
                };
                true
            } else {
                false
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Seats> {
        self.seats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{course, student};

    #[test]
    fn reservation_stops_at_cap() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 2);
        assert_eq!(c.reserve_if_available(), ReservationResult::Succeeded);
        assert_eq!(c.reserve_if_available(), ReservationResult::Succeeded);
        assert!(c.is_registration_closed());
        assert_eq!(c.reserve_if_available(), ReservationResult::NotAvailable);
    }

    #[test]
    fn rollback_keeps_registration_closed() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 1);
        assert_eq!(c.reserve_if_available(), ReservationResult::Succeeded);
        c.rollback().unwrap();
        assert_eq!(c.reserve_if_available(), ReservationResult::NotAvailable);
        assert_eq!(c.snapshot().reservations, 0);
    }

    #[test]
    fn commit_without_reservation_is_critical() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 3);
        let err = c.commit(&student("S1")).unwrap_err();
        assert_eq!(err.as_label(), "load_critical");
        assert_eq!(c.snapshot().registered, 0);
        assert!(c.rollback().is_err());
    }

    #[test]
    fn full_fires_once_on_last_commit() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 2);
        c.reserve_if_available();
        c.reserve_if_available();
        assert_eq!(c.commit(&student("S1")).unwrap(), CommitOutcome::Registered);
        assert!(matches!(c.phase(), Phase::Registering { .. }));
        assert_eq!(c.commit(&student("S2")).unwrap(), CommitOutcome::Filled);
        assert_eq!(c.phase(), Phase::Full);
    }

    #[test]
    fn status_moves_forward_only() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 2);
        assert!(c.set_status(CourseStatus::Closed).is_err());
        c.set_status(CourseStatus::InProgress).unwrap();
        assert!(c.is_registration_closed());
        c.set_status(CourseStatus::InProgress).unwrap();
        c.set_status(CourseStatus::Closed).unwrap();
        assert!(c.set_status(CourseStatus::Registration).is_err());
        assert_eq!(c.status(), CourseStatus::Closed);
    }

    #[test]
    fn commit_after_close_gives_the_seat_back() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 3);
        let s = student("S1");
        assert_eq!(c.reserve_if_available(), ReservationResult::Succeeded);
        c.start_early().unwrap();
        c.set_status(CourseStatus::Closed).unwrap();

        assert_eq!(c.commit(&s).unwrap(), CommitOutcome::Refused);
        let seats = c.snapshot();
        assert_eq!(seats.registered, 0);
        assert_eq!(seats.reservations, 0);
        assert!(!c.is_registered(s.code()));
    }

    #[test]
    fn commit_on_a_started_course_still_lands() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 3);
        c.reserve_if_available();
        c.start_early().unwrap();
        assert_eq!(c.commit(&student("S1")).unwrap(), CommitOutcome::Registered);
        assert_eq!(c.snapshot().registered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_start_times_out_after_first_commit() {
        let c = Arc::new(course("c1", Timeslot::new(0, 0).unwrap(), 5));
        let token = CancellationToken::new();
        c.reserve_if_available();
        c.commit(&student("S1")).unwrap();

        let res = c.wait_start(&token, Duration::from_secs(2)).await;
        assert_eq!(res, Completion::Waited);
    }

    #[tokio::test]
    async fn wait_completion_honours_cancel() {
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 5);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(c.wait_completion(&token).await, Completion::Cancelled);
    }
}
