//! # Student entity.
//!
//! A student owns two locks, always taken schedule-before-inbox:
//!
//! - **schedule**: the 5×6 timetable and the number of occupied slots. The matcher holds
//!   it (via [`Student::lock_schedule`]) for a whole reservation batch.
//! - **inbox**: the unread [`AnnouncementDeque`], the read set and the index of every
//!   announcement the student was sent.
//!
//! Waiters (slot release, read announcements, new announcements) use [`Notify`] with the
//! register-then-check pattern, so a notification between the check and the await is
//! never lost.

use std::collections::{HashMap, HashSet};
use std::future;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::timeslot::{DAYS, PERIODS};
use super::{Announcement, AnnouncementDeque, Course, Timeslot, UserAccount};
use crate::api::HttpAgent;
use crate::error::LoadError;

/// A course the student is currently registered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub slot: Timeslot,
    pub credit: u8,
}

/// Final result of a closed course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseResult {
    pub course_id: String,
    pub course_code: String,
    pub credit: u8,
    pub total_score: u32,
}

#[derive(Debug, Default)]
struct Schedule {
    slots: [[Option<String>; PERIODS]; DAYS],
    count: usize,
}

#[derive(Debug, Default)]
struct Inbox {
    unread: AnnouncementDeque,
    read: HashSet<String>,
    known: HashMap<String, Arc<Announcement>>,
}

/// A simulated student.
pub struct Student {
    pub account: UserAccount,
    agent: Arc<dyn HttpAgent>,
    schedule: Mutex<Schedule>,
    inbox: Mutex<Inbox>,
    enrollments: Mutex<Vec<Enrollment>>,
    results: Mutex<Vec<CourseResult>>,
    slot_released: Notify,
    inbox_changed: Notify,
}

impl std::fmt::Debug for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Student")
            .field("code", &self.account.code)
            .field("registering", &self.registering_count())
            .finish()
    }
}

/// Exclusive access to a student's timetable.
///
/// Dropping the guard after a slot was cleared wakes slot-release waiters.
pub struct ScheduleGuard<'a> {
    schedule: MutexGuard<'a, Schedule>,
    released: &'a Notify,
    cleared: bool,
}

impl ScheduleGuard<'_> {
    pub fn is_slot_free(&self, slot: Timeslot) -> bool {
        let (d, p) = slot.index();
        self.schedule.slots[d][p].is_none()
    }

    /// Occupies the course's timeslot; an occupied slot is a double booking.
    pub fn fill_slot(&mut self, course: &Course) -> Result<(), LoadError> {
        let (d, p) = course.slot().index();
        let cell = &mut self.schedule.slots[d][p];
        if let Some(other) = cell {
            return Err(LoadError::critical(format!(
                "timeslot {} already taken by {other} (course={})",
                course.slot(),
                course.id
            )));
        }
        *cell = Some(course.id.clone());
        self.schedule.count += 1;
        Ok(())
    }

    /// Frees `slot`; returns the id of the course that held it.
    pub fn clear_slot(&mut self, slot: Timeslot) -> Option<String> {
        let (d, p) = slot.index();
        let prev = self.schedule.slots[d][p].take();
        if prev.is_some() {
            self.schedule.count -= 1;
            self.cleared = true;
        }
        prev
    }

    /// Number of occupied timeslots.
    pub fn count(&self) -> usize {
        self.schedule.count
    }

    pub fn course_at(&self, slot: Timeslot) -> Option<&str> {
        let (d, p) = slot.index();
        self.schedule.slots[d][p].as_deref()
    }
}

impl Drop for ScheduleGuard<'_> {
    fn drop(&mut self) {
        if self.cleared {
            self.released.notify_waiters();
        }
    }
}

impl Student {
    pub fn new(account: UserAccount, agent: Arc<dyn HttpAgent>) -> Self {
        Self {
            account,
            agent,
            schedule: Mutex::new(Schedule::default()),
            inbox: Mutex::new(Inbox::default()),
            enrollments: Mutex::new(Vec::new()),
            results: Mutex::new(Vec::new()),
            slot_released: Notify::new(),
            inbox_changed: Notify::new(),
        }
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.account.code
    }

    pub fn agent(&self) -> &dyn HttpAgent {
        self.agent.as_ref()
    }

    // ---- schedule ----

    pub fn lock_schedule(&self) -> ScheduleGuard<'_> {
        ScheduleGuard {
            schedule: self.schedule.lock().unwrap_or_else(|e| e.into_inner()),
            released: &self.slot_released,
            cleared: false,
        }
    }

    /// Occupied timeslots (registered plus reserved).
    pub fn registering_count(&self) -> usize {
        self.lock_schedule().count()
    }

    /// Frees a single slot (course closed or reservation rolled back).
    pub fn release_slot(&self, slot: Timeslot) -> Option<String> {
        self.lock_schedule().clear_slot(slot)
    }

    /// `(slot, course_id)` for every occupied timeslot.
    pub fn timetable(&self) -> Vec<(Timeslot, String)> {
        let guard = self.lock_schedule();
        Timeslot::all()
            .filter_map(|slot| guard.course_at(slot).map(|id| (slot, id.to_string())))
            .collect()
    }

    /// Waits until fewer than `cap` slots are occupied.
    ///
    /// Returns `false` on cancellation or when `deadline` passes first.
    pub async fn wait_slot_release(
        &self,
        cap: usize,
        token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> bool {
        loop {
            let mut notified = pin!(self.slot_released.notified());
            notified.as_mut().enable();
            if self.registering_count() < cap {
                return true;
            }
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = sleep_until_opt(deadline) => return false,
                _ = notified => {}
            }
        }
    }

    // ---- enrollments & results ----

    pub fn add_enrollment(&self, course: &Course) {
        self.enrollments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Enrollment {
                course_id: course.id.clone(),
                course_code: course.param.code.clone(),
                course_name: course.param.name.clone(),
                slot: course.slot(),
                credit: course.credit(),
            });
    }

    /// Removes a course from the active list (it closed).
    pub fn finish_enrollment(&self, course_id: &str) -> Option<Enrollment> {
        let mut list = self.enrollments.lock().unwrap_or_else(|e| e.into_inner());
        let pos = list.iter().position(|e| e.course_id == course_id)?;
        Some(list.remove(pos))
    }

    pub fn enrollments(&self) -> Vec<Enrollment> {
        self.enrollments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn record_result(&self, result: CourseResult) {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result);
    }

    pub fn results(&self) -> Vec<CourseResult> {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn total_credit(&self) -> u32 {
        self.results().iter().map(|r| u32::from(r.credit)).sum()
    }

    /// Credit-weighted grade point average over closed courses (`total_score / 100`).
    pub fn gpa(&self) -> f64 {
        let results = self.results();
        let credits: u32 = results.iter().map(|r| u32::from(r.credit)).sum();
        if credits == 0 {
            return 0.0;
        }
        let points: u64 = results
            .iter()
            .map(|r| u64::from(r.total_score) * u64::from(r.credit))
            .sum();
        points as f64 / 100.0 / f64::from(credits)
    }

    // ---- announcements ----

    fn inbox(&self) -> MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a new announcement; duplicates of a known id are ignored.
    pub fn push_announcement(&self, a: Arc<Announcement>) {
        {
            let mut inbox = self.inbox();
            if inbox.known.contains_key(&a.id) {
                return;
            }
            inbox.known.insert(a.id.clone(), Arc::clone(&a));
            inbox.unread.push_back(a);
        }
        self.inbox_changed.notify_waiters();
    }

    /// Takes the oldest unread announcement.
    pub fn pop_unread(&self) -> Option<Arc<Announcement>> {
        self.inbox().unread.pop_front()
    }

    /// Puts back an announcement whose read failed, ahead of everything else.
    pub fn restore_unread(&self, a: Arc<Announcement>) {
        let mut inbox = self.inbox();
        if !inbox.read.contains(&a.id) {
            inbox.unread.push_front(a);
        }
    }

    /// Marks `id` as read; idempotent. Returns `true` the first time.
    pub fn mark_read(&self, id: &str) -> bool {
        let newly = {
            let mut inbox = self.inbox();
            let newly = inbox.read.insert(id.to_string());
            if newly && inbox.unread.iter().any(|a| a.id == id) {
                let mut rest = AnnouncementDeque::with_capacity(inbox.unread.capacity());
                while let Some(a) = inbox.unread.pop_front() {
                    if a.id != id {
                        rest.push_back(a);
                    }
                }
                inbox.unread = rest;
            }
            newly
        };
        if newly {
            self.inbox_changed.notify_waiters();
        }
        newly
    }

    pub fn is_read(&self, id: &str) -> bool {
        self.inbox().read.contains(id)
    }

    pub fn unread_count(&self) -> usize {
        self.inbox().unread.len()
    }

    pub fn has_unread(&self) -> bool {
        !self.inbox().unread.is_empty()
    }

    /// Announcement sent to this student, read or not.
    pub fn announcement(&self, id: &str) -> Option<Arc<Announcement>> {
        self.inbox().known.get(id).cloned()
    }

    pub fn announcement_count(&self) -> usize {
        self.inbox().known.len()
    }

    /// Unread ids in queue order.
    pub fn unread_ids(&self) -> Vec<String> {
        self.inbox().unread.iter().map(|a| a.id.clone()).collect()
    }

    /// Waits until `id` is read. Returns `false` on cancel or after `timeout`.
    pub async fn wait_read(&self, id: &str, token: &CancellationToken, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let mut notified = pin!(self.inbox_changed.notified());
            notified.as_mut().enable();
            if self.is_read(id) {
                return true;
            }
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = tokio::time::sleep_until(deadline) => return false,
                _ = notified => {}
            }
        }
    }

    /// Waits until there is an unread announcement. Returns `false` on cancel or timeout.
    pub async fn wait_unread(&self, token: &CancellationToken, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let mut notified = pin!(self.inbox_changed.notified());
            notified.as_mut().enable();
            if self.has_unread() {
                return true;
            }
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = tokio::time::sleep_until(deadline) => return false,
                _ = notified => {}
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => future::pending::<()>().await,
    }
}
