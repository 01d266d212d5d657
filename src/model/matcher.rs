//! # Registration matcher.
//!
//! [`Matcher::reserve`] greedily reserves seats for one student:
//!
//! 1. take the student's schedule lock for the whole scan;
//! 2. take a read view of the waiting list;
//! 3. in insertion order, skip courses whose timeslot is taken, otherwise try
//!    `reserve_if_available`; on success fill the timeslot;
//! 4. stop once `budget` seats are held.
//!
//! The result is a [`ReservedBatch`]. The caller performs the HTTP registration and then
//! either commits or rolls back the batch; a batch dropped unsettled rolls itself back,
//! so a cancelled worker never leaks a reservation.
//!
//! Lock order: student schedule → course. The capacity counter is touched only after the
//! schedule lock is released.

use std::mem;
use std::sync::Arc;

use super::{CapacityCounter, CommitOutcome, Course, CourseRegistry, ReservationResult, Student};
use crate::error::LoadError;

/// Greedy seat matcher over the registry's waiting list.
#[derive(Debug, Clone)]
pub struct Matcher {
    registry: Arc<CourseRegistry>,
    capacity: Arc<CapacityCounter>,
}

impl Matcher {
    pub fn new(registry: Arc<CourseRegistry>, capacity: Arc<CapacityCounter>) -> Self {
        Self { registry, capacity }
    }

    /// Reserves up to `budget` seats for `student`. Earlier-listed courses win.
    pub fn reserve(&self, student: &Arc<Student>, budget: usize) -> Result<ReservedBatch, LoadError> {
        let mut reserved: Vec<Arc<Course>> = Vec::new();
        let mut saw_unavailable = false;
        let mut failure = None;

        {
            let mut schedule = student.lock_schedule();
            let waiting = self.registry.waiting_view();
            for course in waiting.iter() {
                if reserved.len() >= budget {
                    break;
                }
                if !schedule.is_slot_free(course.slot()) {
                    continue;
                }
                match course.reserve_if_available() {
                    ReservationResult::Succeeded => {
                        if let Err(e) = schedule.fill_slot(course) {
                            let _ = course.rollback();
                            failure = Some(e);
                            break;
                        }
                        reserved.push(Arc::clone(course));
                    }
                    ReservationResult::NotAvailable => saw_unavailable = true,
                }
            }
        }

        if saw_unavailable {
            self.registry.remove_closed();
        }
        for course in &reserved {
            self.capacity.dec(course.slot());
        }

        let batch = ReservedBatch {
            student: Arc::clone(student),
            courses: reserved,
            capacity: Arc::clone(&self.capacity),
            settled: false,
        };
        match failure {
            Some(e) => {
                let _ = batch.rollback();
                Err(e)
            }
            None => Ok(batch),
        }
    }
}

/// What [`ReservedBatch::commit`] did with each course.
#[derive(Debug, Default)]
pub struct Settled {
    /// Courses this batch filled.
    pub filled: Vec<Arc<Course>>,
    /// Courses that closed before the commit; their timeslots were cleared.
    pub refused: Vec<Arc<Course>>,
}

/// Seats held for one student, pending the HTTP registration.
#[derive(Debug)]
pub struct ReservedBatch {
    student: Arc<Student>,
    courses: Vec<Arc<Course>>,
    capacity: Arc<CapacityCounter>,
    settled: bool,
}

impl ReservedBatch {
    pub fn courses(&self) -> &[Arc<Course>] {
        &self.courses
    }

    pub fn course_ids(&self) -> Vec<String> {
        self.courses.iter().map(|c| c.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Commits every reservation and records the enrollments.
    ///
    /// A course that closed in the meantime frees the student's timeslot instead; its
    /// seat is gone for good, so capacity is not restored. If a commit fails, the
    /// reservations not yet committed are rolled back before the error is returned.
    pub fn commit(mut self) -> Result<Settled, LoadError> {
        self.settled = true;
        let courses = mem::take(&mut self.courses);
        let mut out = Settled::default();
        for (i, course) in courses.iter().enumerate() {
            match course.commit(&self.student) {
                Ok(CommitOutcome::Registered) => self.student.add_enrollment(course),
                Ok(CommitOutcome::Filled) => {
                    self.student.add_enrollment(course);
                    out.filled.push(Arc::clone(course));
                }
                Ok(CommitOutcome::Refused) => {
                    self.student.release_slot(course.slot());
                    out.refused.push(Arc::clone(course));
                }
                Err(e) => {
                    self.courses = courses[i + 1..].to_vec();
                    // the failed course still holds its reservation
                    let _ = course.rollback();
                    self.student.release_slot(course.slot());
                    self.capacity.inc(course.slot());
                    let _ = self.release();
                    return Err(e);
                }
            }
        }
        Ok(out)
    }

    /// Releases every reservation: timeslots cleared, course seats returned, capacity
    /// restored.
    pub fn rollback(mut self) -> Result<(), LoadError> {
        self.settled = true;
        self.release()
    }

    fn release(&mut self) -> Result<(), LoadError> {
        let courses = mem::take(&mut self.courses);
        let mut first_err = None;
        {
            let mut schedule = self.student.lock_schedule();
            for course in &courses {
                schedule.clear_slot(course.slot());
                if let Err(e) = course.rollback() {
                    first_err.get_or_insert(e);
                }
            }
        }
        for course in &courses {
            self.capacity.inc(course.slot());
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for ReservedBatch {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseStatus, Timeslot};
    use crate::model::test_support::{course, student};

    fn setup(courses: &[(&str, u8, u8, usize)]) -> (Arc<CourseRegistry>, Arc<CapacityCounter>, Matcher) {
        let reg = Arc::new(CourseRegistry::new());
        let cap = Arc::new(CapacityCounter::new());
        for (id, d, p, seats) in courses {
            let slot = Timeslot::new(*d, *p).unwrap();
            reg.add(Arc::new(course(id, slot, *seats)));
            cap.inc_by(slot, *seats as i32);
        }
        let m = Matcher::new(Arc::clone(&reg), Arc::clone(&cap));
        (reg, cap, m)
    }

    #[test]
    fn skips_conflicting_timeslots() {
        let (_, _, m) = setup(&[("c1", 0, 0, 5), ("c2", 0, 0, 5), ("c3", 0, 1, 5)]);
        let s = student("S1");
        let batch = m.reserve(&s, 5).unwrap();
        assert_eq!(batch.course_ids(), ["c1", "c3"]);
        assert_eq!(s.registering_count(), 2);
        batch.commit().unwrap();
        assert_eq!(s.enrollments().len(), 2);
    }

    #[test]
    fn rollback_restores_everything() {
        let (reg, cap, m) = setup(&[("c1", 0, 0, 1), ("c2", 0, 1, 5)]);
        let slot = Timeslot::new(0, 0).unwrap();
        let s = student("S1");
        let batch = m.reserve(&s, 2).unwrap();
        assert_eq!(cap.get(slot), 0);

        batch.rollback().unwrap();
        assert_eq!(cap.get(slot), 1);
        assert_eq!(s.registering_count(), 0);
        let c1 = reg.get("c1").unwrap();
        assert_eq!(c1.snapshot().reservations, 0);
        // closed stays closed
        assert!(c1.is_registration_closed());
    }

    #[test]
    fn dropped_batch_rolls_back() {
        let (reg, _, m) = setup(&[("c1", 0, 0, 3)]);
        let s = student("S1");
        drop(m.reserve(&s, 1).unwrap());
        assert_eq!(reg.get("c1").unwrap().snapshot().reservations, 0);
        assert_eq!(s.registering_count(), 0);
    }

    #[test]
    fn closed_courses_are_evicted_after_scan() {
        let (reg, _, m) = setup(&[("c1", 0, 0, 1), ("c2", 0, 1, 5)]);
        let _held = m.reserve(&student("S1"), 1).unwrap();
        assert_eq!(reg.waiting_len(), 2);
        let other = m.reserve(&student("S2"), 2).unwrap();
        assert_eq!(other.course_ids(), ["c2"]);
        assert_eq!(reg.waiting_len(), 1);
        other.commit().unwrap();
    }

    #[test]
    fn commit_after_close_frees_the_timeslot() {
        let (reg, cap, m) = setup(&[("c1", 0, 0, 3), ("c2", 0, 1, 3)]);
        let s = student("S1");
        let batch = m.reserve(&s, 2).unwrap();
        let c1 = reg.get("c1").unwrap();
        c1.start_early().unwrap();
        c1.set_status(CourseStatus::Closed).unwrap();

        let settled = batch.commit().unwrap();
        assert_eq!(settled.refused.len(), 1);
        assert_eq!(settled.refused[0].id, "c1");
        assert!(settled.filled.is_empty());

        let table = s.timetable();
        assert_eq!(table, vec![(Timeslot::new(0, 1).unwrap(), "c2".to_string())]);
        assert_eq!(s.enrollments().len(), 1);
        assert_eq!(c1.snapshot().reservations, 0);
        assert!(!c1.is_registered(s.code()));
        // a closed course does not give its seat back
        assert_eq!(cap.get(c1.slot()), 2);
    }

    #[test]
    fn zero_budget_reserves_nothing() {
        let (_, _, m) = setup(&[("c1", 0, 0, 3)]);
        assert!(m.reserve(&student("S1"), 0).unwrap().is_empty());
    }
}
