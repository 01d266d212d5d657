//! # Domain model of the load engine.
//!
//! Entities shared between workers: courses with their seat bookkeeping, students
//! with their timetable and unread announcements, the registry that lists courses
//! still accepting registrations, and the matcher that reserves seats.
//!
//! ## Lock order
//! ```text
//! student schedule ──► student inbox
//!        │
//!        └──► course seats ──► (nothing)
//!
//! capacity counter: leaf, never taken while holding another lock
//! ```

mod announcement;
mod class;
mod course;
mod deque;
mod matcher;
mod registry;
mod student;
mod timeslot;
mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use announcement::Announcement;
pub use class::{Class, ClassParam, Submission};
pub use course::{
    CommitOutcome, Completion, Course, CourseKind, CourseParam, CourseStatus, Phase,
    ReservationResult, SeatSnapshot,
};
pub use deque::{AnnouncementDeque, RingDeque};
pub use matcher::{Matcher, ReservedBatch, Settled};
pub use registry::{CourseRegistry, WaitingView};
pub use student::{CourseResult, Enrollment, ScheduleGuard, Student};
pub use timeslot::{CapacityCounter, DAYS, PERIODS, Timeslot};
pub use user::{Teacher, UserAccount, UserPool};
