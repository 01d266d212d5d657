//! # Load scenario: the self-feeding work graph and the benchmark phases.
//!
//! ```text
//!            ┌──────────── Topic<Arc<Student>> ────────────┐
//!            ▼                                              ▼
//!   RegistrationWorker                              AnnouncementWorker
//!   (grades, search, matcher, PUT)                  (list, detail, mark read)
//!
//!            ┌──────────── Topic<Arc<Course>> ─────────────┐
//!            ▼
//!   TeacherWorker ── course closed ──► add_course() ──► Topic<Arc<Course>>
//!                                  └─► activate_student() ──► Topic<Arc<Student>>
//! ```
//!
//! Every worker runs under the supervisor, shares one [`LoadContext`] and stops
//! issuing requests when the load window ends.

mod announcement;
mod benchmark;
mod context;
mod grades;
mod graph;
mod load;
mod registration;
mod teacher;

pub use announcement::AnnouncementWorker;
pub use benchmark::Benchmark;
pub use context::LoadContext;
pub use graph::install;
pub use registration::RegistrationWorker;
pub use teacher::TeacherWorker;
