//! # courseload
//!
//! **Courseload** drives a concurrent course-registration load against an online
//! university web application and scores how well the target keeps up.
//!
//! Simulated students register to courses, read announcements and submit
//! assignments; simulated teachers run each course from registration to closure.
//! Every closed course feeds one new course and one new student back into the run.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!        ┌──────────────────────┐        ┌──────────────────────┐
//!        │ Topic<Arc<Student>>  │        │  Topic<Arc<Course>>  │
//!        └──┬────────────────┬──┘        └──────────┬───────────┘
//!           ▼                ▼                      ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                        │
//! │  - TaskTracker (unbounded worker pool, root CancellationToken)     │
//! │  - Bus (broadcast runtime events)                                  │
//! │  - AliveTracker (running workers, by event sequence)               │
//! │  - SubscriberSet (fans out to event subscribers)                   │
//! └──────┬──────────────────────┬───────────────────────┬──────────────┘
//!        ▼                      ▼                       ▼
//!   RegistrationWorker    AnnouncementWorker       TeacherWorker
//!   (per student)         (per student)            (per course)
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  LoadContext                                                       │
//! │  - CourseRegistry + waiting list    - Matcher (seat reservations)  │
//! │  - CapacityCounter                  - ScoreBoard                   │
//! │  - UserPool, Generator              - load / retry deadlines       │
//! └────────────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   api::endpoints ──► HttpAgent (reqwest session per user)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Benchmark::run()
//!   ├─► prepare: teacher login, course list probe
//!   ├─► load:
//!   │     install topic subscribers
//!   │     add initial courses (shuffled timeslots) and students
//!   │     Supervisor::drive(load window + retry window)
//!   │        ├─ window elapsed ─► shutdown
//!   │        ├─ abort (critical error / too many errors) ─► shutdown
//!   │        └─ OS signal ─► shutdown
//!   ├─► validate: seats, reservations, timetables
//!   └─► final report (BenchmarkResult)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Scenario**      | Work graph, workers and benchmark phases.                    | [`scenario::Benchmark`], [`scenario::LoadContext`] |
//! | **Model**         | Courses, students, reservation protocol, matcher.            | [`model::Course`], [`model::Matcher`]     |
//! | **HTTP**          | Agent/connector seams and typed endpoints.                   | [`api::HttpAgent`], [`api::Connector`]    |
//! | **Scoring**       | Score tags, error counters, reporters.                       | [`score::ScoreBoard`], [`score::Reporter`] |
//! | **Supervision**   | Worker pool, runtime events, graceful shutdown.              | [`Supervisor`], [`Event`], [`Subscribe`]  |
//! | **Errors**        | Typed errors for the runtime and for load requests.          | [`LoadError`], [`RuntimeError`]           |
//! | **Configuration** | Environment options and tunable constants.                   | [`Config`]                                |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use courseload::{Config, api::ReqwestConnector, scenario::Benchmark};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::from_env()?;
//!     let connector = Arc::new(ReqwestConnector::new(&cfg));
//!
//!     let result = Benchmark::new(cfg, connector).run().await?;
//!     println!("score={} passed={}", result.score, result.passed);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

pub mod api;
pub mod generate;
pub mod model;
pub mod scenario;
pub mod score;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{AliveTracker, StopCause, Supervisor, SupervisorBuilder, run_once};
pub use error::{FailureKind, LoadError, RuntimeError};
pub use events::{Bus, Event, EventKind, Topic, Topics};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Task, TaskFn, TaskRef};
