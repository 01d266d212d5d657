//! Runtime events, broadcast bus and typed work-graph topics.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//! - [`Topic`], [`Topics`] synchronous typed fan-out for new courses and students
//!
//! ## Quick reference
//! - **Bus publishers**: `Supervisor`, `runner::run_once`, `LoadContext` and the scenario
//!   workers, `SubscriberSet` workers (overflow/panic).
//! - **Bus consumers**: `Supervisor::subscriber_listener()` (fans out to `SubscriberSet`
//!   and updates `AliveTracker`).
//! - **Topic publishers**: `LoadContext::add_course`/`activate_student`.
//! - **Topic subscribers**: closures installed by `scenario::install`.

mod bus;
mod event;
mod topic;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use topic::{Topic, Topics};
