//! # Worker abstractions.
//!
//! - [`Task`] async, cancelable unit of work driven by the supervisor
//! - [`TaskFn`] closure-backed task
//! - [`TaskRef`] shared handle (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
