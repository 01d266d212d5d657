//! Runtime core: worker pool and lifecycle.
//!
//! - [`runner`]: runs one worker with event publishing;
//! - [`supervisor`]: owns the pool, the bus listener and graceful shutdown;
//! - [`alive`]: tracks running workers for the grace-exceeded report;
//! - [`shutdown`]: OS signal handling;
//! - [`builder`]: assembles a supervisor with its subscribers.

mod alive;
mod builder;
mod runner;
mod shutdown;
mod supervisor;

pub use alive::AliveTracker;
pub use builder::SupervisorBuilder;
pub use runner::run_once;
pub use supervisor::{StopCause, Supervisor};
