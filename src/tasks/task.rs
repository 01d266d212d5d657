//! # Task abstraction.
//!
//! A [`Task`] is one long-running worker of the load: a student's registration loop,
//! a student's announcement reader, a course's teacher, the periodic reporter. It gets
//! a child [`CancellationToken`] of the run and must return soon after it is cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::LoadError;

/// # Asynchronous, cancelable unit of work.
///
/// Returning `Err(LoadError::Canceled)` is a graceful exit, reported like `Ok(())`.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use courseload::{LoadError, Task};
///
/// struct Probe;
///
/// #[async_trait]
/// impl Task for Probe {
///     fn name(&self) -> &str { "probe" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), LoadError> {
///         if ctx.is_cancelled() {
///             return Err(LoadError::Canceled);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Stable name, e.g. `registration/S00001` or `teacher/<course id>`.
    fn name(&self) -> &str;

    /// Runs until the work is done or `ctx` is cancelled.
    async fn run(&self, ctx: CancellationToken) -> Result<(), LoadError>;
}

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;
