//! # Closure-backed task.
//!
//! [`TaskFn`] wraps `F: Fn(CancellationToken) -> Fut` and builds a fresh future per run.
//! Shared state goes into the closure explicitly as `Arc<...>`.
//!
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use courseload::{LoadError, TaskFn, TaskRef};
//!
//! let t: TaskRef = TaskFn::arc("reporter", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, LoadError>(())
//! });
//! assert_eq!(t.name(), "reporter");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Task;
use crate::error::LoadError;

/// Function-backed task.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task behind an `Arc`, ready to be used as a [`TaskRef`](crate::TaskRef).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), LoadError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), LoadError> {
        (self.f)(ctx).await
    }
}
