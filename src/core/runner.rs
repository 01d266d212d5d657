//! # Run one worker to completion.
//!
//! ```text
//! publish TaskStarting
//! task.run(child) ── Ok / Canceled ──► publish TaskStopped
//!                 └─ Err(e)        ──► publish TaskFailed
//! timeout elapsed ──► cancel child ──► publish TimeoutHit ──► publish TaskFailed
//! ```
//!
//! Exactly one terminal event (`TaskStopped` or `TaskFailed`) is published per run.
//! The child token never cancels the parent.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    error::LoadError,
    events::{Bus, Event, EventKind},
    tasks::Task,
};

/// Runs `task` once under a child of `parent`, with an optional overall timeout.
pub async fn run_once<T: Task + ?Sized>(
    task: &T,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    bus: &Bus,
) -> Result<(), LoadError> {
    let child = parent.child_token();
    bus.publish(Event::new(EventKind::TaskStarting).with_task(task.name()));

    let res = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, task.run(child.clone())).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_task(task.name())
                        .with_timeout(dur),
                );
                Err(LoadError::Timeout { timeout: dur })
            }
        },
        None => task.run(child.clone()).await,
    };

    match res {
        Ok(()) => {
            bus.publish(Event::new(EventKind::TaskStopped).with_task(task.name()));
            Ok(())
        }
        Err(LoadError::Canceled) => {
            bus.publish(Event::new(EventKind::TaskStopped).with_task(task.name()));
            Err(LoadError::Canceled)
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task(task.name())
                    .with_reason(e.as_message()),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;

    async fn kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>, n: usize) -> Vec<EventKind> {
        let mut out = Vec::new();
        for _ in 0..n {
            out.push(rx.recv().await.unwrap().kind);
        }
        out
    }

    #[tokio::test]
    async fn success_publishes_start_and_stop() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let t = TaskFn::new("ok", |_ctx: CancellationToken| async { Ok(()) });
        run_once(&t, &CancellationToken::new(), None, &bus).await.unwrap();
        assert_eq!(
            kinds(&mut rx, 2).await,
            [EventKind::TaskStarting, EventKind::TaskStopped]
        );
    }

    #[tokio::test]
    async fn cancel_is_a_graceful_stop() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let t = TaskFn::new("cancel", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(LoadError::Canceled)
        });
        let parent = CancellationToken::new();
        parent.cancel();
        let res = run_once(&t, &parent, None, &bus).await;
        assert!(matches!(res, Err(LoadError::Canceled)));
        assert_eq!(
            kinds(&mut rx, 2).await,
            [EventKind::TaskStarting, EventKind::TaskStopped]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_child_and_fails() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let t = TaskFn::new("slow", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok(())
        });
        let parent = CancellationToken::new();
        let res = run_once(&t, &parent, Some(Duration::from_secs(1)), &bus).await;
        assert!(matches!(res, Err(LoadError::Timeout { .. })));
        assert!(!parent.is_cancelled());
        assert_eq!(
            kinds(&mut rx, 3).await,
            [
                EventKind::TaskStarting,
                EventKind::TimeoutHit,
                EventKind::TaskFailed
            ]
        );
    }
}
