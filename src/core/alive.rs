//! # Worker liveness tracker.
//!
//! Fed by the supervisor's bus listener. Only `TaskStarting` marks a worker alive and
//! only `TaskStopped`/`TaskFailed` mark it dead; events with `seq <= last_seq` for the
//! same worker are stale and ignored, so late delivery cannot resurrect a worker.
//!
//! ```text
//! update(TaskStopped,  seq=100) → alive=false, last_seq=100
//! update(TaskStarting, seq=99)  → rejected
//! ```

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct TaskState {
    last_seq: u64,
    alive: bool,
}

/// Names of the workers currently running.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, TaskState>>,
}

impl AliveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event of its worker.
    /// Returns `true` when the alive flag was set by this event.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.task.as_deref() else {
            return false;
        };
        let alive = match ev.kind {
            EventKind::TaskStarting => true,
            EventKind::TaskStopped | EventKind::TaskFailed => false,
            _ => return false,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(TaskState {
            last_seq: 0,
            alive: false,
        });
        if entry.last_seq != 0 && ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        entry.alive = alive;
        true
    }

    /// Sorted names of alive workers.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ts)| ts.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    pub async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .is_some_and(|ts| ts.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, task: &str) -> Event {
        Event::new(kind).with_task(task)
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let t = AliveTracker::new();
        let start = ev(EventKind::TaskStarting, "teacher/c1");
        let stop = ev(EventKind::TaskStopped, "teacher/c1");

        assert!(t.update(&start).await);
        assert!(t.is_alive("teacher/c1").await);
        assert!(t.update(&stop).await);
        assert!(!t.update(&start).await);
        assert!(!t.is_alive("teacher/c1").await);
    }

    #[tokio::test]
    async fn snapshot_is_sorted() {
        let t = AliveTracker::new();
        for name in ["b", "a", "c"] {
            t.update(&ev(EventKind::TaskStarting, name)).await;
        }
        t.update(&ev(EventKind::TaskFailed, "c")).await;
        assert_eq!(t.snapshot().await, ["a", "b"]);
    }

    #[tokio::test]
    async fn events_without_task_are_ignored() {
        let t = AliveTracker::new();
        assert!(!t.update(&Event::new(EventKind::TaskStarting)).await);
        assert!(t.snapshot().await.is_empty());
    }
}
