//! # Non-blocking fan-out of runtime events.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! - `emit` never waits (`try_send`).
//! - Each subscriber sees events in order; there is no ordering across subscribers.
//! - Overflow or a closed queue publishes `SubscriberOverflow` (never for an overflow
//!   event itself); a panic publishes `SubscriberPanicked` and the worker moves on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::Subscribe;
use crate::events::{Bus, Event, EventKind};

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues and workers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let res = AssertUnwindSafe(sub.on_event(ev.as_ref()))
                        .catch_unwind()
                        .await;
                    if let Err(panic) = res {
                        let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = panic.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            }));
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Delivers `event` to every subscriber queue.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow = matches!(event.kind, EventKind::SubscriberOverflow);
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, ev: &Event) {
            if matches!(ev.kind, EventKind::CourseFull) {
                panic!("boom");
            }
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_isolates_panics() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone(), Arc::new(Panicky)], bus.clone());

        set.emit(&Event::new(EventKind::CourseAdded));
        set.emit(&Event::new(EventKind::CourseFull));
        set.emit(&Event::new(EventKind::CourseClosed));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("panicky"));

        set.shutdown().await;
        assert_eq!(
            *rec.seen.lock().unwrap(),
            [
                EventKind::CourseAdded,
                EventKind::CourseFull,
                EventKind::CourseClosed
            ]
        );
    }
}
