//! # Event subscriber trait.
//!
//! [`Subscribe`] plugs an observer into the runtime event stream. Each subscriber gets a
//! dedicated worker, a bounded queue ([`Subscribe::queue_capacity`]) and panic isolation:
//!
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker ──► subscriber.on_event()
//!                                              └─► panic caught → SubscriberPanicked
//! ```
//!
//! A full queue drops the event for that subscriber only and publishes
//! `EventKind::SubscriberOverflow`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use courseload::{Event, EventKind, Subscribe};
//!
//! struct FullCourses;
//!
//! #[async_trait]
//! impl Subscribe for FullCourses {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::CourseFull) {
//!             // count it
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "full-courses" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// Runs on its own worker; events arrive in FIFO order. Avoid blocking calls.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes one event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity, clamped to at least 1. Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
