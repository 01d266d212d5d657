//! # Runtime event subscribers.
//!
//! ```text
//! workers ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                              ├──► LogWriter
//!                                                              └──► custom subscribers
//! ```
//!
//! Implement [`Subscribe`] to observe the run (metrics, progress, assertions in tests).

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
