//! # Typed topics for the self-feeding work graph.
//!
//! A [`Topic<T>`] delivers one value to every subscriber **synchronously** from the
//! publisher's call, in registration order. Subscribers are closures installed by
//! `scenario::install` before the load starts. They must not block: they spawn a
//! worker and return.
//!
//! ```text
//!   TeacherWorker ──publish(course)──►  Topic<Arc<Course>>   ──► spawn TeacherWorker
//!                 ──publish(student)─►  Topic<Arc<Student>>  ──► spawn RegistrationWorker
//!                                                            └─► spawn AnnouncementWorker
//! ```
//!
//! Publishing after [`Topic::close`] is a no-op. Closing also drops the subscriber
//! closures, which breaks the reference cycle between the closures and the load context
//! they capture.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::model::{Course, Student};

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Synchronous fan-out channel for values of type `T`.
pub struct Topic<T> {
    name: &'static str,
    subscribers: RwLock<Vec<(&'static str, Handler<T>)>>,
    closed: AtomicBool,
}

impl<T> Topic<T> {
    /// Creates an empty, open topic.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            subscribers: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Appends a subscriber. Subscribing to a closed topic is ignored.
    pub fn subscribe<F>(&self, name: &'static str, handler: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return;
        }
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.push((name, Box::new(handler)));
    }

    /// Delivers `value` to every subscriber in registration order.
    ///
    /// Returns the number of subscribers that were called (0 once closed).
    pub fn publish(&self, value: &T) -> usize {
        if self.is_closed() {
            return 0;
        }
        let subs = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, handler) in subs.iter() {
            handler(value);
        }
        subs.len()
    }

    /// Stops delivery and drops all subscribers.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.clear();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Names of the installed subscribers, in delivery order.
    pub fn subscriber_names(&self) -> Vec<&'static str> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(name, _)| *name)
            .collect()
    }
}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_names())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The two topics of the work graph.
#[derive(Debug)]
pub struct Topics {
    /// Newly activated students.
    pub students: Topic<Arc<Student>>,
    /// Newly added courses.
    pub courses: Topic<Arc<Course>>,
}

impl Topics {
    pub fn new() -> Self {
        Self {
            students: Topic::new("students"),
            courses: Topic::new("courses"),
        }
    }

    /// Closes both topics.
    pub fn close(&self) {
        self.students.close();
        self.courses.close();
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn delivers_in_registration_order() {
        let topic: Topic<u32> = Topic::new("numbers");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            topic.subscribe(name, move |v| seen.lock().unwrap().push((name, *v)));
        }

        assert_eq!(topic.publish(&7), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn publish_after_close_is_noop() {
        let topic: Topic<u32> = Topic::new("numbers");
        let hits = Arc::new(Mutex::new(0));
        let h = Arc::clone(&hits);
        topic.subscribe("count", move |_| *h.lock().unwrap() += 1);

        topic.close();
        assert_eq!(topic.publish(&1), 0);
        assert_eq!(*hits.lock().unwrap(), 0);

        topic.subscribe("late", |_| panic!("must not be installed"));
        assert!(topic.subscriber_names().is_empty());
        // closure dropped on close, releasing its captures
        assert_eq!(Arc::strong_count(&hits), 1);
    }
}
