//! Course registry: id map plus the ordered waiting list.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use super::Course;

/// Authoritative course map and the list of courses accepting registrations.
///
/// The two views have separate locks. The matcher iterates the waiting list under a
/// read lock while courses are added or looked up elsewhere; closed courses linger in
/// the list until the next [`CourseRegistry::remove_closed`].
#[derive(Debug, Default)]
pub struct CourseRegistry {
    by_id: RwLock<HashMap<String, Arc<Course>>>,
    waiting: RwLock<Vec<Arc<Course>>>,
}

/// Read view over the waiting list, in insertion order.
pub struct WaitingView<'a> {
    guard: RwLockReadGuard<'a, Vec<Arc<Course>>>,
}

impl WaitingView<'_> {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Course>> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl CourseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a course and appends it to the waiting list.
    pub fn add(&self, course: Arc<Course>) {
        self.by_id
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(course.id.clone(), Arc::clone(&course));
        self.waiting
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(course);
    }

    pub fn get(&self, id: &str) -> Option<Arc<Course>> {
        self.by_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.by_id.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn waiting_view(&self) -> WaitingView<'_> {
        WaitingView {
            guard: self.waiting.read().unwrap_or_else(|e| e.into_inner()),
        }
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting_view().len()
    }

    /// Removes `course` from the waiting list; returns whether it was there.
    pub fn remove_from_waiting(&self, course: &Course) -> bool {
        let mut waiting = self.waiting.write().unwrap_or_else(|e| e.into_inner());
        let before = waiting.len();
        waiting.retain(|c| c.id != course.id);
        waiting.len() != before
    }

    /// Evicts every course whose registration is closed; returns how many.
    pub fn remove_closed(&self) -> usize {
        let mut waiting = self.waiting.write().unwrap_or_else(|e| e.into_inner());
        let before = waiting.len();
        waiting.retain(|c| !c.is_registration_closed());
        before - waiting.len()
    }

    /// Copy of the id map for end-of-run validation.
    pub fn snapshot_for_validation(&self) -> HashMap<String, Arc<Course>> {
        self.by_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timeslot;
    use crate::model::test_support::course;

    #[test]
    fn waiting_list_keeps_insertion_order_and_evicts_lazily() {
        let reg = CourseRegistry::new();
        let slot = Timeslot::new(0, 0).unwrap();
        for id in ["c1", "c2", "c3"] {
            reg.add(Arc::new(course(id, slot, 1)));
        }
        let ids: Vec<_> = reg.waiting_view().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);

        let c2 = reg.get("c2").unwrap();
        c2.reserve_if_available();
        assert_eq!(reg.waiting_len(), 3);
        assert_eq!(reg.remove_closed(), 1);

        let c1 = reg.get("c1").unwrap();
        assert!(reg.remove_from_waiting(&c1));
        assert!(!reg.remove_from_waiting(&c1));
        assert_eq!(reg.waiting_len(), 1);
        assert_eq!(reg.count(), 3);
        assert_eq!(reg.snapshot_for_validation().len(), 3);
    }
}
