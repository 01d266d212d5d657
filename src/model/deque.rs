//! # Ring-buffered double-ended queue.
//!
//! Backing storage of fixed initial capacity `C` with `head`/`tail` indices modulo the
//! capacity and an explicit `len`. A push on a full buffer doubles the storage; when the
//! live region wraps, it is copied in two segments `[head..C) ++ [0..tail)` and the
//! indices reset to `head = 0`, `tail = len`.
//!
//! Callers serialize access (the student's inbox lock). The ordering contract used by the
//! announcement reader: with only `push_back`, `pop_front` is FIFO; an unused `pop_front`
//! result must be `push_front`ed back before the next pop.

use super::announcement::Announcement;
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 8;

/// Growable ring buffer with push/pop at both ends.
#[derive(Debug, Clone)]
pub struct RingDeque<T> {
    buf: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
}

/// Per-student queue of unread announcements.
pub type AnnouncementDeque = RingDeque<Arc<Announcement>>;

impl<T> RingDeque<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty deque; capacity is clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn push_back(&mut self, value: T) {
        self.grow_if_full();
        self.buf[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;
    }

    /// Inserts at the front; on an empty deque the element is also the back.
    pub fn push_front(&mut self, value: T) {
        self.grow_if_full();
        let cap = self.capacity();
        self.head = (self.head + cap - 1) % cap;
        self.buf[self.head] = Some(value);
        self.len += 1;
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.buf[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        value
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let cap = self.capacity();
        self.tail = (self.tail + cap - 1) % cap;
        self.len -= 1;
        self.buf[self.tail].take()
    }

    /// Iterates front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let cap = self.capacity();
        (0..self.len).filter_map(move |i| self.buf[(self.head + i) % cap].as_ref())
    }

    fn grow_if_full(&mut self) {
        let cap = self.capacity();
        if self.len < cap {
            return;
        }
        let mut next: Vec<Option<T>> = Vec::with_capacity(cap * 2);
        if self.head < self.tail {
            next.extend(self.buf[self.head..self.tail].iter_mut().map(Option::take));
        } else {
            // full and wrapped (or head == tail == 0): two segments
            let (front, back) = self.buf.split_at_mut(self.head);
            next.extend(back.iter_mut().map(Option::take));
            next.extend(front[..self.tail].iter_mut().map(Option::take));
        }
        next.resize_with(cap * 2, || None);
        self.buf = next;
        self.head = 0;
        self.tail = self.len;
    }
}

impl<T> Default for RingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}
