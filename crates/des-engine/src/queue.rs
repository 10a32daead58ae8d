//! `EventQueue` — the time-ordered pending-event structure.
//!
//! # Ordering
//!
//! Events are ordered by:
//! 1. Time (earlier first)
//! 2. Priority (smaller number first)
//! 3. Order (FIFO for same time and priority)
//!
//! The `order` component is assigned fresh at every post, which makes keys
//! unique: a `BTreeMap` rejects duplicate keys, and two posts of the same
//! event at the same `(time, priority)` within one tick must be allowed to
//! coexist.
//!
//! # Performance note
//!
//! `BTreeMap` gives O(log n) insert, O(log n) extract-min, and O(log n)
//! removal by key — the last one matters because dropping an arbitrary
//! pending event is a first-class operation, not just popping the head.

use std::collections::BTreeMap;

use des_core::{EventId, Tick};

/// Composite ordering key for a pending event.
///
/// Derived `Ord` is lexicographic in field order, which is exactly the
/// queue discipline: time, then priority, then arrival.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct EventKey {
    /// When the event fires.
    pub time: Tick,
    /// Tie-break at equal time; smaller fires first.
    pub priority: i32,
    /// Insertion counter; guarantees uniqueness and FIFO at full ties.
    pub order: u64,
}

/// The pending-event queue.
#[derive(Default)]
pub struct EventQueue {
    inner: BTreeMap<EventKey, EventId>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event under `key`.  Keys are unique by construction
    /// (`order` is fresh per post), so this never displaces an entry.
    pub fn insert(&mut self, key: EventKey, ev: EventId) {
        let displaced = self.inner.insert(key, ev);
        debug_assert!(displaced.is_none(), "duplicate event key {key:?}");
    }

    /// Remove the entry with exactly this key, returning the event if it
    /// was present.
    pub fn remove(&mut self, key: &EventKey) -> Option<EventId> {
        self.inner.remove(key)
    }

    /// The minimal entry, without removing it.
    pub fn peek_first(&self) -> Option<(EventKey, EventId)> {
        self.inner.iter().next().map(|(k, v)| (*k, *v))
    }

    /// Remove and return the minimal entry.
    pub fn pop_first(&mut self) -> Option<(EventKey, EventId)> {
        self.inner.pop_first()
    }

    /// The time of the next event to fire, if any.
    pub fn next_time(&self) -> Option<Tick> {
        self.inner.keys().next().map(|k| k.time)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
