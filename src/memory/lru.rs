//! Access Order Module
//!
//! Tracks key access order for LRU eviction, and doubles as the set of
//! tracked keys the sweep walks.

use std::collections::VecDeque;

// == Access Order ==
/// Keys ordered by recency of access.
///
/// Front = most recently used, back = least recently used. The queue holds
/// each key at most once.
#[derive(Debug, Default)]
pub struct AccessOrder {
    queue: VecDeque<String>,
}

impl AccessOrder {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as just used, moving it to the front (inserting it if it
    /// was not tracked yet).
    pub fn touch(&mut self, key: &str) {
        self.forget(key);
        self.queue.push_front(key.to_string());
    }

    // == Forget ==
    /// Stops tracking a key. No-op if the key is not tracked.
    pub fn forget(&mut self, key: &str) {
        self.queue.retain(|k| k != key);
    }

    // == Pop LRU ==
    /// Removes and returns the least recently used key, if any.
    pub fn pop_lru(&mut self) -> Option<String> {
        self.queue.pop_back()
    }

    /// Iterates over tracked keys, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.queue.iter()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops all tracked keys.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
