//! One-deadline-per-key timer queue driven by the scheduler's event loop.

use tokio::time::Instant;

/// Pending deadlines keyed by kind.
///
/// Each key holds at most one deadline: arming a key replaces whatever was
/// armed before. The owning loop sleeps until [`DeadlineQueue::next_deadline`]
/// and then drains [`DeadlineQueue::pop_due`].
#[derive(Debug)]
pub struct DeadlineQueue<K> {
    entries: Vec<(K, Instant)>,
}

impl<K> Default for DeadlineQueue<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + Eq> DeadlineQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` at `at`, returning the deadline it replaced
    pub fn arm(&mut self, key: K, at: Instant) -> Option<Instant> {
        let previous = self.cancel(key);
        self.entries.push((key, at));
        previous
    }

    /// Cancel `key`, returning its deadline if it was armed
    pub fn cancel(&mut self, key: K) -> Option<Instant> {
        let idx = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.swap_remove(idx).1)
    }

    /// Deadline currently armed for `key`
    pub fn get(&self, key: K) -> Option<Instant> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, at)| *at)
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Earliest armed deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(_, at)| *at).min()
    }

    /// Remove and return every key due at `now`, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<(K, Instant)> {
        let mut due: Vec<(K, Instant)> = Vec::new();
        self.entries.retain(|&(key, at)| {
            if at <= now {
                due.push((key, at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(_, at)| *at);
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
