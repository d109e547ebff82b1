//! Cancelable keyed timers for the single-threaded event loop.
//!
//! # Responsibility
//! - Hold deferred work keyed by an identity (card id, save slot).
//! - Release due keys when the host advances the monotonic clock.
//!
//! # Invariants
//! - At most one pending deadline per key; re-arming replaces it.
//! - Due keys are returned in deadline order, ties in arming order.
//! - Nothing fires on its own; the host calls `take_due` from its loop.

use std::collections::HashMap;
use std::hash::Hash;

/// Milliseconds on a host-provided monotonic clock.
pub type Millis = u64;

#[derive(Debug)]
struct Entry {
    due_at: Millis,
    seq: u64,
}

#[derive(Debug)]
pub struct TimerQueue<K> {
    entries: HashMap<K, Entry>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Arms (or re-arms) `key` to fire at `due_at`.
    pub fn arm(&mut self, key: K, due_at: Millis) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(key, Entry { due_at, seq });
    }

    /// Cancels `key`; returns whether something was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn deadline(&self, key: &K) -> Option<Millis> {
        self.entries.get(key).map(|entry| entry.due_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Earliest pending deadline, for hosts that sleep until the next timer.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.entries.values().map(|entry| entry.due_at).min()
    }

    /// Removes and returns every key due at or before `now`.
    pub fn take_due(&mut self, now: Millis) -> Vec<K> {
        let mut due: Vec<(Millis, u64, K)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.due_at <= now)
            .map(|(key, entry)| (entry.due_at, entry.seq, key.clone()))
            .collect();
        due.sort_by_key(|(due_at, seq, _)| (*due_at, *seq));
        for (_, _, key) in &due {
            self.entries.remove(key);
        }
        due.into_iter().map(|(_, _, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;

    #[test]
    fn due_keys_fire_in_deadline_order() {
        let mut timers = TimerQueue::new();
        timers.arm("late", 300);
        timers.arm("early", 100);
        timers.arm("tie", 100);

        assert!(timers.take_due(99).is_empty());
        assert_eq!(timers.take_due(150), vec!["early", "tie"]);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.take_due(1_000), vec!["late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn rearming_replaces_deadline() {
        let mut timers = TimerQueue::new();
        timers.arm(1u32, 100);
        timers.arm(1u32, 400);
        assert_eq!(timers.deadline(&1), Some(400));
        assert!(timers.take_due(200).is_empty());
        assert_eq!(timers.take_due(400), vec![1]);
    }

    #[test]
    fn cancelled_key_never_fires() {
        let mut timers = TimerQueue::new();
        timers.arm('a', 10);
        assert!(timers.cancel(&'a'));
        assert!(!timers.cancel(&'a'));
        assert!(timers.take_due(100).is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
