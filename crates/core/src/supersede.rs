#![forbid(unsafe_code)]

//! Latest-request-wins bookkeeping for polled sources.
//!
//! Every request gets a ticket before it is sent. A response is applied only
//! when its ticket is newer than the last one applied for the same key, so a
//! slow response can never overwrite a fresher one.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket<K> {
    key: K,
    seq: u64,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

struct Slot<V> {
    applied_seq: u64,
    value: Option<V>,
}

struct Inner<K, V> {
    next_seq: u64,
    slots: HashMap<K, Slot<V>>,
}

pub struct LatestWins<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> Default for LatestWins<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LatestWins<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_seq: 1,
                slots: HashMap::new(),
            }),
        }
    }

    // A panicking poller must not take the other sources down with it.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn issue(&self, key: K) -> Ticket<K> {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        Ticket { key, seq }
    }

    /// Returns `false` (and drops `value`) when a newer ticket already won.
    pub fn resolve(&self, ticket: &Ticket<K>, value: V) -> bool {
        self.resolve_with(ticket, |_| value)
    }

    /// Like [`resolve`](Self::resolve), but the applied value is built from
    /// the one it replaces while the slot is still locked. `merge` only runs
    /// when the ticket wins.
    pub fn resolve_with(&self, ticket: &Ticket<K>, merge: impl FnOnce(Option<V>) -> V) -> bool {
        let mut inner = self.lock();
        let slot = inner.slots.entry(ticket.key.clone()).or_insert(Slot {
            applied_seq: 0,
            value: None,
        });
        if ticket.seq <= slot.applied_seq {
            return false;
        }
        slot.applied_seq = ticket.seq;
        let previous = slot.value.take();
        slot.value = Some(merge(previous));
        true
    }
}

impl<K, V> LatestWins<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn latest(&self, key: &K) -> Option<V> {
        self.lock().slots.get(key).and_then(|slot| slot.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn late_response_from_older_request_is_discarded() {
        let latest = LatestWins::new();
        let first = latest.issue("activity");
        let second = latest.issue("activity");

        assert!(latest.resolve(&second, 2));
        assert!(!latest.resolve(&first, 1));
        assert_eq!(latest.latest(&"activity"), Some(2));
    }

    #[test]
    fn in_order_responses_all_apply() {
        let latest = LatestWins::new();
        for n in 0..5 {
            let ticket = latest.issue("health");
            assert!(latest.resolve(&ticket, n));
        }
        assert_eq!(latest.latest(&"health"), Some(4));
    }

    #[test]
    fn keys_are_independent() {
        let latest = LatestWins::new();
        let eco = latest.issue("ecosystem");
        let act = latest.issue("activity");
        assert!(latest.resolve(&act, "a"));
        assert!(latest.resolve(&eco, "e"));
        assert_eq!(latest.latest(&"ecosystem"), Some("e"));
        assert_eq!(latest.latest(&"missing"), None);
    }

    #[test]
    fn merge_sees_previous_value_and_skips_losers() {
        let latest = LatestWins::new();
        let first = latest.issue("activity");
        let second = latest.issue("activity");
        let third = latest.issue("activity");

        assert!(latest.resolve_with(&first, |prev: Option<Vec<u64>>| {
            assert_eq!(prev, None);
            vec![1]
        }));
        assert!(latest.resolve_with(&third, |prev| {
            let mut seen = prev.unwrap_or_default();
            seen.push(3);
            seen
        }));
        assert!(!latest.resolve_with(&second, |_| unreachable!("stale ticket must not merge")));
        assert_eq!(latest.latest(&"activity"), Some(vec![1, 3]));
    }

    #[test]
    fn concurrent_resolvers_keep_the_newest() {
        let latest = Arc::new(LatestWins::new());
        let tickets: Vec<_> = (0..16).map(|_| latest.issue("ecosystem")).collect();
        let newest = tickets.last().map(Ticket::seq);
        let handles: Vec<_> = tickets
            .into_iter()
            .rev()
            .map(|ticket| {
                let latest = Arc::clone(&latest);
                thread::spawn(move || {
                    latest.resolve(&ticket, ticket.seq());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(latest.latest(&"ecosystem"), newest);
    }
}
