//! Pending-match index.
//!
//! Holds the will-be-sent request ids and intercepted payloads that have not found their
//! sibling event yet. Both sides are bucketed by [`CorrelationKey`] and kept in arrival
//! order, so identical requests in flight at the same time are paired oldest-first.
//!
//! Unmatched entries are kept indefinitely (a `data:` URL is never intercepted, for
//! instance). Evicting them is up to whoever owns the index.

use crate::net::correlation::CorrelationKey;
use crate::transport::protocol::RequestIntercepted;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Multi-valued map that keeps the values of every key in insertion order.
#[derive(Debug)]
pub struct Multimap<K, V> {
    map: HashMap<K, VecDeque<V>>,
}

impl<K, V> Default for Multimap<K, V> {
    fn default() -> Self {
        Self { map: HashMap::new() }
    }
}

impl<K: Eq + Hash, V> Multimap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the values of `key`.
    pub fn push(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().push_back(value);
    }

    /// Oldest value stored under `key`.
    pub fn first(&self, key: &K) -> Option<&V> {
        self.map.get(key).and_then(|values| values.front())
    }

    /// Removes and returns the oldest value stored under `key`. Empty buckets are dropped.
    pub fn pop_first(&mut self, key: &K) -> Option<V>
    where
        K: Clone,
    {
        match self.map.entry(key.clone()) {
            Entry::Occupied(mut bucket) => {
                let value = bucket.get_mut().pop_front();
                if bucket.get().is_empty() {
                    bucket.remove();
                }
                value
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Number of values under `key`.
    #[cfg(test)]
    pub fn count(&self, key: &K) -> usize {
        self.map.get(key).map(VecDeque::len).unwrap_or(0)
    }

    /// Number of values over all keys.
    pub fn len(&self) -> usize {
        self.map.values().map(VecDeque::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A will-be-sent request id paired with its interception.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMatch<T> {
    pub request_id: String,
    pub interception: T,
}

/// Unmatched entries of both event sources, keyed by correlation key.
#[derive(Debug)]
pub struct PendingMatchIndex<T = RequestIntercepted> {
    request_ids: Multimap<CorrelationKey, String>,
    interceptions: Multimap<CorrelationKey, T>,
}

impl<T> Default for PendingMatchIndex<T> {
    fn default() -> Self {
        Self {
            request_ids: Multimap::default(),
            interceptions: Multimap::default(),
        }
    }
}

impl<T> PendingMatchIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a will-be-sent request id waiting for its interception.
    pub fn record_request(&mut self, key: CorrelationKey, request_id: impl Into<String>) {
        let request_id = request_id.into();
        log::trace!("pending request {request_id} recorded");
        self.request_ids.push(key, request_id);
    }

    /// Records an intercepted payload waiting for its will-be-sent request id.
    pub fn record_interception(&mut self, key: CorrelationKey, interception: T) {
        log::trace!("pending interception recorded");
        self.interceptions.push(key, interception);
    }

    /// Pairs the oldest request id with the oldest interception under `key`, if both sides
    /// have one. Both entries leave the index together.
    pub fn try_resolve(&mut self, key: &CorrelationKey) -> Option<ResolvedMatch<T>> {
        if self.request_ids.first(key).is_none() || self.interceptions.first(key).is_none() {
            return None;
        }

        let request_id = self.request_ids.pop_first(key)?;
        let interception = self.interceptions.pop_first(key)?;

        Some(ResolvedMatch {
            request_id,
            interception,
        })
    }

    /// Number of unmatched `(request ids, interceptions)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.request_ids.len(), self.interceptions.len())
    }
}
