//! # Emitted set
//! Signal keys that have already been notified.
//!
//! Owned by the poll loop and lent to the filter read-only. Each key carries
//! the publication time of its news item so the set can be trimmed to the
//! trailing window: an item older than the cutoff is rejected before its key
//! is ever looked at, so evicting such keys cannot cause a repeat.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::signal::SignalKey;

#[derive(Debug, Default)]
pub struct EmittedSet {
    keys: HashMap<SignalKey, DateTime<Utc>>,
}

impl EmittedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &SignalKey) -> bool {
        self.keys.contains_key(key)
    }

    /// Mark `key` as emitted. Returns `false` if it already was.
    pub fn insert(&mut self, key: SignalKey, published_at: DateTime<Utc>) -> bool {
        self.keys.insert(key, published_at).is_none()
    }

    /// Drop keys whose item was published before `cutoff`. Returns how many.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.keys.len();
        self.keys.retain(|_, published| *published >= cutoff);
        before - self.keys.len()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
