// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Last-value store for monitored tags.
//!
//! The store keeps exactly one sample per tag. Writes come from the
//! upstream notification pump and are last-write-wins by arrival order;
//! readers take point-in-time snapshots and never block writers of other
//! tags.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::{Sample, TagKey};

// =============================================================================
// Snapshot
// =============================================================================

/// A point-in-time view over the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Wall-clock time the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// Captured samples.
    pub entries: Vec<(TagKey, Sample)>,
}

impl Snapshot {
    /// Returns the sample for `key`, if it was captured.
    pub fn get(&self, key: &TagKey) -> Option<&Sample> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Returns `true` if no samples were captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// ValueStore
// =============================================================================

/// Concurrent last-value store keyed by [`TagKey`].
///
/// Cheap to clone; all clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    inner: Arc<DashMap<TagKey, Sample>>,
}

impl ValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a sample, replacing any previous value for the tag.
    pub fn update(&self, key: TagKey, sample: Sample) {
        self.inner.insert(key, sample);
    }

    /// Returns the current sample for `key`, if any.
    pub fn get(&self, key: &TagKey) -> Option<Sample> {
        self.inner.get(key).map(|e| e.value().clone())
    }

    /// Removes the sample for `key`.
    ///
    /// Called when the last subscription referencing the tag goes away.
    pub fn remove(&self, key: &TagKey) {
        self.inner.remove(key);
    }

    /// Takes a snapshot of the store.
    ///
    /// With a filter, only the listed keys are captured and the filter's
    /// order is preserved; keys with no sample yet are simply absent from
    /// the result. Without a filter every stored sample is captured.
    pub fn snapshot(&self, filter: Option<&[TagKey]>) -> Snapshot {
        let taken_at = Utc::now();
        let entries = match filter {
            Some(keys) => keys
                .iter()
                .filter_map(|k| self.get(k).map(|s| (k.clone(), s)))
                .collect(),
            None => self
                .inner
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        };
        Snapshot { taken_at, entries }
    }

    /// Number of tags currently holding a sample.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the store holds no samples.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Quality, Value};

    fn key(id: &str) -> TagKey {
        TagKey::new("urn:test", id)
    }

    fn sample(v: i64) -> Sample {
        Sample::good(Value::Int(v), Utc::now())
    }

    #[test]
    fn update_is_last_write_wins() {
        let store = ValueStore::new();
        store.update(key("a"), sample(1));
        store.update(key("a"), sample(2));

        let s = store.get(&key("a")).unwrap();
        assert_eq!(s.value, Value::Int(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_preserves_filter_order_and_omits_missing() {
        let store = ValueStore::new();
        store.update(key("b"), sample(2));
        store.update(key("a"), sample(1));

        let filter = vec![key("a"), key("missing"), key("b")];
        let snap = store.snapshot(Some(&filter));

        assert_eq!(snap.entries.len(), 2);
        assert_eq!(snap.entries[0].0, key("a"));
        assert_eq!(snap.entries[1].0, key("b"));
        assert!(snap.get(&key("missing")).is_none());
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let store = ValueStore::new();
        store.update(key("a"), sample(1));

        let snap = store.snapshot(None);
        store.update(key("a"), sample(99));

        assert_eq!(snap.get(&key("a")).unwrap().value, Value::Int(1));
        assert_eq!(store.get(&key("a")).unwrap().value, Value::Int(99));
    }

    #[test]
    fn remove_drops_the_sample() {
        let store = ValueStore::new();
        store.update(key("a"), sample(1));
        store.remove(&key("a"));
        assert!(store.get(&key("a")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn bad_quality_samples_are_stored_too() {
        let store = ValueStore::new();
        store.update(key("a"), Sample::bad(Value::Int(0), Utc::now()));
        assert_eq!(store.get(&key("a")).unwrap().quality, Quality::Bad);
    }
}
