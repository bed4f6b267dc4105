// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process simulated upstream.
//!
//! [`SimulatedUpstream`] implements [`UpstreamTransport`] against an
//! address space defined in code or configuration. It backs the
//! `simulated` upstream mode of the binary and the test suites; wiring a
//! real protocol stack happens behind the same trait.
//!
//! Monitoring a tag emits its current value immediately, the way a real
//! server delivers an initial data change. Subsequent changes are pushed
//! with [`set_value`](SimulatedUpstream::set_value) or
//! [`emit`](SimulatedUpstream::emit).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use tagbridge_core::error::{UpstreamError, UpstreamResult};
use tagbridge_core::types::{ConnectionState, Sample, TagKey, Value};

use crate::transport::{BrowsedNode, Notification, UpstreamTransport};

const NOTIFICATION_BUFFER: usize = 256;

/// Simulated upstream address space.
pub struct SimulatedUpstream {
    namespaces: Mutex<HashSet<String>>,
    values: Mutex<HashMap<TagKey, Value>>,
    children: Mutex<HashMap<TagKey, Vec<BrowsedNode>>>,
    monitored: Mutex<HashSet<TagKey>>,
    monitor_calls: AtomicUsize,
    refuse: AtomicBool,
    state_tx: watch::Sender<ConnectionState>,
    notification_tx: mpsc::Sender<Notification>,
    notification_rx: Mutex<Option<mpsc::Receiver<Notification>>>,
}

impl SimulatedUpstream {
    /// Creates an empty simulated upstream exporting one namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_BUFFER);
        Self {
            namespaces: Mutex::new(HashSet::from([namespace.into()])),
            values: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            monitored: Mutex::new(HashSet::new()),
            monitor_calls: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
            state_tx,
            notification_tx,
            notification_rx: Mutex::new(Some(notification_rx)),
        }
    }

    /// Exports an additional namespace.
    pub fn add_namespace(&self, uri: impl Into<String>) {
        self.namespaces.lock().insert(uri.into());
    }

    /// Defines a leaf tag with an initial value.
    pub fn define_tag(&self, key: TagKey, value: Value) {
        self.values.lock().insert(key, value);
    }

    /// Defines a container with the given children.
    pub fn define_container(&self, key: TagKey, children: Vec<BrowsedNode>) {
        self.children.lock().insert(key, children);
    }

    /// Updates a tag's value and notifies its monitor, if armed.
    pub fn set_value(&self, key: TagKey, value: Value) {
        self.values.lock().insert(key.clone(), value.clone());
        self.emit(key, Sample::good(value, Utc::now()));
    }

    /// Pushes a raw sample for a monitored tag.
    pub fn emit(&self, key: TagKey, sample: Sample) {
        if self.monitored.lock().contains(&key) {
            let _ = self.notification_tx.try_send(Notification::new(key, sample));
        }
    }

    /// Makes subsequent connect attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }

    /// Drops the established session, as a network fault would.
    ///
    /// Monitored-item registrations are lost with the session.
    pub fn trip_connection(&self) {
        self.monitored.lock().clear();
        let _ = self.state_tx.send(ConnectionState::Disconnected);
    }

    /// Total number of monitor registrations seen.
    pub fn monitor_call_count(&self) -> usize {
        self.monitor_calls.load(Ordering::Relaxed)
    }

    fn require_connected(&self) -> UpstreamResult<()> {
        if self.state().is_connected() {
            Ok(())
        } else {
            Err(UpstreamError::NotConnected)
        }
    }
}

#[async_trait]
impl UpstreamTransport for SimulatedUpstream {
    async fn connect(&self) -> UpstreamResult<()> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(UpstreamError::unavailable("connection refused"));
        }
        let _ = self.state_tx.send(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> UpstreamResult<()> {
        self.monitored.lock().clear();
        let _ = self.state_tx.send(ConnectionState::Disconnected);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    async fn wait_for_disruption(&self) {
        let mut rx = self.state_tx.subscribe();
        while rx.borrow_and_update().is_connected() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn namespace_known(&self, uri: &str) -> UpstreamResult<bool> {
        self.require_connected()?;
        Ok(self.namespaces.lock().contains(uri))
    }

    async fn browse_children(&self, key: &TagKey) -> UpstreamResult<Vec<BrowsedNode>> {
        self.require_connected()?;
        self.children
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| UpstreamError::call("browse", format!("unknown node {}", key)))
    }

    async fn monitor(&self, key: &TagKey) -> UpstreamResult<()> {
        self.require_connected()?;
        if !self.values.lock().contains_key(key) {
            return Err(UpstreamError::monitor(key.to_string(), "unknown node"));
        }
        self.monitor_calls.fetch_add(1, Ordering::Relaxed);
        self.monitored.lock().insert(key.clone());

        // Initial data change for the freshly armed monitor.
        if let Some(value) = self.values.lock().get(key).cloned() {
            let _ = self
                .notification_tx
                .try_send(Notification::new(key.clone(), Sample::good(value, Utc::now())));
        }
        Ok(())
    }

    async fn unmonitor(&self, key: &TagKey) -> UpstreamResult<()> {
        self.require_connected()?;
        self.monitored.lock().remove(key);
        Ok(())
    }

    fn take_notifications(&self) -> UpstreamResult<mpsc::Receiver<Notification>> {
        self.notification_rx
            .lock()
            .take()
            .ok_or(UpstreamError::StreamTaken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> TagKey {
        TagKey::new("urn:sim", id)
    }

    #[tokio::test]
    async fn operations_require_a_session() {
        let sim = SimulatedUpstream::new("urn:sim");
        sim.define_tag(key("a"), Value::Int(1));

        assert!(matches!(
            sim.monitor(&key("a")).await,
            Err(UpstreamError::NotConnected)
        ));
        sim.connect().await.unwrap();
        sim.monitor(&key("a")).await.unwrap();
    }

    #[tokio::test]
    async fn monitor_emits_initial_value() {
        let sim = SimulatedUpstream::new("urn:sim");
        sim.define_tag(key("a"), Value::Int(5));
        sim.connect().await.unwrap();

        let mut rx = sim.take_notifications().unwrap();
        sim.monitor(&key("a")).await.unwrap();

        let n = rx.recv().await.unwrap();
        assert_eq!(n.key, key("a"));
        assert_eq!(n.sample.value, Value::Int(5));
    }

    #[tokio::test]
    async fn notification_stream_can_be_taken_once() {
        let sim = SimulatedUpstream::new("urn:sim");
        assert!(sim.take_notifications().is_ok());
        assert!(matches!(
            sim.take_notifications(),
            Err(UpstreamError::StreamTaken)
        ));
    }

    #[tokio::test]
    async fn trip_connection_loses_registrations() {
        let sim = SimulatedUpstream::new("urn:sim");
        sim.define_tag(key("a"), Value::Int(1));
        sim.connect().await.unwrap();
        sim.monitor(&key("a")).await.unwrap();

        sim.trip_connection();
        sim.connect().await.unwrap();

        let mut rx = sim.take_notifications().unwrap();
        // No monitors armed anymore, set_value goes nowhere.
        sim.set_value(key("a"), Value::Int(2));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn browse_of_unknown_node_fails() {
        let sim = SimulatedUpstream::new("urn:sim");
        sim.connect().await.unwrap();
        assert!(sim.browse_children(&key("nope")).await.is_err());
    }
}
