// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Upstream client with reconnect supervision.
//!
//! [`UpstreamClient`] wraps an [`UpstreamTransport`] and adds the behavior
//! the rest of the bridge relies on:
//!
//! - idempotent monitor/unmonitor bookkeeping,
//! - a reconnect loop with bounded exponential backoff that re-registers
//!   every monitored tag after the session comes back,
//! - a notification pump that applies data changes to the value store,
//! - a `watch`-shared connection state for health and heartbeat reporting.
//!
//! An upstream outage degrades the bridge; it never crashes it.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use tagbridge_core::error::{ResolveError, ResolveResult, UpstreamError, UpstreamResult};
use tagbridge_core::retry::{BackoffConfig, BackoffPolicy};
use tagbridge_core::store::ValueStore;
use tagbridge_core::types::{ConnectionState, TagKey};

use crate::resolver::ChildBrowser;
use crate::transport::{BrowsedNode, UpstreamTransport};

// =============================================================================
// ClientConfig
// =============================================================================

/// Upstream client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upstream endpoint URL.
    pub endpoint_url: String,

    /// Deadline for session establishment.
    pub connect_timeout: Duration,

    /// Deadline for individual calls (browse, monitor).
    pub call_timeout: Duration,

    /// Reconnect backoff parameters.
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "opc.tcp://localhost:4840".to_string(),
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(5),
            backoff: BackoffConfig::default(),
        }
    }
}

// =============================================================================
// UpstreamClient
// =============================================================================

/// High-level upstream session manager.
pub struct UpstreamClient<T: UpstreamTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    monitored: Mutex<HashSet<TagKey>>,
    state_tx: watch::Sender<ConnectionState>,
    degraded: Arc<AtomicBool>,
}

impl<T: UpstreamTransport> UpstreamClient<T> {
    /// Creates a client over the given transport.
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            config,
            monitored: Mutex::new(HashSet::new()),
            state_tx,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a watch over the connection state.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Returns the shared degraded flag.
    ///
    /// Set once the reconnect backoff saturates at its ceiling; cleared on
    /// the next successful connect.
    pub fn degraded_flag(&self) -> Arc<AtomicBool> {
        self.degraded.clone()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Registers a monitored item for the tag.
    ///
    /// Idempotent: monitoring an already-monitored tag is a no-op. While
    /// the session is down the tag is only recorded; the reconnect loop
    /// registers it once the session is back.
    pub async fn monitor(&self, key: &TagKey) -> UpstreamResult<()> {
        let mut monitored = self.monitored.lock().await;
        if monitored.contains(key) {
            return Ok(());
        }

        if self.transport.state().is_connected() {
            self.with_timeout("monitor", self.transport.monitor(key))
                .await?;
        } else {
            debug!(tag = %key, "Session down, deferring monitor registration");
        }
        monitored.insert(key.clone());
        Ok(())
    }

    /// Removes the monitored item for the tag.
    ///
    /// Idempotent: unmonitoring an unknown tag is a no-op.
    pub async fn unmonitor(&self, key: &TagKey) -> UpstreamResult<()> {
        let mut monitored = self.monitored.lock().await;
        if !monitored.remove(key) {
            return Ok(());
        }

        if self.transport.state().is_connected() {
            if let Err(e) = self
                .with_timeout("unmonitor", self.transport.unmonitor(key))
                .await
            {
                warn!(tag = %key, error = %e, "Failed to remove monitored item");
            }
        }
        Ok(())
    }

    /// Number of currently monitored tags.
    pub async fn monitored_count(&self) -> usize {
        self.monitored.lock().await.len()
    }

    /// Verifies that every given namespace URI exists upstream.
    pub async fn ensure_namespaces(&self, uris: &[String]) -> ResolveResult<()> {
        for uri in uris {
            let known = self
                .with_timeout("namespace lookup", self.transport.namespace_known(uri))
                .await
                .map_err(|e| ResolveError::browse(uri.clone(), e.to_string()))?;
            if !known {
                return Err(ResolveError::namespace_not_found(uri.clone()));
            }
        }
        Ok(())
    }

    /// Runs the supervision loop until `shutdown` flips to `true`.
    ///
    /// Owns the full session lifecycle: initial connect, the notification
    /// pump into `store`, reconnects with backoff and monitored-item
    /// re-registration, and the final disconnect.
    pub async fn run(
        self: Arc<Self>,
        store: ValueStore,
        mut shutdown: watch::Receiver<bool>,
    ) -> UpstreamResult<()> {
        let mut notifications = self.transport.take_notifications()?;
        let pump_store = store.clone();
        let pump = tokio::spawn(async move {
            while let Some(n) = notifications.recv().await {
                pump_store.update(n.key, n.sample);
            }
            debug!("Notification stream closed");
        });

        let mut backoff = BackoffPolicy::new(self.config.backoff.clone());

        'supervise: loop {
            // Connect, retrying until success or shutdown.
            loop {
                if *shutdown.borrow() {
                    break 'supervise;
                }
                let target = if backoff.attempts() == 0 {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Reconnecting
                };
                let _ = self.state_tx.send(target);

                match self
                    .with_deadline(
                        "connect",
                        self.config.connect_timeout,
                        self.transport.connect(),
                    )
                    .await
                {
                    Ok(()) => break,
                    Err(e) => {
                        let delay = backoff.next_delay();
                        if backoff.at_ceiling() {
                            self.degraded.store(true, Ordering::Relaxed);
                        }
                        warn!(
                            endpoint = %self.config.endpoint_url,
                            error = %e,
                            retry_in_ms = delay.as_millis() as u64,
                            "Upstream connect failed"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                }
            }

            backoff.reset();
            self.degraded.store(false, Ordering::Relaxed);
            self.reregister_monitored().await;
            let _ = self.state_tx.send(ConnectionState::Connected);
            info!(endpoint = %self.config.endpoint_url, "Upstream session established");

            tokio::select! {
                _ = self.transport.wait_for_disruption() => {
                    warn!(endpoint = %self.config.endpoint_url, "Upstream session lost");
                    let _ = self.state_tx.send(ConnectionState::Reconnecting);
                }
                _ = shutdown.changed() => break 'supervise,
            }
        }

        let _ = self.state_tx.send(ConnectionState::Disconnected);
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "Error during upstream disconnect");
        }
        pump.abort();
        info!("Upstream client stopped");
        Ok(())
    }

    /// Re-registers every monitored tag after a reconnect.
    ///
    /// Registrations do not survive session loss, and a tag that fails to
    /// re-register is logged but kept in the set for the next attempt.
    async fn reregister_monitored(&self) {
        let monitored = self.monitored.lock().await;
        if monitored.is_empty() {
            return;
        }
        info!(count = monitored.len(), "Re-registering monitored tags");
        for key in monitored.iter() {
            if let Err(e) = self.with_timeout("monitor", self.transport.monitor(key)).await {
                warn!(tag = %key, error = %e, "Failed to re-register monitored tag");
            }
        }
    }

    async fn with_timeout<F, R>(&self, operation: &str, fut: F) -> UpstreamResult<R>
    where
        F: Future<Output = UpstreamResult<R>>,
    {
        self.with_deadline(operation, self.config.call_timeout, fut)
            .await
    }

    async fn with_deadline<F, R>(
        &self,
        operation: &str,
        deadline: Duration,
        fut: F,
    ) -> UpstreamResult<R>
    where
        F: Future<Output = UpstreamResult<R>>,
    {
        match timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::timeout(operation, deadline)),
        }
    }
}

#[async_trait]
impl<T: UpstreamTransport> ChildBrowser for UpstreamClient<T> {
    async fn browse_children(&self, key: &TagKey) -> ResolveResult<Vec<BrowsedNode>> {
        self.with_timeout("browse", self.transport.browse_children(key))
            .await
            .map_err(|e| ResolveError::browse(key.to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedUpstream;
    use chrono::Utc;
    use tagbridge_core::types::{Sample, Value};

    fn key(id: &str) -> TagKey {
        TagKey::new("urn:sim", id)
    }

    fn client_config() -> ClientConfig {
        ClientConfig {
            endpoint_url: "opc.tcp://sim".into(),
            connect_timeout: Duration::from_millis(500),
            call_timeout: Duration::from_millis(500),
            backoff: BackoffConfig {
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(40),
                multiplier: 2.0,
                jitter: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn monitor_is_idempotent() {
        let sim = Arc::new(SimulatedUpstream::new("urn:sim"));
        sim.define_tag(key("a"), Value::Int(1));
        sim.connect().await.unwrap();

        let client = UpstreamClient::new(sim.clone(), client_config());
        client.monitor(&key("a")).await.unwrap();
        client.monitor(&key("a")).await.unwrap();

        assert_eq!(client.monitored_count().await, 1);
        assert_eq!(sim.monitor_call_count(), 1);
    }

    #[tokio::test]
    async fn unmonitor_of_unknown_tag_is_a_noop() {
        let sim = Arc::new(SimulatedUpstream::new("urn:sim"));
        sim.connect().await.unwrap();

        let client = UpstreamClient::new(sim.clone(), client_config());
        client.unmonitor(&key("ghost")).await.unwrap();
        assert_eq!(client.monitored_count().await, 0);
    }

    #[tokio::test]
    async fn notifications_flow_into_the_store() {
        let sim = Arc::new(SimulatedUpstream::new("urn:sim"));
        sim.define_tag(key("a"), Value::Int(1));

        let client = Arc::new(UpstreamClient::new(sim.clone(), client_config()));
        let store = ValueStore::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(client.clone().run(store.clone(), shutdown_rx));

        let mut state = client.state_watch();
        while !state.borrow_and_update().is_connected() {
            state.changed().await.unwrap();
        }

        client.monitor(&key("a")).await.unwrap();
        sim.emit(key("a"), Sample::good(Value::Int(7), Utc::now()));

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Some(s) = store.get(&key("a")) {
                    if s.value == Value::Int(7) {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn reconnect_reregisters_monitored_tags() {
        let sim = Arc::new(SimulatedUpstream::new("urn:sim"));
        sim.define_tag(key("a"), Value::Int(1));

        let client = Arc::new(UpstreamClient::new(sim.clone(), client_config()));
        let store = ValueStore::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(client.clone().run(store.clone(), shutdown_rx));

        let mut state = client.state_watch();
        while !state.borrow_and_update().is_connected() {
            state.changed().await.unwrap();
        }
        client.monitor(&key("a")).await.unwrap();
        let calls_before = sim.monitor_call_count();

        sim.trip_connection();
        // Wait for the loop to notice, reconnect and re-register.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if sim.monitor_call_count() > calls_before && sim.state().is_connected() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn degraded_flag_set_once_backoff_saturates() {
        let sim = Arc::new(SimulatedUpstream::new("urn:sim"));
        sim.refuse_connections(true);

        let client = Arc::new(UpstreamClient::new(sim.clone(), client_config()));
        let degraded = client.degraded_flag();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(client.clone().run(ValueStore::new(), shutdown_rx));

        tokio::time::timeout(Duration::from_secs(2), async {
            while !degraded.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // Recovery clears the flag.
        sim.refuse_connections(false);
        tokio::time::timeout(Duration::from_secs(2), async {
            while degraded.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn ensure_namespaces_flags_unknown_uri() {
        let sim = Arc::new(SimulatedUpstream::new("urn:sim"));
        sim.connect().await.unwrap();
        let client = UpstreamClient::new(sim, client_config());

        client
            .ensure_namespaces(&["urn:sim".to_string()])
            .await
            .unwrap();
        let err = client
            .ensure_namespaces(&["urn:other".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NamespaceNotFound { .. }));
    }
}
