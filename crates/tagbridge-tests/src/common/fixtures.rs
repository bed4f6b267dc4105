// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! A wired-up bridge harness for integration tests.
//!
//! [`BridgeHarness`] assembles the same component graph the binary builds:
//! a simulated upstream behind the supervised client, the value store, the
//! subscription registry over a recording broker, and a query server router
//! on top. Backoff delays are shortened so reconnect paths run in test time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tagbridge_api::{ApiConfig, ApiServer, AppState, SubscriptionControl};
use tagbridge_core::error::UpstreamResult;
use tagbridge_core::retry::BackoffConfig;
use tagbridge_core::{ResolvedTag, TagKey, TagSet, Value, ValueStore};
use tagbridge_opcua::{ClientConfig, SimulatedUpstream, UpstreamClient};
use tagbridge_pubsub::registry::TagSetRequest;
use tagbridge_pubsub::SubscriptionRegistry;

use super::mocks::{ClientMonitors, RecordingBroker};

/// Namespace URI exported by the harness upstream.
pub const SIM_NAMESPACE: &str = "urn:test:sim";

/// Channel namespace owned by the harness bridge.
pub const BRIDGE_NAMESPACE: &str = "bridge";

// =============================================================================
// BridgeHarness
// =============================================================================

/// A fully wired bridge over a simulated upstream.
pub struct BridgeHarness {
    /// The simulated upstream address space.
    pub sim: Arc<SimulatedUpstream>,

    /// The supervised upstream client.
    pub client: Arc<UpstreamClient<SimulatedUpstream>>,

    /// The shared value store.
    pub store: ValueStore,

    /// The recording broker behind the registry.
    pub broker: Arc<RecordingBroker>,

    /// The subscription registry.
    pub registry: Arc<SubscriptionRegistry<RecordingBroker, ClientMonitors>>,

    shutdown_tx: watch::Sender<bool>,
    client_task: JoinHandle<UpstreamResult<()>>,
}

impl BridgeHarness {
    /// Starts a harness and waits for the upstream session.
    pub async fn start() -> Self {
        let harness = Self::start_disconnected().await;
        harness.await_session().await;
        harness
    }

    /// Starts a harness without waiting for the session to come up.
    pub async fn start_disconnected() -> Self {
        let sim = Arc::new(SimulatedUpstream::new(SIM_NAMESPACE));
        let client = Arc::new(UpstreamClient::new(sim.clone(), test_client_config()));
        let store = ValueStore::new();
        let broker = Arc::new(RecordingBroker::new());
        let registry = Arc::new(SubscriptionRegistry::new(
            BRIDGE_NAMESPACE,
            store.clone(),
            broker.clone(),
            Arc::new(ClientMonitors(client.clone())),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let client_task = tokio::spawn(client.clone().run(store.clone(), shutdown_rx));

        Self {
            sim,
            client,
            store,
            broker,
            registry,
            shutdown_tx,
            client_task,
        }
    }

    /// Waits until the upstream session is established.
    pub async fn await_session(&self) {
        let mut state = self.client.state_watch();
        let wait = async {
            while !state.borrow_and_update().is_connected() {
                if state.changed().await.is_err() {
                    return;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("upstream session did not come up");
    }

    /// A shutdown receiver for extra tasks sharing the harness lifecycle.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Builds the query server router over the harness components.
    pub fn router(&self, tag_set: TagSet) -> axum::Router {
        let state = AppState::builder()
            .store(self.store.clone())
            .tag_set(Arc::new(tag_set))
            .upstream(self.client.state_watch())
            .degraded(self.client.degraded_flag())
            .subscriptions(self.registry.clone() as Arc<dyn SubscriptionControl>)
            .build()
            .expect("harness state is complete");
        ApiServer::new(state, ApiConfig::default()).router()
    }

    /// Stops all background tasks.
    pub async fn stop(self) {
        self.registry.shutdown_all().await;
        let _ = self.shutdown_tx.send(true);
        let _ = self.client_task.await;
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Client configuration with test-sized backoff delays.
pub fn test_client_config() -> ClientConfig {
    ClientConfig {
        endpoint_url: "opc.tcp://sim.test:4840".to_string(),
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

/// A tag key in the harness namespace.
pub fn sim_key(id: &str) -> TagKey {
    TagKey::new(SIM_NAMESPACE, id)
}

/// Defines a tag on the simulated upstream and returns its key.
pub fn define_tag(sim: &SimulatedUpstream, id: &str, value: Value) -> TagKey {
    let key = sim_key(id);
    sim.define_tag(key.clone(), value);
    key
}

/// A subscribe request naming tags in the harness namespace.
pub fn tag_request(ids: &[&str]) -> TagSetRequest {
    TagSetRequest {
        namespace_uri: SIM_NAMESPACE.to_string(),
        nodes: ids.iter().map(|id| (*id).into()).collect(),
    }
}

/// A tag set with one named entry per id, in order.
pub fn named_tag_set(names_and_ids: &[(&str, &str)]) -> TagSet {
    names_and_ids
        .iter()
        .map(|(name, id)| ResolvedTag::named(*name, sim_key(id)))
        .collect()
}

/// A data channel spec in the bridge namespace.
pub fn channel(name: &str, interval_ms: u64) -> String {
    format!("{}:{}@{}", BRIDGE_NAMESPACE, name, interval_ms)
}
