// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime orchestration.
//!
//! This module wires all bridge components together:
//!
//! - Configuration loading and validation
//! - Upstream client with reconnect supervision
//! - Tag resolution and initial monitoring
//! - Subscription registry and heartbeat publisher
//! - Query server with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use tagbridge_api::{ApiConfig, ApiServer, AppState, SubscriptionControl};
use tagbridge_config::{BridgeConfig, ConfigLoader, ServerEntry, TagConfigEntry};
use tagbridge_core::error::UpstreamResult;
use tagbridge_core::{TagKey, Value, ValueStore};
use tagbridge_opcua::{
    resolve_tags, ClientConfig, ResolveLimits, SecurityConfig, SecurityParams, SimulatedUpstream,
    TagEntry, UpstreamClient, UpstreamTransport,
};
use tagbridge_pubsub::{HeartbeatTask, MonitorControl, SubscriptionRegistry};

use crate::broker::BridgeBroker;
use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`BridgeRuntime`].
pub struct RuntimeBuilder {
    config_source: String,
    server_id: Option<String>,
}

impl RuntimeBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_source: "tagbridge.yaml".to_string(),
            server_id: None,
        }
    }

    /// Sets the configuration source (file path or URL).
    pub fn config_source(mut self, source: impl Into<String>) -> Self {
        self.config_source = source.into();
        self
    }

    /// Overrides the server entry to bridge.
    pub fn server_id(mut self, id: Option<String>) -> Self {
        self.server_id = id;
        self
    }

    /// Loads and validates configuration, producing a runtime.
    pub async fn build(self) -> BinResult<BridgeRuntime> {
        let mut config = ConfigLoader::load(&self.config_source).await?;
        if let Some(id) = self.server_id {
            config.upstream.server_id = Some(id);
        }
        config.validate()?;
        Ok(BridgeRuntime::new(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// BridgeRuntime
// =============================================================================

/// The main runtime that orchestrates all bridge components.
pub struct BridgeRuntime {
    config: BridgeConfig,
    shutdown: ShutdownCoordinator,
}

impl BridgeRuntime {
    /// Creates a runtime from validated configuration.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Runs the bridge until a termination signal arrives.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting tagbridge v{}", tagbridge_core::VERSION);

        let server = self.config.active_server()?.clone();
        let security = security_for(&server)?;
        info!(
            server = %server.id,
            endpoint = %server.server_url,
            policy = ?security.policy,
            mode = ?security.mode,
            "Upstream session parameters validated"
        );

        // Upstream client over the simulated transport, seeded from the
        // configured address space.
        let transport = Arc::new(seed_upstream(&server));
        let client_config = ClientConfig {
            endpoint_url: server.server_url.clone(),
            connect_timeout: Duration::from_millis(self.config.upstream.connect_timeout_ms),
            call_timeout: Duration::from_millis(self.config.upstream.call_timeout_ms),
            backoff: self.config.upstream.backoff.clone(),
        };
        let client = Arc::new(UpstreamClient::new(transport, client_config));

        let store = ValueStore::new();
        let client_task = tokio::spawn(
            client
                .clone()
                .run(store.clone(), self.shutdown.subscribe()),
        );

        // Tag resolution needs an established session.
        self.await_session(&client).await?;

        let namespaces = configured_namespaces(&server);
        client.ensure_namespaces(&namespaces).await.map_err(|e| {
            BinError::init(format!("namespace check failed: {}", e))
        })?;

        let entries = tag_entries(&server);
        let limits = ResolveLimits {
            max_depth: self.config.resolve.max_depth,
        };
        let outcome = resolve_tags(&entries, client.as_ref(), limits).await;
        for (entry, err) in &outcome.failures {
            warn!(entry = %entry, error = %err, "Tag entry failed to resolve");
        }
        info!(tags = outcome.tag_set.len(), "Tag resolution finished");

        for key in outcome.tag_set.keys() {
            client
                .monitor(key)
                .await
                .map_err(|e| BinError::init(format!("monitor {}: {}", key, e)))?;
        }

        // Broker, subscription registry and heartbeat publisher.
        let broker = Arc::new(BridgeBroker::from_settings(
            self.config.pubsub.broker_url.as_deref(),
            self.config.pubsub.broker_api_key.as_deref(),
        )
        .map_err(|e| BinError::init(e.to_string()))?);

        let registry = Arc::new(SubscriptionRegistry::new(
            self.config.pubsub.namespace.clone(),
            store.clone(),
            broker.clone(),
            Arc::new(ClientMonitors(client.clone())),
        ));

        let heartbeat = HeartbeatTask::new(
            broker.clone(),
            &self.config.pubsub.namespace,
            Duration::from_millis(self.config.pubsub.heartbeat_interval_ms),
            client.state_watch(),
            self.shutdown.subscribe(),
        );
        let heartbeat_task = tokio::spawn(heartbeat.run());

        // Query server.
        let state = AppState::builder()
            .store(store)
            .tag_set(Arc::new(outcome.tag_set))
            .upstream(client.state_watch())
            .degraded(client.degraded_flag())
            .subscriptions(registry.clone() as Arc<dyn SubscriptionControl>)
            .build()?;
        let api_config = ApiConfig {
            host: self.config.api.host.clone(),
            port: self.config.api.port,
            request_timeout_ms: self.config.api.request_timeout_ms,
        };
        let server = ApiServer::new(state, api_config);

        let signal_coordinator = self.shutdown.clone();
        tokio::spawn(async move { signal_coordinator.wait_for_signal().await });

        let result = server.run_with_shutdown(self.shutdown.signal_future()).await;

        // Tear down background tasks in reverse order.
        self.shutdown.trigger();
        registry.shutdown_all().await;
        let _ = heartbeat_task.await;
        let _ = client_task.await;

        info!("tagbridge shutdown complete");
        result.map_err(BinError::from)
    }

    /// Waits for the upstream session, bounded by the connect timeout.
    async fn await_session<T: UpstreamTransport>(
        &self,
        client: &UpstreamClient<T>,
    ) -> BinResult<()> {
        let deadline = Duration::from_millis(self.config.upstream.connect_timeout_ms);
        let mut state = client.state_watch();
        let wait = async {
            while !state.borrow_and_update().is_connected() {
                if state.changed().await.is_err() {
                    break;
                }
            }
        };
        tokio::time::timeout(deadline, wait)
            .await
            .map_err(|_| BinError::init("timed out waiting for the upstream session"))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Adapts the upstream client to the registry's monitoring seam.
struct ClientMonitors<T: UpstreamTransport>(Arc<UpstreamClient<T>>);

#[async_trait]
impl<T: UpstreamTransport> MonitorControl for ClientMonitors<T> {
    async fn monitor(&self, key: &TagKey) -> UpstreamResult<()> {
        self.0.monitor(key).await
    }

    async fn unmonitor(&self, key: &TagKey) -> UpstreamResult<()> {
        self.0.unmonitor(key).await
    }
}

/// Validates the server entry's security fields.
fn security_for(server: &ServerEntry) -> BinResult<SecurityConfig> {
    let config = SecurityConfig::from_params(SecurityParams {
        policy: &server.security_policy,
        mode: &server.security_mode,
        user: server.user.as_deref(),
        password: server.password.as_deref(),
        cert_file: server.cert_file.as_deref(),
        key_file: server.key_file.as_deref(),
    })?;
    Ok(config)
}

/// Distinct namespace URIs referenced by the server's tags.
fn configured_namespaces(server: &ServerEntry) -> Vec<String> {
    let mut uris: Vec<String> = server
        .tags
        .iter()
        .map(|t| t.namespace_uri().to_string())
        .collect();
    uris.sort();
    uris.dedup();
    uris
}

/// Builds resolver entries from the configured tags.
fn tag_entries(server: &ServerEntry) -> Vec<TagEntry> {
    server
        .tags
        .iter()
        .map(|entry| match entry {
            TagConfigEntry::Tag {
                name,
                namespace_uri,
                node_identifier,
            } => TagEntry::Tag {
                name: name.clone(),
                key: TagKey::new(namespace_uri.clone(), node_identifier.clone()),
            },
            TagConfigEntry::Container {
                namespace_uri,
                node_identifier,
            } => TagEntry::Container {
                key: TagKey::new(namespace_uri.clone(), node_identifier.clone()),
            },
        })
        .collect()
}

/// Seeds the simulated address space from the configured tags.
fn seed_upstream(server: &ServerEntry) -> SimulatedUpstream {
    let sim = SimulatedUpstream::new(
        server
            .tags
            .first()
            .map(|t| t.namespace_uri().to_string())
            .unwrap_or_else(|| "urn:tagbridge:sim".to_string()),
    );
    for entry in &server.tags {
        sim.add_namespace(entry.namespace_uri());
        match entry {
            TagConfigEntry::Tag {
                namespace_uri,
                node_identifier,
                ..
            } => {
                sim.define_tag(
                    TagKey::new(namespace_uri.clone(), node_identifier.clone()),
                    Value::Int(0),
                );
            }
            TagConfigEntry::Container {
                namespace_uri,
                node_identifier,
            } => {
                sim.define_container(
                    TagKey::new(namespace_uri.clone(), node_identifier.clone()),
                    Vec::new(),
                );
            }
        }
    }
    sim
}

// =============================================================================
// Tests
// =============================================================================
