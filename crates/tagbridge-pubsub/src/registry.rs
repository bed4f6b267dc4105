// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription registry.
//!
//! Subscriptions are keyed by their sorted tag keys plus interval, so two
//! channels asking for the same tags at the same cadence share one
//! publisher task and one set of upstream monitors. Reference counts track
//! repeat subscribes per channel and tag usage across subscriptions; the
//! first reference arms the task and monitors, the last one tears them
//! down.
//!
//! All bookkeeping happens under one async mutex, which makes a subscribe
//! racing an unsubscribe safe by construction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tagbridge_core::channel::ChannelSpec;
use tagbridge_core::error::{BridgeResult, RegistryError, UpstreamResult};
use tagbridge_core::store::ValueStore;
use tagbridge_core::types::{NodeIdentifier, ResolvedTag, TagKey, TagSet};

use crate::publisher::{ChannelBindings, PublisherTask};
use crate::transport::PubSubTransport;

// =============================================================================
// MonitorControl
// =============================================================================

/// The monitoring capability the registry needs from the upstream side.
#[async_trait]
pub trait MonitorControl: Send + Sync + 'static {
    /// Registers a monitored item for the tag.
    async fn monitor(&self, key: &TagKey) -> UpstreamResult<()>;

    /// Removes the monitored item for the tag.
    async fn unmonitor(&self, key: &TagKey) -> UpstreamResult<()>;
}

// =============================================================================
// Requests and acks
// =============================================================================

/// Tag list carried by a subscribe request.
#[derive(Debug, Clone, Deserialize)]
pub struct TagSetRequest {
    /// Namespace URI the nodes live in.
    #[serde(rename = "namespaceURI")]
    pub namespace_uri: String,

    /// Node identifiers to sample.
    pub nodes: Vec<NodeIdentifier>,
}

/// Outcome of a subscribe or unsubscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The request was applied.
    Applied,

    /// The channel is not ours (foreign namespace or the heartbeat);
    /// nothing happened.
    Ignored,
}

// =============================================================================
// SubscriptionRegistry
// =============================================================================

/// Subscription identity: sorted tag keys plus interval in milliseconds.
type SubscriptionKey = (Vec<TagKey>, u64);

struct SubscriptionEntry {
    refcount: usize,
    channels: ChannelBindings,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<SubscriptionKey, SubscriptionEntry>,
    channel_index: HashMap<String, SubscriptionKey>,
    tag_counts: HashMap<TagKey, usize>,
}

/// Refcounted subscription bookkeeping and task lifecycle.
pub struct SubscriptionRegistry<P: PubSubTransport, M: MonitorControl> {
    namespace: String,
    store: ValueStore,
    broker: Arc<P>,
    monitors: Arc<M>,
    inner: Mutex<Inner>,
}

impl<P: PubSubTransport, M: MonitorControl> SubscriptionRegistry<P, M> {
    /// Creates an empty registry for the given namespace.
    pub fn new(namespace: impl Into<String>, store: ValueStore, broker: Arc<P>, monitors: Arc<M>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
            broker,
            monitors,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Handles a subscribe request.
    ///
    /// The channel spec is parsed before anything else; a malformed spec
    /// has no side effects. Foreign-namespace channels and the heartbeat
    /// are acknowledged as [`Ack::Ignored`]. Re-subscribing a channel with
    /// a different tag set rebinds it: the previous reference is released
    /// first, exactly as an unsubscribe would.
    pub async fn subscribe(
        &self,
        spec: &str,
        request: Option<&TagSetRequest>,
    ) -> BridgeResult<Ack> {
        let parsed = match ChannelSpec::parse(spec, &self.namespace)? {
            Some(ChannelSpec::Data(d)) => d,
            Some(ChannelSpec::Heartbeat { .. }) | None => return Ok(Ack::Ignored),
        };

        let tag_set = Self::request_tag_set(spec, request)?;
        let key = Self::subscription_key(&tag_set, parsed.interval_ms);
        let channel = parsed.to_string();

        let mut inner = self.inner.lock().await;

        // A channel already bound to a different subscription is rebound;
        // its old reference must be released or the old entry becomes
        // unreachable through the channel index.
        if let Some(existing) = inner.channel_index.get(&channel).cloned() {
            if existing != key {
                info!(channel = %channel, "Channel rebound to a new tag set");
                self.release_channel(&mut inner, &channel, &existing).await;
            }
        }

        if let Some(entry) = inner.subscriptions.get_mut(&key) {
            entry.refcount += 1;
            *entry.channels.write().entry(channel.clone()).or_insert(0) += 1;
            let refcount = entry.refcount;
            inner.channel_index.insert(channel.clone(), key);
            debug!(channel = %channel, refcount, "Subscription reference added");
            return Ok(Ack::Applied);
        }

        // First reference: arm monitors for tags not yet watched.
        let mut newly_monitored: Vec<TagKey> = Vec::new();
        for tag_key in tag_set.keys() {
            if inner.tag_counts.get(tag_key).copied().unwrap_or(0) == 0 {
                if let Err(e) = self.monitors.monitor(tag_key).await {
                    for rollback in &newly_monitored {
                        if let Err(e2) = self.monitors.unmonitor(rollback).await {
                            warn!(tag = %rollback, error = %e2, "Rollback unmonitor failed");
                        }
                    }
                    return Err(e.into());
                }
                newly_monitored.push(tag_key.clone());
            }
        }
        for tag_key in tag_set.keys() {
            *inner.tag_counts.entry(tag_key.clone()).or_insert(0) += 1;
        }

        let channels: ChannelBindings =
            Arc::new(RwLock::new(HashMap::from([(channel.clone(), 1)])));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(
            PublisherTask::new(
                self.broker.clone(),
                self.store.clone(),
                tag_set.clone(),
                parsed.interval(),
                channels.clone(),
                shutdown_rx,
            )
            .run(),
        );

        inner.channel_index.insert(channel.clone(), key.clone());
        inner.subscriptions.insert(
            key,
            SubscriptionEntry {
                refcount: 1,
                channels,
                shutdown: shutdown_tx,
                task,
            },
        );
        info!(
            channel = %channel,
            tags = tag_set.len(),
            interval_ms = parsed.interval_ms,
            "Subscription armed"
        );
        Ok(Ack::Applied)
    }

    /// Handles an unsubscribe request.
    ///
    /// Dropping the last reference cancels the publisher task and removes
    /// the upstream monitors whose usage count reached zero. Unsubscribing
    /// a channel that was never subscribed is
    /// [`RegistryError::NotSubscribed`] and has no side effects.
    pub async fn unsubscribe(&self, spec: &str) -> BridgeResult<Ack> {
        let parsed = match ChannelSpec::parse(spec, &self.namespace)? {
            Some(ChannelSpec::Data(d)) => d,
            Some(ChannelSpec::Heartbeat { .. }) | None => return Ok(Ack::Ignored),
        };
        let channel = parsed.to_string();

        let mut inner = self.inner.lock().await;

        let key = inner
            .channel_index
            .get(&channel)
            .cloned()
            .ok_or_else(|| RegistryError::not_subscribed(&channel))?;

        self.release_channel(&mut inner, &channel, &key).await;
        Ok(Ack::Applied)
    }

    /// Drops one reference the channel holds on the keyed subscription.
    ///
    /// The last reference cancels the publisher task and waits for it to
    /// finish before removing monitors, so no publication can land on the
    /// channel after this returns.
    async fn release_channel(&self, inner: &mut Inner, channel: &str, key: &SubscriptionKey) {
        if let Some(bindings) = inner.subscriptions.get(key).map(|e| e.channels.clone()) {
            {
                let mut channels = bindings.write();
                if let Some(count) = channels.get_mut(channel) {
                    *count -= 1;
                    if *count == 0 {
                        channels.remove(channel);
                    }
                }
            }
            if !bindings.read().contains_key(channel) {
                inner.channel_index.remove(channel);
            }
        }

        let remaining = match inner.subscriptions.get_mut(key) {
            Some(entry) => {
                entry.refcount -= 1;
                entry.refcount
            }
            None => return,
        };
        debug!(channel = %channel, refcount = remaining, "Subscription reference dropped");

        if remaining == 0 {
            if let Some(entry) = inner.subscriptions.remove(key) {
                let _ = entry.shutdown.send(true);
                entry.task.abort();
                let _ = entry.task.await;
            }
            for tag_key in &key.0 {
                let last = match inner.tag_counts.get_mut(tag_key) {
                    Some(count) => {
                        *count -= 1;
                        *count == 0
                    }
                    None => false,
                };
                if last {
                    inner.tag_counts.remove(tag_key);
                    if let Err(e) = self.monitors.unmonitor(tag_key).await {
                        warn!(tag = %tag_key, error = %e, "Unmonitor failed");
                    }
                }
            }
            info!(channel = %channel, "Subscription torn down");
        }
    }

    /// Number of armed subscriptions.
    pub async fn active_subscriptions(&self) -> usize {
        self.inner.lock().await.subscriptions.len()
    }

    /// Number of tags currently held by at least one subscription.
    pub async fn watched_tags(&self) -> usize {
        self.inner.lock().await.tag_counts.len()
    }

    /// Cancels every publisher task. Used on shutdown.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.lock().await;
        for (_, entry) in inner.subscriptions.drain() {
            let _ = entry.shutdown.send(true);
        }
        inner.channel_index.clear();
        inner.tag_counts.clear();
        info!("All subscriptions cancelled");
    }

    fn request_tag_set(
        spec: &str,
        request: Option<&TagSetRequest>,
    ) -> Result<TagSet, RegistryError> {
        let request = request.ok_or_else(|| RegistryError::empty_tag_set(spec))?;
        if request.nodes.is_empty() {
            return Err(RegistryError::empty_tag_set(spec));
        }
        Ok(request
            .nodes
            .iter()
            .map(|n| ResolvedTag::from_key(TagKey::new(request.namespace_uri.clone(), n.clone())))
            .collect())
    }

    fn subscription_key(tag_set: &TagSet, interval_ms: u64) -> SubscriptionKey {
        let mut keys: Vec<TagKey> = tag_set.keys().cloned().collect();
        keys.sort();
        keys.dedup();
        (keys, interval_ms)
    }
}
