// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Pub/Sub Integration Tests
//!
//! End-to-end publishing behavior: subscriptions drive monitored items,
//! notifications land in the store, publisher timers fan values out, and
//! the heartbeat reports upstream health. Timers run under paused tokio
//! time so tick counts are deterministic.

use std::time::Duration;

use tagbridge_core::Value;
use tagbridge_pubsub::registry::Ack;
use tagbridge_pubsub::{HeartbeatTask, HEALTHY_DESCRIPTION};
use tagbridge_tests::common::fixtures::{
    channel, define_tag, tag_request, BridgeHarness, BRIDGE_NAMESPACE,
};

async fn settle() {
    // Let spawned tasks observe pending notifications and timers.
    tokio::time::sleep(Duration::from_millis(5)).await;
}

// =============================================================================
// Data channels
// =============================================================================

#[tokio::test(start_paused = true)]
async fn publishes_every_interval_even_when_values_are_unchanged() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "the.answer", Value::Int(42));

    let spec = channel("steady", 100);
    let ack = harness
        .registry
        .subscribe(&spec, Some(&tag_request(&["the.answer"])))
        .await
        .unwrap();
    assert_eq!(ack, Ack::Applied);

    tokio::time::sleep(Duration::from_millis(350)).await;

    let count = harness.broker.count_for(&spec);
    assert!(count >= 3, "expected at least 3 ticks, saw {}", count);

    // The value never changed, so every publication carries the same field.
    let last = harness.broker.last_for(&spec).unwrap();
    assert_eq!(last["the.answer"], serde_json::json!(42));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn one_channel_carries_all_subscribed_tags() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "speed", Value::Int(42));
    define_tag(&harness.sim, "running", Value::Bool(true));

    let spec = channel("line", 100);
    harness
        .registry
        .subscribe(&spec, Some(&tag_request(&["speed", "running"])))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    let last = harness.broker.last_for(&spec).unwrap();
    assert_eq!(last["speed"], serde_json::json!(42));
    assert_eq!(last["running"], serde_json::json!(true));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn value_changes_flow_into_subsequent_publications() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "counter", Value::Int(1));

    let spec = channel("counter", 100);
    harness
        .registry
        .subscribe(&spec, Some(&tag_request(&["counter"])))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    harness.sim.set_value(
        tagbridge_tests::common::fixtures::sim_key("counter"),
        Value::Int(2),
    );
    settle().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let last = harness.broker.last_for(&spec).unwrap();
    assert_eq!(last["counter"], serde_json::json!(2));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn double_subscribe_needs_two_unsubscribes() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "t", Value::Int(42));

    let spec = channel("dup", 100);
    let request = tag_request(&["t"]);
    harness.registry.subscribe(&spec, Some(&request)).await.unwrap();
    harness.registry.subscribe(&spec, Some(&request)).await.unwrap();

    // First unsubscribe: publications keep flowing.
    harness.registry.unsubscribe(&spec).await.unwrap();
    harness.broker.clear();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(harness.broker.count_for(&spec) >= 2);

    // Second unsubscribe: silence.
    harness.registry.unsubscribe(&spec).await.unwrap();
    settle().await;
    harness.broker.clear();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.broker.count_for(&spec), 0);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn channels_with_identical_tags_share_one_timer() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "shared", Value::Int(42));

    let first = channel("first", 100);
    let second = channel("second", 100);
    let request = tag_request(&["shared"]);
    harness.registry.subscribe(&first, Some(&request)).await.unwrap();
    harness.registry.subscribe(&second, Some(&request)).await.unwrap();

    assert_eq!(harness.registry.active_subscriptions().await, 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(harness.broker.count_for(&first) >= 2);
    assert!(harness.broker.count_for(&second) >= 2);

    // Dropping one channel leaves the other alive.
    harness.registry.unsubscribe(&first).await.unwrap();
    harness.broker.clear();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(harness.broker.count_for(&first), 0);
    assert!(harness.broker.count_for(&second) >= 2);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_tags_remain_readable_from_the_store() {
    let harness = BridgeHarness::start().await;
    let key = define_tag(&harness.sim, "keep", Value::Int(9));

    let spec = channel("keep", 100);
    harness
        .registry
        .subscribe(&spec, Some(&tag_request(&["keep"])))
        .await
        .unwrap();
    settle().await;
    harness.registry.unsubscribe(&spec).await.unwrap();

    // The last sample outlives the subscription.
    let sample = harness.store.get(&key).expect("sample retained");
    assert_eq!(sample.value, Value::Int(9));

    harness.stop().await;
}

#[tokio::test]
async fn foreign_channels_are_acknowledged_without_side_effects() {
    let harness = BridgeHarness::start().await;

    let ack = harness
        .registry
        .subscribe("other:channel@1000", Some(&tag_request(&["x"])))
        .await
        .unwrap();
    assert_eq!(ack, Ack::Ignored);
    assert_eq!(harness.registry.active_subscriptions().await, 0);

    let ack = harness.registry.subscribe("nocolon", None).await.unwrap();
    assert_eq!(ack, Ack::Ignored);

    harness.stop().await;
}

// =============================================================================
// Heartbeat
// =============================================================================

#[tokio::test(start_paused = true)]
async fn heartbeat_publishes_health_on_its_own_clock() {
    let harness = BridgeHarness::start().await;

    let heartbeat = HeartbeatTask::new(
        harness.broker.clone(),
        BRIDGE_NAMESPACE,
        Duration::from_millis(100),
        harness.client.state_watch(),
        harness.shutdown_rx(),
    );
    let task = tokio::spawn(heartbeat.run());

    tokio::time::sleep(Duration::from_millis(250)).await;

    let hb_channel = format!("{}:heartbeat", BRIDGE_NAMESPACE);
    assert!(harness.broker.count_for(&hb_channel) >= 2);
    let last = harness.broker.last_for(&hb_channel).unwrap();
    assert_eq!(last["status"], serde_json::json!(0));
    assert_eq!(last["description"], serde_json::json!(HEALTHY_DESCRIPTION));

    harness.stop().await;
    let _ = task.await;
}

#[tokio::test(start_paused = true)]
async fn heartbeat_degrades_while_upstream_is_down() {
    let harness = BridgeHarness::start().await;

    let heartbeat = HeartbeatTask::new(
        harness.broker.clone(),
        BRIDGE_NAMESPACE,
        Duration::from_millis(100),
        harness.client.state_watch(),
        harness.shutdown_rx(),
    );
    let task = tokio::spawn(heartbeat.run());

    harness.sim.refuse_connections(true);
    harness.sim.trip_connection();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let hb_channel = format!("{}:heartbeat", BRIDGE_NAMESPACE);
    let last = harness.broker.last_for(&hb_channel).unwrap();
    assert_ne!(last["status"], serde_json::json!(0));

    harness.stop().await;
    let _ = task.await;
}
