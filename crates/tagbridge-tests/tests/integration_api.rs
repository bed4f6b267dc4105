// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Query Server Integration Tests
//!
//! Drives the full router with in-memory requests:
//!
//! - `/health` and `/status` probes
//! - `/values` snapshot rendering, including byte strings
//! - `/influxdb-metrics` line-protocol output
//! - pub/sub webhook envelopes

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Utc};
use tower::ServiceExt;

use tagbridge_core::{Sample, TagSet, Value};
use tagbridge_tests::common::fixtures::{
    define_tag, named_tag_set, sim_key, BridgeHarness, SIM_NAMESPACE,
};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Health and status
// =============================================================================

#[tokio::test]
async fn health_reports_ok_while_connected() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn health_fails_once_reconnects_are_exhausted() {
    let harness = BridgeHarness::start_disconnected().await;
    harness.sim.refuse_connections(true);

    // Let the backoff climb to its ceiling.
    let degraded = harness.client.degraded_flag();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !degraded.load(std::sync::atomic::Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("client never reported degradation");

    let router = harness.router(TagSet::new());
    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("exhausted"));

    harness.stop().await;
}

#[tokio::test]
async fn status_answers_no_content() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    let response = router.oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    harness.stop().await;
}

// =============================================================================
// Values
// =============================================================================

fn seed_reference_samples(harness: &BridgeHarness) -> TagSet {
    let now = Utc::now();
    harness
        .store
        .update(sim_key("2994"), Sample::good(Value::Bool(false), now));
    harness.store.update(
        sim_key("2263"),
        Sample::good(Value::Text("open62541".to_string()), now),
    );
    harness
        .store
        .update(sim_key("answer"), Sample::good(Value::Int(42), now));
    harness.store.update(
        sim_key("bytes"),
        Sample::good(Value::Bytes(b"test123".to_vec()), now),
    );

    named_tag_set(&[
        ("2994", "2994"),
        ("2263", "2263"),
        ("the.answer", "answer"),
        ("myByteString", "bytes"),
    ])
}

#[tokio::test]
async fn values_renders_one_snapshot_with_echoed_tags() {
    let harness = BridgeHarness::start().await;
    let tag_set = seed_reference_samples(&harness);
    let router = harness.router(tag_set);

    let response = router
        .oneshot(get("/values?site=alpha&line=7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tags"]["site"], "alpha");
    assert_eq!(body["tags"]["line"], "7");
    assert_eq!(body["fields"]["2994"], serde_json::json!(false));
    assert_eq!(body["fields"]["2263"], serde_json::json!("open62541"));
    assert_eq!(body["fields"]["the.answer"], serde_json::json!(42));
    // Byte strings render as base64.
    assert_eq!(body["fields"]["myByteString"], serde_json::json!("dGVzdDEyMw=="));

    let stamp = body["timestamp"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(stamp).is_ok());

    harness.stop().await;
}

#[tokio::test]
async fn values_with_empty_store_returns_empty_fields() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    let body = body_json(router.oneshot(get("/values")).await.unwrap()).await;
    assert_eq!(body["fields"], serde_json::json!({}));

    harness.stop().await;
}

// =============================================================================
// InfluxDB metrics
// =============================================================================

#[tokio::test]
async fn influxdb_metrics_renders_declared_field_order() {
    let harness = BridgeHarness::start().await;
    let tag_set = seed_reference_samples(&harness);
    let router = harness.router(tag_set);

    let response = router
        .oneshot(get("/influxdb-metrics?measurement=testing&tag=value"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let line = body_text(response).await;
    assert!(
        line.starts_with(
            "testing,tag=value 2994=false,2263=\"open62541\",the.answer=42,myByteString=\"test123\" "
        ),
        "unexpected line: {}",
        line
    );
    assert!(line.ends_with('\n'));

    harness.stop().await;
}

#[tokio::test]
async fn influxdb_metrics_requires_a_measurement() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    let response = router
        .clone()
        .oneshot(get("/influxdb-metrics?tag=value"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["type"], "missing-measurement");

    let response = router
        .oneshot(get("/influxdb-metrics?measurement="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    harness.stop().await;
}

// =============================================================================
// Pub/sub webhooks
// =============================================================================

#[tokio::test]
async fn subscribe_webhook_arms_a_data_channel() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "web", Value::Int(1));
    let router = harness.router(TagSet::new());

    let body = serde_json::json!({
        "channel": "bridge:web@100",
        "data": {"namespaceURI": SIM_NAMESPACE, "nodes": ["web"]},
    });
    let response = router
        .oneshot(post_json("/pubsub/subscribe", body))
        .await
        .unwrap();

    let envelope = body_json(response).await;
    assert_eq!(
        envelope["result"]["data"]["proxyMsg"],
        "subscribed to data change"
    );
    assert_eq!(harness.registry.active_subscriptions().await, 1);

    harness.stop().await;
}

#[tokio::test]
async fn foreign_channels_are_ignored_by_the_webhooks() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    let body = serde_json::json!({"channel": "elsewhere:web@100"});
    let response = router
        .oneshot(post_json("/pubsub/subscribe", body))
        .await
        .unwrap();

    let envelope = body_json(response).await;
    assert_eq!(envelope["result"]["data"]["proxyMsg"], "ignored channel");
    assert_eq!(harness.registry.active_subscriptions().await, 0);

    harness.stop().await;
}

#[tokio::test]
async fn malformed_channels_produce_subscribe_error_envelopes() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    // Our namespace, but no interval separator.
    let body = serde_json::json!({
        "channel": "bridge:broken",
        "data": {"namespaceURI": SIM_NAMESPACE, "nodes": ["x"]},
    });
    let response = router
        .oneshot(post_json("/pubsub/subscribe", body))
        .await
        .unwrap();

    let envelope = body_json(response).await;
    assert_eq!(envelope["error"]["code"], 1000);
    assert!(envelope["error"]["message"]
        .as_str()
        .unwrap()
        .contains("error subscribing"));

    harness.stop().await;
}

#[tokio::test]
async fn unsubscribing_an_unknown_channel_reports_an_error() {
    let harness = BridgeHarness::start().await;
    let router = harness.router(TagSet::new());

    let body = serde_json::json!({"channel": "bridge:ghost@100"});
    let response = router
        .oneshot(post_json("/pubsub/unsubscribe", body))
        .await
        .unwrap();

    let envelope = body_json(response).await;
    assert_eq!(envelope["error"]["code"], 1001);

    harness.stop().await;
}

#[tokio::test]
async fn subscribe_then_unsubscribe_round_trips_through_the_webhooks() {
    let harness = BridgeHarness::start().await;
    define_tag(&harness.sim, "rt", Value::Int(1));
    let router = harness.router(TagSet::new());

    let subscribe = serde_json::json!({
        "channel": "bridge:rt@100",
        "data": {"namespaceURI": SIM_NAMESPACE, "nodes": ["rt"]},
    });
    router
        .clone()
        .oneshot(post_json("/pubsub/subscribe", subscribe))
        .await
        .unwrap();

    let unsubscribe = serde_json::json!({"channel": "bridge:rt@100"});
    let response = router
        .oneshot(post_json("/pubsub/unsubscribe", unsubscribe))
        .await
        .unwrap();

    let envelope = body_json(response).await;
    assert_eq!(
        envelope["result"]["data"]["proxyMsg"],
        "unsubscribed from data change"
    );
    assert_eq!(harness.registry.active_subscriptions().await, 0);

    harness.stop().await;
}
