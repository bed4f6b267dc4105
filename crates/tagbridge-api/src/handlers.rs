// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request handlers for the query server.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Map;
use tracing::debug;

use tagbridge_core::store::Snapshot;
use tagbridge_core::types::Value;
use tagbridge_pubsub::registry::{Ack, TagSetRequest};

use crate::state::AppState;

const MEASUREMENT_KEY: &str = "measurement";

// =============================================================================
// Health and status
// =============================================================================

/// GET `/health`.
///
/// Healthy while the upstream session is up or still inside its reconnect
/// budget; 500 once the backoff has saturated at its ceiling.
pub async fn health(State(state): State<AppState>) -> Response {
    if state.degraded.load(std::sync::atomic::Ordering::Relaxed) {
        let upstream = *state.upstream.borrow();
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("upstream reconnect attempts exhausted (state: {})", upstream),
        )
            .into_response();
    }
    (StatusCode::OK, "OK").into_response()
}

/// GET `/status`.
pub async fn status() -> StatusCode {
    StatusCode::NO_CONTENT
}

// =============================================================================
// Values
// =============================================================================

/// Collects the snapshot's samples as named fields.
///
/// Configured tags come first, in declared order; samples for tags
/// subscribed at runtime only follow, sorted by key for determinism.
fn ordered_fields(state: &AppState, snapshot: &Snapshot) -> Vec<(String, Value)> {
    let mut fields = Vec::with_capacity(snapshot.entries.len());

    for tag in state.tag_set.iter() {
        if let Some(sample) = snapshot.get(&tag.key) {
            fields.push((tag.name.clone(), sample.value.clone()));
        }
    }

    let mut extra: Vec<_> = snapshot
        .entries
        .iter()
        .filter(|(k, _)| !state.tag_set.contains(k))
        .collect();
    extra.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, sample) in extra {
        fields.push((key.short_id(), sample.value.clone()));
    }

    fields
}

/// GET `/values?tag=<v>&...`.
///
/// Every query parameter is echoed back under `tags`. The body is built
/// from exactly one store snapshot; byte strings render as base64 and the
/// timestamp is the snapshot's wall-clock time.
pub async fn values(
    Query(params): Query<BTreeMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let snapshot = state.store.snapshot(None);

    let mut fields = Map::new();
    for (name, value) in ordered_fields(&state, &snapshot) {
        fields.insert(name, value.to_json());
    }

    let body = serde_json::json!({
        "timestamp": snapshot.taken_at.to_rfc3339(),
        "tags": params,
        "fields": fields,
    });
    Json(body).into_response()
}

// =============================================================================
// InfluxDB metrics
// =============================================================================

/// GET `/influxdb-metrics?measurement=<m>&<tags>`.
///
/// Renders the store as one line-protocol line. The `measurement`
/// parameter is required; every other parameter becomes a line tag.
pub async fn influxdb_metrics(
    Query(mut params): Query<BTreeMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let Some(measurement) = params.remove(MEASUREMENT_KEY) else {
        return problem(
            StatusCode::BAD_REQUEST,
            "missing-measurement",
            "measurement query parameter not found",
        );
    };
    if measurement.is_empty() {
        return problem(
            StatusCode::BAD_REQUEST,
            "missing-measurement",
            "measurement query parameter is empty",
        );
    }

    let snapshot = state.store.snapshot(None);
    let tags: Vec<(String, String)> = params.into_iter().collect();
    let fields = ordered_fields(&state, &snapshot);
    let line = crate::lineprotocol::build_line(&measurement, &tags, &fields, snapshot.taken_at);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        line,
    )
        .into_response()
}

// =============================================================================
// Pub/sub webhooks
// =============================================================================

/// Subscribe webhook body, as sent by the broker proxy.
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    /// Raw channel string.
    pub channel: String,

    /// Tag list for data channels.
    #[serde(default)]
    pub data: Option<TagSetRequest>,
}

/// Unsubscribe webhook body.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    /// Raw channel string.
    pub channel: String,
}

fn proxy_success(msg: &str) -> Response {
    Json(serde_json::json!({"result": {"data": {"proxyMsg": msg}}})).into_response()
}

fn proxy_error(code: u32, msg: String) -> Response {
    Json(serde_json::json!({"error": {"code": code, "message": msg}})).into_response()
}

/// POST `/pubsub/subscribe`.
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeBody>,
) -> Response {
    debug!(channel = %body.channel, "Subscribe request");
    match state
        .subscriptions
        .subscribe(&body.channel, body.data.as_ref())
        .await
    {
        Ok(Ack::Ignored) => proxy_success("ignored channel"),
        Ok(Ack::Applied) => proxy_success("subscribed to data change"),
        Err(e) => proxy_error(1000, format!("error subscribing to data change: {}", e)),
    }
}

/// POST `/pubsub/unsubscribe`.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeBody>,
) -> Response {
    debug!(channel = %body.channel, "Unsubscribe request");
    match state.subscriptions.unsubscribe(&body.channel).await {
        Ok(Ack::Ignored) => proxy_success("ignored channel"),
        Ok(Ack::Applied) => proxy_success("unsubscribed from data change"),
        Err(e) => proxy_error(1001, format!("error unsubscribing from data change: {}", e)),
    }
}

// =============================================================================
// Problem responses
// =============================================================================

fn problem(status: StatusCode, kind: &str, detail: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "type": kind,
            "status": status.as_u16(),
            "detail": detail,
        })),
    )
        .into_response()
}
