// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `health` command.

use std::time::Duration;

use crate::cli::HealthArgs;
use crate::error::{BinError, BinResult};

/// Queries a running bridge's health endpoint.
///
/// Exits successfully only when the bridge reports a healthy upstream.
pub async fn health_check(args: HealthArgs) -> BinResult<()> {
    let url = format!("{}/health", args.url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()
        .map_err(|e| BinError::health(e.to_string()))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| BinError::health(format!("{}: {}", url, e)))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.is_success() {
        println!("Healthy: {}", body.trim());
        Ok(())
    } else {
        Err(BinError::health(format!("{} ({})", body.trim(), status)))
    }
}
