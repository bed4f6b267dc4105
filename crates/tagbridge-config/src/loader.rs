// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! A configuration source is either a local file (JSON or YAML, decided
//! by extension) or the URL of the central configuration service, which
//! serves the server-entry array; bridge sections then take their
//! defaults.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use tagbridge_core::error::{ConfigError, ConfigResult};

use crate::schema::{BridgeConfig, ServerEntry};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads configuration from a file path or service URL.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads from `source`, dispatching on its shape.
    pub async fn load(source: &str) -> ConfigResult<BridgeConfig> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let servers = Self::fetch_servers(source).await?;
            Ok(BridgeConfig::from_servers(servers))
        } else {
            Self::load_file(Path::new(source))
        }
    }

    /// Loads a configuration file.
    pub fn load_file(path: &Path) -> ConfigResult<BridgeConfig> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: BridgeConfig = match extension {
            "json" => serde_json::from_str(&raw).map_err(|e| ConfigError::parse(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&raw).map_err(|e| ConfigError::parse(e.to_string()))?
            }
            other => {
                return Err(ConfigError::parse(format!(
                    "unsupported config extension {:?} (expected json, yaml or yml)",
                    other
                )));
            }
        };

        info!(path = %path.display(), servers = config.servers.len(), "Configuration loaded");
        Ok(config)
    }

    /// Fetches the server-entry array from the configuration service.
    pub async fn fetch_servers(url: &str) -> ConfigResult<Vec<ServerEntry>> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::fetch(url, e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ConfigError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::fetch(
                url,
                format!("unexpected status {}", status),
            ));
        }

        let servers: Vec<ServerEntry> = response
            .json()
            .await
            .map_err(|e| ConfigError::fetch(url, format!("decoding body: {}", e)))?;

        info!(url = %url, servers = servers.len(), "Configuration fetched");
        Ok(servers)
    }
}
