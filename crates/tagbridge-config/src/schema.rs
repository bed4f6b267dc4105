// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! The upstream server entries follow the wire shape of the central
//! configuration service (camelCase, `_id` keys, tagged tag/container
//! entries); the remaining sections configure this bridge instance and
//! carry defaults for every field.

use serde::{Deserialize, Serialize};

use tagbridge_core::error::{ConfigError, ConfigResult};
use tagbridge_core::retry::BackoffConfig;
use tagbridge_core::types::NodeIdentifier;

// =============================================================================
// Server entries
// =============================================================================

/// One upstream server entry as served by the configuration service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    /// Stable entry identifier.
    #[serde(rename = "_id")]
    pub id: String,

    /// Upstream endpoint URL.
    pub server_url: String,

    /// Security policy name (`None` or `Basic256Sha256`).
    pub security_policy: String,

    /// Security mode name (`None` or `SignAndEncrypt`).
    pub security_mode: String,

    /// Login user, if the server requires one.
    #[serde(default)]
    pub user: Option<String>,

    /// Login password.
    #[serde(default)]
    pub password: Option<String>,

    /// Client certificate file for encrypted sessions.
    #[serde(default)]
    pub cert_file: Option<String>,

    /// Client private key file for encrypted sessions.
    #[serde(default)]
    pub key_file: Option<String>,

    /// Tags and containers to monitor.
    pub tags: Vec<TagConfigEntry>,
}

/// A configured tag or container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TagConfigEntry {
    /// A single monitored tag.
    #[serde(rename = "tag", rename_all = "camelCase")]
    Tag {
        /// Override for the published field name.
        #[serde(default)]
        name: Option<String>,
        /// Namespace URI of the node.
        namespace_uri: String,
        /// Node identifier, string or numeric.
        node_identifier: NodeIdentifier,
    },

    /// A container whose children are expanded by browsing.
    #[serde(rename = "container", rename_all = "camelCase")]
    Container {
        /// Namespace URI of the container.
        namespace_uri: String,
        /// Node identifier, string or numeric.
        node_identifier: NodeIdentifier,
    },
}

impl TagConfigEntry {
    /// Namespace URI the entry refers to.
    pub fn namespace_uri(&self) -> &str {
        match self {
            TagConfigEntry::Tag { namespace_uri, .. } => namespace_uri,
            TagConfigEntry::Container { namespace_uri, .. } => namespace_uri,
        }
    }
}

// =============================================================================
// Bridge sections
// =============================================================================

/// Query server section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4870,
            request_timeout_ms: 10_000,
        }
    }
}

/// Pub/sub section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubSection {
    /// Channel namespace owned by this bridge.
    pub namespace: String,

    /// Heartbeat publish interval in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Broker publish endpoint. When unset, publications are logged only.
    pub broker_url: Option<String>,

    /// API key sent with broker publish requests.
    pub broker_api_key: Option<String>,
}

impl Default for PubSubSection {
    fn default() -> Self {
        Self {
            namespace: "tagbridge".to_string(),
            heartbeat_interval_ms: 5_000,
            broker_url: None,
            broker_api_key: None,
        }
    }
}

/// Tag resolution section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveSection {
    /// Maximum container nesting depth.
    pub max_depth: usize,
}

impl Default for ResolveSection {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

/// Upstream session section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Server entry to use; defaults to the first entry.
    pub server_id: Option<String>,

    /// Session establishment deadline in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-call deadline in milliseconds.
    pub call_timeout_ms: u64,

    /// Reconnect backoff.
    pub backoff: BackoffConfig,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            server_id: None,
            connect_timeout_ms: 10_000,
            call_timeout_ms: 5_000,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level filter.
    pub level: String,

    /// Output format: `text`, `json` or `compact`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// =============================================================================
// BridgeConfig
// =============================================================================

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Upstream server entries.
    pub servers: Vec<ServerEntry>,

    /// Query server settings.
    #[serde(default)]
    pub api: ApiSection,

    /// Pub/sub settings.
    #[serde(default)]
    pub pubsub: PubSubSection,

    /// Tag resolution settings.
    #[serde(default)]
    pub resolve: ResolveSection,

    /// Upstream session settings.
    #[serde(default)]
    pub upstream: UpstreamSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl BridgeConfig {
    /// Wraps server entries fetched from the configuration service with
    /// default bridge sections.
    pub fn from_servers(servers: Vec<ServerEntry>) -> Self {
        Self {
            servers,
            api: ApiSection::default(),
            pubsub: PubSubSection::default(),
            resolve: ResolveSection::default(),
            upstream: UpstreamSection::default(),
            logging: LoggingSection::default(),
        }
    }

    /// Returns the server entry selected by `upstream.server_id`.
    pub fn active_server(&self) -> ConfigResult<&ServerEntry> {
        match &self.upstream.server_id {
            Some(id) => self
                .servers
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| {
                    ConfigError::validation(format!("no server entry with _id {:?}", id))
                }),
            None => self
                .servers
                .first()
                .ok_or_else(|| ConfigError::validation("no server entries configured")),
        }
    }

    /// Validates structural invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.servers.is_empty() {
            return Err(ConfigError::validation("no server entries configured"));
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            if server.id.is_empty() {
                return Err(ConfigError::validation("server entry with empty _id"));
            }
            if !seen.insert(&server.id) {
                return Err(ConfigError::validation(format!(
                    "duplicate server _id {:?}",
                    server.id
                )));
            }
            if server.server_url.is_empty() {
                return Err(ConfigError::validation(format!(
                    "server {:?} has an empty serverUrl",
                    server.id
                )));
            }
            for entry in &server.tags {
                if entry.namespace_uri().is_empty() {
                    return Err(ConfigError::validation(format!(
                        "server {:?} has a tag entry with an empty namespaceUri",
                        server.id
                    )));
                }
            }
        }

        if self.pubsub.namespace.is_empty() {
            return Err(ConfigError::validation("pubsub.namespace must not be empty"));
        }
        if self.pubsub.namespace.contains(':') {
            return Err(ConfigError::validation(
                "pubsub.namespace must not contain ':'",
            ));
        }
        if self.pubsub.heartbeat_interval_ms == 0 {
            return Err(ConfigError::validation(
                "pubsub.heartbeat_interval_ms must be positive",
            ));
        }
        if self.resolve.max_depth == 0 {
            return Err(ConfigError::validation("resolve.max_depth must be positive"));
        }

        self.active_server()?;
        Ok(())
    }
}
