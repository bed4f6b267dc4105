// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pub/sub channel spec parsing.
//!
//! Data channels follow the format `<namespace>:<name>@<intervalMs>`; the
//! heartbeat channel is `<namespace>:heartbeat`. Channels outside the
//! bridge's configured namespace belong to other tenants of the broker and
//! are ignored rather than rejected.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Separator between namespace and channel name.
pub const NS_SEPARATOR: char = ':';

/// Separator between channel name and interval.
pub const INTERVAL_SEPARATOR: char = '@';

/// Reserved channel name for the heartbeat.
pub const HEARTBEAT_NAME: &str = "heartbeat";

// =============================================================================
// ChannelSpec
// =============================================================================

/// A parsed channel spec within the bridge's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelSpec {
    /// Periodic data channel.
    Data(DataChannel),

    /// The namespace heartbeat channel.
    Heartbeat {
        /// Namespace the heartbeat belongs to.
        namespace: String,
    },
}

/// The data-channel form: a named tag group sampled at a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataChannel {
    /// Bridge namespace.
    pub namespace: String,

    /// Channel name.
    pub name: String,

    /// Sampling interval in milliseconds.
    pub interval_ms: u64,
}

impl DataChannel {
    /// Returns the sampling interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl fmt::Display for DataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.namespace, NS_SEPARATOR, self.name, INTERVAL_SEPARATOR, self.interval_ms
        )
    }
}

impl ChannelSpec {
    /// Parses a raw channel string against the bridge's namespace.
    ///
    /// Returns `Ok(None)` for channels the bridge does not own: strings
    /// with no namespace separator and channels under a foreign namespace.
    /// Those are other tenants' traffic, and ignoring them must have no
    /// side effects.
    ///
    /// Malformed channels inside our namespace are errors: a missing
    /// interval separator, an empty name, an unparseable interval, or an
    /// interval of zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagbridge_core::channel::ChannelSpec;
    ///
    /// let spec = ChannelSpec::parse("plant1:pumps@1000", "plant1").unwrap().unwrap();
    /// assert_eq!(spec.channel_key(), "plant1:pumps@1000");
    ///
    /// assert!(ChannelSpec::parse("other:pumps@1000", "plant1").unwrap().is_none());
    /// assert!(ChannelSpec::parse("plant1:pumps", "plant1").is_err());
    /// ```
    pub fn parse(s: &str, namespace: &str) -> RegistryResult<Option<ChannelSpec>> {
        let Some((ns, rest)) = s.split_once(NS_SEPARATOR) else {
            return Ok(None);
        };
        if ns != namespace {
            return Ok(None);
        }
        if rest == HEARTBEAT_NAME {
            return Ok(Some(ChannelSpec::Heartbeat {
                namespace: ns.to_string(),
            }));
        }

        let Some((name, interval)) = rest.split_once(INTERVAL_SEPARATOR) else {
            return Err(RegistryError::invalid_spec(
                s,
                format!("bad channel name format: {:?}", rest),
            ));
        };
        if name.is_empty() {
            return Err(RegistryError::invalid_spec(s, "empty channel name"));
        }

        let interval_ms: u64 = interval.parse().map_err(|e| {
            RegistryError::invalid_spec(s, format!("error parsing interval: {}", e))
        })?;
        if interval_ms == 0 {
            return Err(RegistryError::invalid_spec(s, "interval must be positive"));
        }

        Ok(Some(ChannelSpec::Data(DataChannel {
            namespace: ns.to_string(),
            name: name.to_string(),
            interval_ms,
        })))
    }

    /// Renders the canonical channel string.
    pub fn channel_key(&self) -> String {
        match self {
            ChannelSpec::Data(d) => d.to_string(),
            ChannelSpec::Heartbeat { namespace } => {
                format!("{}{}{}", namespace, NS_SEPARATOR, HEARTBEAT_NAME)
            }
        }
    }

    /// Returns the namespace the spec belongs to.
    pub fn namespace(&self) -> &str {
        match self {
            ChannelSpec::Data(d) => &d.namespace,
            ChannelSpec::Heartbeat { namespace } => namespace,
        }
    }
}

/// Renders the heartbeat channel string for a namespace.
pub fn heartbeat_channel(namespace: &str) -> String {
    format!("{}{}{}", namespace, NS_SEPARATOR, HEARTBEAT_NAME)
}
