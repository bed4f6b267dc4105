// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reconnect backoff policy for the upstream session.
//!
//! The upstream client never gives up: connection loss starts a bounded
//! exponential backoff loop that keeps retrying at the ceiling delay until
//! the session comes back. Reaching the ceiling is reported so the health
//! endpoint can flip to degraded.
//!
//! # Example
//!
//! ```
//! use tagbridge_core::retry::{BackoffConfig, BackoffPolicy};
//! use std::time::Duration;
//!
//! let mut backoff = BackoffPolicy::new(BackoffConfig {
//!     initial_delay: Duration::from_millis(100),
//!     max_delay: Duration::from_secs(30),
//!     multiplier: 2.0,
//!     jitter: 0.0,
//! });
//!
//! assert_eq!(backoff.next_delay(), Duration::from_millis(100));
//! assert_eq!(backoff.next_delay(), Duration::from_millis(200));
//! assert!(!backoff.at_ceiling());
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// Backoff Configuration
// =============================================================================

/// Configuration for the reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    #[serde(default = "default_initial_delay")]
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,

    /// Ceiling for the delay between retries.
    #[serde(default = "default_max_delay")]
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,

    /// Growth factor applied after each attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Jitter factor in `[0.0, 1.0]` to randomize delays.
    #[serde(default)]
    pub jitter: f64,
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: 0.0,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// =============================================================================
// BackoffPolicy
// =============================================================================

/// Stateful bounded exponential backoff.
///
/// Not `Clone` on purpose: one policy instance drives one reconnect loop.
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    attempt: u32,
    current: Duration,
    at_ceiling: bool,
}

impl BackoffPolicy {
    /// Creates a fresh policy from the given configuration.
    pub fn new(config: BackoffConfig) -> Self {
        let current = config.initial_delay;
        Self {
            config,
            attempt: 0,
            current,
            at_ceiling: false,
        }
    }

    /// Returns the next delay to sleep before retrying.
    ///
    /// The delay grows by the configured multiplier and saturates at the
    /// ceiling. With jitter enabled the returned delay is perturbed by up to
    /// `jitter * delay` in either direction; the ceiling tracking uses the
    /// unperturbed value.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;

        let next_ms = (self.current.as_millis() as f64 * self.config.multiplier) as u64;
        let next = Duration::from_millis(next_ms);
        if next >= self.config.max_delay {
            self.current = self.config.max_delay;
            self.at_ceiling = true;
        } else {
            self.current = next;
        }
        self.attempt = self.attempt.saturating_add(1);

        self.apply_jitter(delay)
    }

    /// Returns `true` once the delay has saturated at the ceiling.
    ///
    /// The health endpoint treats a ceiling-saturated reconnect loop as a
    /// degraded bridge.
    pub fn at_ceiling(&self) -> bool {
        self.at_ceiling
    }

    /// Number of delays handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Resets the policy after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current = self.config.initial_delay;
        self.at_ceiling = false;
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter <= 0.0 {
            return delay;
        }
        let spread = delay.as_millis() as f64 * self.config.jitter.min(1.0);
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        let jittered = (delay.as_millis() as f64 + offset).max(0.0) as u64;
        Duration::from_millis(jittered)
    }
}
