// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Upstream security parameter mapping.
//!
//! Configuration entries carry loosely-typed security fields. This module
//! validates them into a [`SecurityConfig`] before a session is attempted,
//! so a bad entry fails at load time rather than mid-handshake.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use tagbridge_core::error::{ConfigError, ConfigResult};

// =============================================================================
// Policies and modes
// =============================================================================

/// Supported security policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityPolicy {
    /// No message security.
    None,

    /// Basic256Sha256 signing and encryption suite.
    Basic256Sha256,
}

impl SecurityPolicy {
    fn parse(s: &str) -> ConfigResult<Self> {
        match s {
            "None" => Ok(Self::None),
            "Basic256Sha256" => Ok(Self::Basic256Sha256),
            other => Err(ConfigError::validation(format!(
                "unsupported security policy: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Basic256Sha256 => write!(f, "Basic256Sha256"),
        }
    }
}

/// Supported message security modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityMode {
    /// No signing or encryption.
    None,

    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    fn parse(s: &str) -> ConfigResult<Self> {
        match s {
            "None" => Ok(Self::None),
            "SignAndEncrypt" => Ok(Self::SignAndEncrypt),
            other => Err(ConfigError::validation(format!(
                "unsupported security mode: {:?}",
                other
            ))),
        }
    }
}

/// User identity presented to the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentity {
    /// Anonymous token.
    Anonymous,

    /// Username token.
    UserName {
        /// Login user.
        user: String,
        /// Login password, possibly empty.
        password: String,
    },
}

// =============================================================================
// SecurityConfig
// =============================================================================

/// Validated security parameters for one upstream session.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityConfig {
    /// Message security policy.
    pub policy: SecurityPolicy,

    /// Message security mode.
    pub mode: SecurityMode,

    /// User identity token.
    pub identity: UserIdentity,

    /// Client certificate, required for encrypted sessions.
    pub cert_file: Option<PathBuf>,

    /// Client private key, required for encrypted sessions.
    pub key_file: Option<PathBuf>,
}

/// Raw security fields as they appear in a configuration entry.
#[derive(Debug, Clone, Default)]
pub struct SecurityParams<'a> {
    /// Policy name.
    pub policy: &'a str,

    /// Mode name.
    pub mode: &'a str,

    /// Optional login user.
    pub user: Option<&'a str>,

    /// Optional login password.
    pub password: Option<&'a str>,

    /// Optional certificate file.
    pub cert_file: Option<&'a str>,

    /// Optional private key file.
    pub key_file: Option<&'a str>,
}

impl SecurityConfig {
    /// Validates raw configuration fields into a [`SecurityConfig`].
    ///
    /// Policy and mode must pair up: `None`/`None` or
    /// `Basic256Sha256`/`SignAndEncrypt`. A password without a user is
    /// rejected, as is a certificate without its key (and vice versa).
    /// Encrypted sessions require both certificate and key.
    pub fn from_params(params: SecurityParams<'_>) -> ConfigResult<Self> {
        let policy = SecurityPolicy::parse(params.policy)?;
        let mode = SecurityMode::parse(params.mode)?;

        match (policy, mode) {
            (SecurityPolicy::None, SecurityMode::None) => {}
            (SecurityPolicy::Basic256Sha256, SecurityMode::SignAndEncrypt) => {}
            (p, m) => {
                return Err(ConfigError::validation(format!(
                    "security policy {} cannot be combined with mode {:?}",
                    p, m
                )));
            }
        }

        let identity = match (params.user, params.password) {
            (None, Some(_)) => {
                return Err(ConfigError::validation("missing username"));
            }
            (None, None) => UserIdentity::Anonymous,
            (Some(user), password) => UserIdentity::UserName {
                user: user.to_string(),
                password: password.unwrap_or_default().to_string(),
            },
        };

        let (cert_file, key_file) = match (params.cert_file, params.key_file) {
            (Some(_), None) => {
                return Err(ConfigError::validation("missing private key file"));
            }
            (None, Some(_)) => {
                return Err(ConfigError::validation("missing certificate file"));
            }
            (cert, key) => (cert.map(PathBuf::from), key.map(PathBuf::from)),
        };

        if policy == SecurityPolicy::Basic256Sha256 && cert_file.is_none() {
            return Err(ConfigError::validation(
                "encrypted sessions require certificate and key files",
            ));
        }

        Ok(Self {
            policy,
            mode,
            identity,
            cert_file,
            key_file,
        })
    }

    /// Anonymous, unencrypted configuration.
    pub fn insecure() -> Self {
        Self {
            policy: SecurityPolicy::None,
            mode: SecurityMode::None,
            identity: UserIdentity::Anonymous,
            cert_file: None,
            key_file: None,
        }
    }
}
