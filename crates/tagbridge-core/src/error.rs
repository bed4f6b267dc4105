// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for tagbridge.
//!
//! # Error Hierarchy
//!
//! ```text
//! BridgeError (root)
//! ├── ConfigError    - Configuration loading and validation
//! ├── ResolveError   - Tag resolution (browse, cycles, depth)
//! ├── UpstreamError  - Upstream session and monitoring
//! ├── RegistryError  - Channel specs and subscription bookkeeping
//! ├── RenderError    - Payload rendering
//! └── ApiError       - HTTP query surface
//! ```
//!
//! # Examples
//!
//! ```
//! use tagbridge_core::error::{BridgeError, UpstreamError};
//! use std::time::Duration;
//!
//! let error = UpstreamError::timeout("read", Duration::from_secs(5));
//! assert!(error.is_retryable());
//!
//! let root: BridgeError = error.into();
//! assert_eq!(root.error_type(), "upstream");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// BridgeError - Root Error Type
// =============================================================================

/// The root error type for tagbridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tag resolution error.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Upstream session error.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Subscription registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Payload rendering error.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// API error.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl BridgeError {
    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Upstream(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error type as a string for logging and metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "config",
            BridgeError::Resolve(_) => "resolve",
            BridgeError::Upstream(_) => "upstream",
            BridgeError::Registry(_) => "registry",
            BridgeError::Render(_) => "render",
            BridgeError::Api(_) => "api",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Config(_) => 400,
            BridgeError::Resolve(_) => 500,
            BridgeError::Upstream(_) => 503,
            BridgeError::Registry(e) => e.status_code(),
            BridgeError::Render(_) => 500,
            BridgeError::Api(e) => e.status_code(),
        }
    }
}

/// Result alias using [`BridgeError`].
pub type BridgeResult<T> = Result<T, BridgeError>;

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read config file {path}: {reason}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Configuration could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Configuration failed validation.
    #[error("Invalid config: {0}")]
    Validation(String),

    /// Config service fetch failed.
    #[error("Config fetch from {url} failed: {reason}")]
    Fetch {
        /// Config service URL.
        url: String,
        /// Underlying reason.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    /// Creates a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Creates a fetch error.
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// ResolveError
// =============================================================================

/// Tag resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A container expansion revisited a node already on the active path.
    #[error("Cyclic reference while expanding container {node}")]
    CyclicReference {
        /// Node where the cycle closed.
        node: String,
    },

    /// Expansion exceeded the configured depth limit.
    #[error("Resolution depth exceeded at {node} (max {max_depth})")]
    DepthExceeded {
        /// Node where the limit was hit.
        node: String,
        /// Configured maximum depth.
        max_depth: usize,
    },

    /// The configured namespace URI is not exported by the upstream.
    #[error("Namespace not found: {uri}")]
    NamespaceNotFound {
        /// Missing namespace URI.
        uri: String,
    },

    /// Browsing a container failed.
    #[error("Browse of {node} failed: {reason}")]
    Browse {
        /// Node that failed to browse.
        node: String,
        /// Underlying reason.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a cyclic reference error.
    pub fn cyclic_reference(node: impl Into<String>) -> Self {
        Self::CyclicReference { node: node.into() }
    }

    /// Creates a depth exceeded error.
    pub fn depth_exceeded(node: impl Into<String>, max_depth: usize) -> Self {
        Self::DepthExceeded {
            node: node.into(),
            max_depth,
        }
    }

    /// Creates a namespace not found error.
    pub fn namespace_not_found(uri: impl Into<String>) -> Self {
        Self::NamespaceNotFound { uri: uri.into() }
    }

    /// Creates a browse error.
    pub fn browse(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Browse {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias using [`ResolveError`].
pub type ResolveResult<T> = Result<T, ResolveError>;

// =============================================================================
// UpstreamError
// =============================================================================

/// Upstream session and monitoring errors.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream endpoint could not be reached.
    #[error("Upstream unavailable: {reason}")]
    Unavailable {
        /// Underlying reason.
        reason: String,
    },

    /// An upstream call did not complete within its deadline.
    #[error("Upstream {operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// Deadline that expired.
        timeout: Duration,
    },

    /// An operation was attempted without an established session.
    #[error("Not connected to upstream")]
    NotConnected,

    /// Registering or removing a monitored item failed.
    #[error("Monitor operation on {tag} failed: {reason}")]
    Monitor {
        /// Tag involved.
        tag: String,
        /// Underlying reason.
        reason: String,
    },

    /// A session call failed for a protocol-level reason.
    #[error("Upstream {operation} failed: {reason}")]
    Call {
        /// Operation that failed.
        operation: String,
        /// Underlying reason.
        reason: String,
    },

    /// The notification stream was already taken by another consumer.
    #[error("Notification stream already taken")]
    StreamTaken,
}

impl UpstreamError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Creates a monitor error.
    pub fn monitor(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Monitor {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Creates a generic call error.
    pub fn call(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Call {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Unavailable { .. }
                | UpstreamError::Timeout { .. }
                | UpstreamError::NotConnected
        )
    }
}

/// Result alias using [`UpstreamError`].
pub type UpstreamResult<T> = Result<T, UpstreamError>;

// =============================================================================
// RegistryError
// =============================================================================

/// Channel spec and subscription registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A channel spec could not be parsed.
    #[error("Invalid channel spec '{spec}': {reason}")]
    InvalidChannelSpec {
        /// Offending spec string.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Unsubscribe was called for a channel with no active subscription.
    #[error("Not subscribed to channel '{spec}'")]
    NotSubscribed {
        /// Channel spec with no subscription.
        spec: String,
    },

    /// A data subscription resolved to no tags.
    #[error("Channel '{spec}' resolves to an empty tag set")]
    EmptyTagSet {
        /// Channel spec.
        spec: String,
    },

    /// The registry is shutting down and refuses new work.
    #[error("Registry is shut down")]
    ShutDown,
}

impl RegistryError {
    /// Creates an invalid channel spec error.
    pub fn invalid_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChannelSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-subscribed error.
    pub fn not_subscribed(spec: impl Into<String>) -> Self {
        Self::NotSubscribed { spec: spec.into() }
    }

    /// Creates an empty tag set error.
    pub fn empty_tag_set(spec: impl Into<String>) -> Self {
        Self::EmptyTagSet { spec: spec.into() }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::InvalidChannelSpec { .. } => 400,
            RegistryError::NotSubscribed { .. } => 404,
            RegistryError::EmptyTagSet { .. } => 400,
            RegistryError::ShutDown => 503,
        }
    }
}

/// Result alias using [`RegistryError`].
pub type RegistryResult<T> = Result<T, RegistryError>;

// =============================================================================
// RenderError
// =============================================================================

/// Payload rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The value type cannot be rendered on the requested surface.
    #[error("Unsupported payload type '{type_name}' for field '{field}'")]
    UnsupportedPayload {
        /// Field being rendered.
        field: String,
        /// Type that cannot be rendered.
        type_name: &'static str,
    },

    /// A float field was NaN or infinite.
    #[error("Non-finite float in field '{field}'")]
    NonFiniteFloat {
        /// Field being rendered.
        field: String,
    },
}

impl RenderError {
    /// Creates an unsupported payload error.
    pub fn unsupported(field: impl Into<String>, type_name: &'static str) -> Self {
        Self::UnsupportedPayload {
            field: field.into(),
            type_name,
        }
    }

    /// Creates a non-finite float error.
    pub fn non_finite(field: impl Into<String>) -> Self {
        Self::NonFiniteFloat {
            field: field.into(),
        }
    }
}

/// Result alias using [`RenderError`].
pub type RenderResult<T> = Result<T, RenderError>;

// =============================================================================
// ApiError
// =============================================================================

/// HTTP query surface errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query parameter was missing or malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The bridge is degraded and cannot serve the request.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Creates a bad request error.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Creates an internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unavailable(_) => 503,
            ApiError::Internal(_) => 500,
        }
    }
}

/// Result alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;
