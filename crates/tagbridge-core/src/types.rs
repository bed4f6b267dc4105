// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for tagbridge.
//!
//! This module provides the protocol-facing identity and value types shared
//! by every component of the bridge.

use std::fmt;
use std::hash::Hash;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

// =============================================================================
// Node identity
// =============================================================================

/// The identifier part of an upstream node address.
///
/// Upstream servers address nodes either by string name or by numeric id.
/// Both JSON forms are accepted on the wire: `"the.answer"` and `2345`.
/// Numeric identifiers must be whole and fit in `u32`; anything else is
/// rejected at deserialization time.
///
/// # Examples
///
/// ```
/// use tagbridge_core::types::NodeIdentifier;
///
/// let named: NodeIdentifier = serde_json::from_str("\"the.answer\"").unwrap();
/// assert_eq!(named.to_string(), "the.answer");
///
/// let numeric: NodeIdentifier = serde_json::from_str("2345").unwrap();
/// assert_eq!(numeric.to_string(), "2345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum NodeIdentifier {
    /// String identifier.
    String(String),

    /// Numeric identifier.
    Numeric(u32),
}

impl NodeIdentifier {
    /// Creates a string identifier.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Creates a numeric identifier.
    #[inline]
    pub fn numeric(n: u32) -> Self {
        Self::Numeric(n)
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdentifier::String(s) => write!(f, "{}", s),
            NodeIdentifier::Numeric(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for NodeIdentifier {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<u32> for NodeIdentifier {
    fn from(n: u32) -> Self {
        Self::Numeric(n)
    }
}

impl<'de> Deserialize<'de> for NodeIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // serde_json parses any JSON number as f64/i64/u64 depending on
        // shape. Only non-negative whole numbers within u32 are valid
        // identifiers; `42.5` and `-5` must fail rather than truncate.
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::String(s) => Ok(NodeIdentifier::String(s)),
            serde_json::Value::Number(n) => {
                let id = n
                    .as_u64()
                    .filter(|v| *v <= u64::from(u32::MAX))
                    .ok_or_else(|| {
                        de::Error::custom(format!(
                            "numeric node identifier must be a whole number in [0, {}], got {}",
                            u32::MAX,
                            n
                        ))
                    })?;
                Ok(NodeIdentifier::Numeric(id as u32))
            }
            other => Err(de::Error::custom(format!(
                "node identifier must be a string or number, got {}",
                other
            ))),
        }
    }
}

/// The full identity of an upstream tag: namespace URI plus node identifier.
///
/// Tag keys are the unit of monitoring, storage and refcounting throughout
/// the bridge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagKey {
    /// Namespace URI of the owning address space.
    pub namespace_uri: String,

    /// Identifier within the namespace.
    pub identifier: NodeIdentifier,
}

impl TagKey {
    /// Creates a new tag key.
    pub fn new(namespace_uri: impl Into<String>, identifier: impl Into<NodeIdentifier>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            identifier: identifier.into(),
        }
    }

    /// Returns the identifier rendered without the namespace.
    ///
    /// This is the default field name in publications and query responses.
    pub fn short_id(&self) -> String {
        self.identifier.to_string()
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace_uri, self.identifier)
    }
}

// =============================================================================
// Values and samples
// =============================================================================

/// A data value observed on an upstream tag.
///
/// The variant set mirrors what the query and publication surfaces can
/// render. Wider upstream types are narrowed by the transport layer before
/// they reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value.
    Bool(bool),

    /// Signed integer.
    Int(i64),

    /// Unsigned integer.
    UInt(u64),

    /// Floating point value.
    Float(f64),

    /// UTF-8 string.
    Text(String),

    /// Raw byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the type name of this value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Returns the boolean value, if this is a `Bool`.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer that fits.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string value, if this is `Text`.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Renders this value as a plain JSON value for query and publication
    /// payloads.
    ///
    /// Byte strings become base64; everything else maps to its native JSON
    /// form.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagbridge_core::types::Value;
    ///
    /// let v = Value::Bytes(b"test123".to_vec());
    /// assert_eq!(v.to_json(), serde_json::json!("dGVzdDEyMw=="));
    /// assert_eq!(Value::Int(42).to_json(), serde_json::json!(42));
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Quality of an observed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// The value is trustworthy.
    Good,

    /// The upstream flagged the value as bad or stale.
    Bad,
}

impl Quality {
    /// Returns `true` if the quality is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        matches!(self, Quality::Good)
    }
}

/// A single observed value with quality and source timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// The observed value.
    pub value: Value,

    /// Quality flag from the upstream.
    pub quality: Quality,

    /// Source timestamp reported by the upstream.
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Creates a good-quality sample.
    pub fn good(value: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            quality: Quality::Good,
            timestamp,
        }
    }

    /// Creates a bad-quality sample.
    pub fn bad(value: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            quality: Quality::Bad,
            timestamp,
        }
    }
}

// =============================================================================
// Resolved tags
// =============================================================================

/// A tag after resolution: a display name bound to its upstream key.
///
/// The name defaults to the key's short identifier when the configuration
/// does not override it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTag {
    /// Field name used in publications and query responses.
    pub name: String,

    /// Upstream identity.
    pub key: TagKey,
}

impl ResolvedTag {
    /// Creates a resolved tag with an explicit name.
    pub fn named(name: impl Into<String>, key: TagKey) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Creates a resolved tag named after the key's short identifier.
    pub fn from_key(key: TagKey) -> Self {
        Self {
            name: key.short_id(),
            key,
        }
    }
}

/// An ordered, deduplicated set of resolved tags.
///
/// Declaration order is significant: it is the field order for query
/// responses, line-protocol output and publications. Duplicate keys keep
/// their first position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    tags: Vec<ResolvedTag>,
}

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tag, keeping the first occurrence of a duplicate key.
    ///
    /// Returns `true` if the tag was inserted.
    pub fn push(&mut self, tag: ResolvedTag) -> bool {
        if self.tags.iter().any(|t| t.key == tag.key) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Returns the tags in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedTag> {
        self.tags.iter()
    }

    /// The resolved tags in declared order.
    pub fn tags(&self) -> &[ResolvedTag] {
        &self.tags
    }

    /// Returns the keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &TagKey> {
        self.tags.iter().map(|t| &t.key)
    }

    /// Returns the tag bound to `key`, if present.
    pub fn get(&self, key: &TagKey) -> Option<&ResolvedTag> {
        self.tags.iter().find(|t| &t.key == key)
    }

    /// Returns `true` if the set contains `key`.
    pub fn contains(&self, key: &TagKey) -> bool {
        self.tags.iter().any(|t| &t.key == key)
    }

    /// Number of tags in the set.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Merges another set into this one, preserving first-seen order.
    pub fn extend(&mut self, other: TagSet) {
        for tag in other.tags {
            self.push(tag);
        }
    }
}

impl FromIterator<ResolvedTag> for TagSet {
    fn from_iter<I: IntoIterator<Item = ResolvedTag>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.push(tag);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a ResolvedTag;
    type IntoIter = std::slice::Iter<'a, ResolvedTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

// =============================================================================
// Connection state
// =============================================================================

/// Connection state of the upstream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected, no attempt in progress.
    Disconnected,

    /// Connection attempt in progress.
    Connecting,

    /// Session established, monitors active.
    Connected,

    /// Connection lost, reconnect loop running.
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` when the session is usable.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        write!(f, "{}", s)
    }
}
