// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data payload rendering.
//!
//! Fields are rendered in the subscription's declared tag order. A tag
//! with no sample yet is omitted, and a field that cannot be rendered
//! (a non-finite float) drops that field only, never the publication.

use serde_json::Map;
use tracing::warn;

use tagbridge_core::error::{RenderError, RenderResult};
use tagbridge_core::store::Snapshot;
use tagbridge_core::types::{TagSet, Value};

/// Renders one value for a named field.
pub fn render_value(field: &str, value: &Value) -> RenderResult<serde_json::Value> {
    if let Value::Float(f) = value {
        if !f.is_finite() {
            return Err(RenderError::non_finite(field));
        }
    }
    Ok(value.to_json())
}

/// Renders a snapshot into ordered publication fields.
pub fn data_fields(tag_set: &TagSet, snapshot: &Snapshot) -> Map<String, serde_json::Value> {
    let mut fields = Map::new();
    for tag in tag_set {
        let Some(sample) = snapshot.get(&tag.key) else {
            continue;
        };
        match render_value(&tag.name, &sample.value) {
            Ok(v) => {
                fields.insert(tag.name.clone(), v);
            }
            Err(e) => {
                warn!(field = %tag.name, error = %e, "Dropping unrenderable field");
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tagbridge_core::store::ValueStore;
    use tagbridge_core::types::{ResolvedTag, Sample, TagKey};

    fn key(id: &str) -> TagKey {
        TagKey::new("urn:test", id)
    }

    fn tag_set(ids: &[&str]) -> TagSet {
        ids.iter()
            .map(|id| ResolvedTag::from_key(key(id)))
            .collect()
    }

    #[test]
    fn fields_follow_declared_order_not_store_order() {
        let store = ValueStore::new();
        store.update(key("b"), Sample::good(Value::Int(2), Utc::now()));
        store.update(key("a"), Sample::good(Value::Int(1), Utc::now()));

        let tags = tag_set(&["a", "b"]);
        let keys: Vec<_> = tags.keys().cloned().collect();
        let fields = data_fields(&tags, &store.snapshot(Some(&keys)));

        let names: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_tags_are_omitted() {
        let store = ValueStore::new();
        store.update(key("a"), Sample::good(Value::Bool(true), Utc::now()));

        let tags = tag_set(&["a", "never-seen"]);
        let keys: Vec<_> = tags.keys().cloned().collect();
        let fields = data_fields(&tags, &store.snapshot(Some(&keys)));

        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("a"));
    }

    #[test]
    fn non_finite_float_drops_the_field_only() {
        let store = ValueStore::new();
        store.update(key("bad"), Sample::good(Value::Float(f64::NAN), Utc::now()));
        store.update(key("good"), Sample::good(Value::Float(1.5), Utc::now()));

        let tags = tag_set(&["bad", "good"]);
        let keys: Vec<_> = tags.keys().cloned().collect();
        let fields = data_fields(&tags, &store.snapshot(Some(&keys)));

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["good"], serde_json::json!(1.5));
    }

    #[test]
    fn bytes_render_as_base64() {
        let store = ValueStore::new();
        store.update(
            key("blob"),
            Sample::good(Value::Bytes(b"test123".to_vec()), Utc::now()),
        );

        let tags = tag_set(&["blob"]);
        let keys: Vec<_> = tags.keys().cloned().collect();
        let fields = data_fields(&tags, &store.snapshot(Some(&keys)));
        assert_eq!(fields["blob"], serde_json::json!("dGVzdDEyMw=="));
    }
}
