// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! InfluxDB line protocol rendering.
//!
//! One store snapshot renders as one line:
//!
//! ```text
//! measurement,tag=value field=1,other="text" 1700000000000000000\n
//! ```
//!
//! Tags are sorted by key; fields keep the declared tag order. Integers
//! and floats render unquoted, booleans bare, strings double-quoted, and
//! byte strings as their decoded raw form double-quoted (the JSON surface
//! uses base64 instead). A field that cannot be rendered, such as a
//! non-finite float, is dropped from the line without failing the request.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use tracing::warn;

use tagbridge_core::error::{RenderError, RenderResult};
use tagbridge_core::types::Value;

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ").replace('=', "\\=")
}

fn escape_string_field(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders one field value.
pub fn field_value(field: &str, value: &Value) -> RenderResult<String> {
    match value {
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::UInt(u) => Ok(u.to_string()),
        Value::Float(f) if f.is_finite() => Ok(f.to_string()),
        Value::Float(_) => Err(RenderError::non_finite(field)),
        Value::Text(s) => Ok(format!("\"{}\"", escape_string_field(s))),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Ok(format!("\"{}\"", escape_string_field(s))),
            Err(_) => Err(RenderError::unsupported(field, "bytes")),
        },
    }
}

/// Builds a complete line, trailing newline included.
///
/// `fields` must already be in the desired order; `tags` are sorted here.
pub fn build_line(
    measurement: &str,
    tags: &[(String, String)],
    fields: &[(String, Value)],
    timestamp: DateTime<Utc>,
) -> String {
    let mut line = escape_measurement(measurement);

    let mut sorted_tags: Vec<_> = tags.to_vec();
    sorted_tags.sort_by(|a, b| a.0.cmp(&b.0));
    for (k, v) in &sorted_tags {
        let _ = write!(line, ",{}={}", escape_tag(k), escape_tag(v));
    }

    line.push(' ');
    let mut first = true;
    for (name, value) in fields {
        match field_value(name, value) {
            Ok(rendered) => {
                if !first {
                    line.push(',');
                }
                let _ = write!(line, "{}={}", escape_tag(name), rendered);
                first = false;
            }
            Err(e) => {
                warn!(field = %name, error = %e, "Dropping unrenderable metric field");
            }
        }
    }

    let nanos = timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| timestamp.timestamp_micros().saturating_mul(1_000));
    let _ = write!(line, " {}\n", nanos);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 123).unwrap()
    }

    #[test]
    fn reference_line_renders_exactly() {
        let fields = vec![
            ("2994".to_string(), Value::Bool(false)),
            ("2263".to_string(), Value::Text("open62541".into())),
            ("the.answer".to_string(), Value::Int(42)),
            ("myByteString".to_string(), Value::Bytes(b"test123".to_vec())),
        ];
        let tags = vec![("tag".to_string(), "value".to_string())];

        let line = build_line("testing", &tags, &fields, ts());
        assert_eq!(
            line,
            format!(
                "testing,tag=value 2994=false,2263=\"open62541\",the.answer=42,myByteString=\"test123\" {}\n",
                1_700_000_000_000_000_123i64
            )
        );
    }

    #[test]
    fn tags_are_sorted_by_key() {
        let fields = vec![("f".to_string(), Value::Int(1))];
        let tags = vec![
            ("zone".to_string(), "b".to_string()),
            ("area".to_string(), "a".to_string()),
        ];
        let line = build_line("m", &tags, &fields, ts());
        assert!(line.starts_with("m,area=a,zone=b "));
    }

    #[test]
    fn non_finite_float_is_dropped_from_the_line() {
        let fields = vec![
            ("bad".to_string(), Value::Float(f64::INFINITY)),
            ("good".to_string(), Value::Float(2.5)),
        ];
        let line = build_line("m", &[], &fields, ts());
        assert!(line.starts_with("m good=2.5 "));
    }

    #[test]
    fn string_fields_escape_quotes_and_backslashes() {
        let fields = vec![("s".to_string(), Value::Text(r#"say "hi" \now"#.into()))];
        let line = build_line("m", &[], &fields, ts());
        assert!(line.contains(r#"s="say \"hi\" \\now""#));
    }

    #[test]
    fn special_characters_in_names_are_escaped() {
        let fields = vec![("f".to_string(), Value::Int(1))];
        let tags = vec![("ta g".to_string(), "v,1".to_string())];
        let line = build_line("my measurement", &tags, &fields, ts());
        assert!(line.starts_with("my\\ measurement,ta\\ g=v\\,1 f=1 "));
    }

    #[test]
    fn non_utf8_bytes_are_dropped() {
        let fields = vec![
            ("blob".to_string(), Value::Bytes(vec![0xff, 0xfe])),
            ("ok".to_string(), Value::Int(1)),
        ];
        let line = build_line("m", &[], &fields, ts());
        assert!(line.starts_with("m ok=1 "));
    }
}
