use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SmelterError;

/// The closed set of scalar kinds with a TypeQL literal form.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Real(f64),
    Timestamp(NaiveDateTime),
}

/// Per-attribute value kind hint carried by the schema registry.
///
/// STIX timestamps arrive as JSON strings; the registry tags the attributes
/// that must be coerced into datetime literals instead of quoted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Infer from the JSON type: string, bool, or number.
    #[default]
    Auto,
    Timestamp,
}

impl ScalarValue {
    /// Coerce one JSON value into a scalar, guided by the registry hint.
    ///
    /// Anything without a literal form (objects, arrays, nulls, malformed
    /// timestamps) is a fatal unsupported-value error for the record.
    pub fn coerce(
        record_id: &str,
        field: &str,
        value: &Value,
        kind: ValueKind,
    ) -> Result<Self, SmelterError> {
        let unsupported = || SmelterError::UnsupportedValue {
            id: record_id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        };

        match kind {
            ValueKind::Timestamp => {
                let text = value.as_str().ok_or_else(unsupported)?;
                parse_timestamp(text)
                    .map(ScalarValue::Timestamp)
                    .ok_or_else(unsupported)
            }
            ValueKind::Auto => match value {
                Value::String(s) => Ok(ScalarValue::Text(s.clone())),
                Value::Bool(b) => Ok(ScalarValue::Bool(*b)),
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Ok(ScalarValue::Int(i))
                    } else if let Some(f) = n.as_f64() {
                        Ok(ScalarValue::Real(f))
                    } else {
                        Err(unsupported())
                    }
                }
                _ => Err(unsupported()),
            },
        }
    }
}

/// Parse a STIX timestamp string (RFC 3339, `Z` or offset, optional
/// fractional seconds) into a naive UTC datetime.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!("hello"), ValueKind::Auto => ScalarValue::Text("hello".into()); "text")]
    #[test_case(json!(true), ValueKind::Auto => ScalarValue::Bool(true); "bool")]
    #[test_case(json!(42), ValueKind::Auto => ScalarValue::Int(42); "int")]
    #[test_case(json!(2.5), ValueKind::Auto => ScalarValue::Real(2.5); "real")]
    fn coerce_auto(value: Value, kind: ValueKind) -> ScalarValue {
        ScalarValue::coerce("indicator--x", "field", &value, kind).unwrap()
    }

    #[test]
    fn coerce_timestamp_accepts_rfc3339_with_zulu() {
        let scalar = ScalarValue::coerce(
            "indicator--x",
            "valid_from",
            &json!("2016-01-01T00:00:00Z"),
            ValueKind::Timestamp,
        )
        .unwrap();
        assert!(matches!(scalar, ScalarValue::Timestamp(_)));
    }

    #[test]
    fn coerce_rejects_composites() {
        let err = ScalarValue::coerce("indicator--x", "field", &json!({"a": 1}), ValueKind::Auto)
            .unwrap_err();
        assert!(matches!(err, SmelterError::UnsupportedValue { .. }));
    }

    #[test]
    fn coerce_rejects_malformed_timestamps() {
        let err = ScalarValue::coerce(
            "indicator--x",
            "created",
            &json!("not a date"),
            ValueKind::Timestamp,
        )
        .unwrap_err();
        assert!(matches!(err, SmelterError::UnsupportedValue { .. }));
    }
}
