use serde_json::{Map, Value};

use crate::error::SmelterError;
use crate::id::StixId;

/// One STIX object, viewed as an ordered field map.
///
/// Parsing and validation of STIX semantics belong to whatever produced the
/// JSON; this type only enforces the structural minimum translation needs:
/// an object with a `type` tag and an `id` whose prefix equals that type.
///
/// Field order is preserved (serde_json's `preserve_order` feature), which is
/// what makes generated variable numbering deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: String,
    id: StixId,
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from one parsed JSON object.
    pub fn from_value(value: Value) -> Result<Self, SmelterError> {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(SmelterError::MalformedBatch(format!(
                    "expected a JSON object, got {other}"
                )))
            }
        };

        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SmelterError::MalformedBatch("record has no `type` field".to_string()))?
            .to_string();
        let raw_id = fields
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SmelterError::MalformedBatch("record has no `id` field".to_string()))?;

        let id = StixId::parse(raw_id)?;
        if id.kind() != kind {
            return Err(SmelterError::InvalidId {
                id: id.to_string(),
                reason: format!("id prefix does not match record kind `{kind}`"),
            });
        }

        Ok(Self { kind, id, fields })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &StixId {
        &self.id
    }

    /// All fields in their original order, `type` and `id` included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Flatten batch input into individual records.
///
/// Accepts a single object, a flat list of objects, or a `bundle` container
/// (its `objects` array is unpacked; the bundle itself is not stored).
pub fn gather_records(input: Value) -> Result<Vec<Record>, SmelterError> {
    match input {
        Value::Array(items) => items.into_iter().map(Record::from_value).collect(),
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("bundle") {
                match map.get("objects") {
                    Some(Value::Array(items)) => {
                        items.iter().cloned().map(Record::from_value).collect()
                    }
                    Some(other) => Err(SmelterError::MalformedBatch(format!(
                        "bundle `objects` is not an array: {other}"
                    ))),
                    None => Ok(Vec::new()),
                }
            } else {
                Ok(vec![Record::from_value(Value::Object(map))?])
            }
        }
        other => Err(SmelterError::MalformedBatch(format!(
            "expected an object, a list, or a bundle, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn indicator() -> Value {
        json!({
            "type": "indicator",
            "spec_version": "2.1",
            "id": "indicator--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f",
            "pattern": "[ipv4-addr:value = '1.2.3.4']"
        })
    }

    #[test]
    fn from_value_keeps_field_order() {
        let record = Record::from_value(indicator()).unwrap();
        let order: Vec<&String> = record.fields().keys().collect();
        assert_eq!(order, vec!["type", "spec_version", "id", "pattern"]);
    }

    #[test]
    fn mismatched_id_prefix_is_rejected() {
        let mut value = indicator();
        value["id"] = json!("malware--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f");
        assert!(matches!(
            Record::from_value(value),
            Err(SmelterError::InvalidId { .. })
        ));
    }

    #[test]
    fn gather_unpacks_bundles() {
        let bundle = json!({
            "type": "bundle",
            "id": "bundle--0a524a45-3c3b-42e6-9f9d-c85c4e28d51e",
            "objects": [indicator()]
        });
        let records = gather_records(bundle).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), "indicator");
    }

    #[test]
    fn gather_accepts_flat_lists_and_single_objects() {
        assert_eq!(gather_records(json!([indicator()])).unwrap().len(), 1);
        assert_eq!(gather_records(indicator()).unwrap().len(), 1);
        assert!(gather_records(json!("not a record")).is_err());
    }
}
