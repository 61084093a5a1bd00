//! Plain property translation: attribute clauses plus value assertions.

use serde_json::Value;

use smelter_core::registry::PropertySpec;
use smelter_core::{ScalarValue, SmelterResult};

use crate::fragment::VariableBinding;
use crate::value::encode_scalar;

pub(crate) struct PropertyPiece {
    /// `,\n has <attr> $var` clauses appended to the owner declaration.
    pub decl: String,
    /// `\n $var <literal>;` assertions appended after the declaration.
    pub values: String,
    pub bindings: Vec<VariableBinding>,
}

/// Translate one schema-mapped property occurrence.
///
/// Multi-valued fields get one generated variable per element
/// (`$<field><i>`); single values reuse the attribute name (`$<attr>`).
/// Booleans with an implicit `false` default are omitted entirely when
/// equal to that default.
pub(crate) fn translate_property(
    record_id: &str,
    field: &str,
    value: &Value,
    spec: &PropertySpec,
) -> SmelterResult<PropertyPiece> {
    let mut piece = PropertyPiece {
        decl: String::new(),
        values: String::new(),
        bindings: Vec::new(),
    };

    if spec.skip_false && value == &Value::Bool(false) {
        return Ok(piece);
    }

    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let scalar = ScalarValue::coerce(record_id, field, item, spec.kind)?;
                let var = format!("${field}{i}");
                piece.decl.push_str(&format!(",\n has {} {var}", spec.attr));
                piece
                    .values
                    .push_str(&format!("\n {var} {};", encode_scalar(&scalar)));
                piece.bindings.push(VariableBinding {
                    field: field.to_string(),
                    index: Some(i),
                    var,
                });
            }
        }
        single => {
            let scalar = ScalarValue::coerce(record_id, field, single, spec.kind)?;
            let var = format!("${}", spec.attr);
            piece.decl.push_str(&format!(",\n has {} {var}", spec.attr));
            piece
                .values
                .push_str(&format!("\n {var} {};", encode_scalar(&scalar)));
            piece.bindings.push(VariableBinding {
                field: field.to_string(),
                index: None,
                var,
            });
        }
    }

    Ok(piece)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smelter_core::ValueKind;

    fn spec(attr: &str) -> PropertySpec {
        PropertySpec {
            attr: attr.to_string(),
            kind: ValueKind::Auto,
            skip_false: false,
        }
    }

    #[test]
    fn single_value_uses_the_attribute_name_as_variable() {
        let piece =
            translate_property("indicator--x", "pattern", &json!("[a:b = 'c']"), &spec("pattern"))
                .unwrap();
        assert_eq!(piece.decl, ",\n has pattern $pattern");
        assert_eq!(piece.values, "\n $pattern \"[a:b = 'c']\";");
        assert_eq!(piece.bindings.len(), 1);
        assert_eq!(piece.bindings[0].index, None);
    }

    #[test]
    fn list_values_get_positional_variables() {
        let piece = translate_property(
            "indicator--x",
            "indicator_types",
            &json!(["malicious-activity", "anomalous-activity"]),
            &spec("indicator-type"),
        )
        .unwrap();
        assert_eq!(
            piece.decl,
            ",\n has indicator-type $indicator_types0,\n has indicator-type $indicator_types1"
        );
        assert_eq!(
            piece.values,
            "\n $indicator_types0 \"malicious-activity\";\n $indicator_types1 \"anomalous-activity\";"
        );
        assert_eq!(piece.bindings[1].index, Some(1));
    }

    #[test]
    fn implicit_false_booleans_are_omitted() {
        let mut revoked = spec("revoked");
        revoked.skip_false = true;
        let piece =
            translate_property("indicator--x", "revoked", &json!(false), &revoked).unwrap();
        assert!(piece.decl.is_empty());
        assert!(piece.values.is_empty());
        assert!(piece.bindings.is_empty());

        let piece = translate_property("indicator--x", "revoked", &json!(true), &revoked).unwrap();
        assert_eq!(piece.decl, ",\n has revoked $revoked");
        assert_eq!(piece.values, "\n $revoked true;");
    }
}
