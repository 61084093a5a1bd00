//! Composite-shape sub-translators: key/value maps, object lists, hash
//! digests, nested objects, and extension blocks.
//!
//! Embedded objects assert their scalar attributes inline (`has name "x"`)
//! rather than through generated variables; only the owner record's plain
//! properties need variables, since marking selectors can only address
//! those.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use smelter_core::registry::{FieldMapping, KeyValueSpec, NestedObjectSpec, ObjectListSpec};
use smelter_core::{ScalarValue, SchemaRegistry, SmelterResult, ValueKind};

use crate::fragment::Fragment;
use crate::value::{encode_scalar, quote_text};

use super::{dispatch_structural, suffix, unsupported};

/// Key/value map: one key node per entry, value attributes on it, one
/// fan-out relation linking all key nodes to the owner.
pub(crate) fn key_value(
    record_id: &str,
    field: &str,
    value: &Value,
    spec: &KeyValueSpec,
    owner_var: &str,
) -> SmelterResult<(Fragment, Vec<String>)> {
    let map = value
        .as_object()
        .ok_or_else(|| unsupported(record_id, field, value))?;

    let mut insert = String::from("\n");
    let mut key_vars = Vec::new();
    for (i, (key, entry)) in map.iter().enumerate() {
        let key_var = format!("${}{i}", spec.key_type);
        insert.push_str(&format!(
            " {key_var} isa {}; {key_var} {};\n",
            spec.key_type,
            quote_text(key)
        ));
        match entry {
            Value::Array(items) => {
                for item in items {
                    insert.push_str(&value_line(record_id, field, &key_var, spec, item)?);
                }
            }
            other => insert.push_str(&value_line(record_id, field, &key_var, spec, other)?),
        }
        key_vars.push(key_var);
    }

    insert.push_str(&format!(
        " ${} ({}:{owner_var}",
        spec.roles.relation, spec.roles.owner
    ));
    for key_var in &key_vars {
        insert.push_str(&format!(", {}:{key_var}", spec.roles.pointed));
    }
    insert.push_str(&format!(") isa {};\n", spec.roles.relation));

    Ok((
        Fragment {
            match_clause: String::new(),
            insert_clause: insert,
        },
        Vec::new(),
    ))
}

fn value_line(
    record_id: &str,
    field: &str,
    key_var: &str,
    spec: &KeyValueSpec,
    value: &Value,
) -> SmelterResult<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        _ => return Err(unsupported(record_id, field, value)),
    };
    Ok(format!(
        " {key_var} has {} {};\n",
        spec.value_attr,
        quote_text(&text)
    ))
}

/// Object list: one typed node per element, scalar attributes inline,
/// structural element fields recursed with the element index as positional
/// suffix, then one fan-out relation linking every element to the owner.
pub(crate) fn object_list(
    record_id: &str,
    field: &str,
    value: &Value,
    spec: &ObjectListSpec,
    owner_var: &str,
    registry: &SchemaRegistry,
    seq: &mut usize,
) -> SmelterResult<(Fragment, Vec<String>)> {
    let items = value
        .as_array()
        .ok_or_else(|| unsupported(record_id, field, value))?;

    let mut fragment = Fragment::new();
    let mut tail = Fragment::new();
    let mut deps = Vec::new();
    let mut element_vars = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let map = item
            .as_object()
            .ok_or_else(|| unsupported(record_id, field, item))?;
        let var = format!("${}{i}", spec.object);
        let (decl, item_tail, item_deps) = embedded_node(
            record_id,
            &spec.object,
            &var,
            &spec.fields,
            map,
            registry,
            seq,
            Some(i),
        )?;
        fragment.insert_clause.push_str(&decl);
        tail.append(item_tail);
        deps.extend(item_deps);
        element_vars.push(var);
    }

    fragment.insert_clause.push_str(&format!(
        "\n ${} ({}:{owner_var}",
        spec.roles.relation, spec.roles.owner
    ));
    for var in &element_vars {
        fragment
            .insert_clause
            .push_str(&format!(", {}:{var}", spec.roles.pointed));
    }
    fragment
        .insert_clause
        .push_str(&format!(") isa {};\n", spec.roles.relation));
    fragment.append(tail);

    Ok((fragment, deps))
}

/// Hash digest map, restricted to the registry's algorithm table.
///
/// Unknown algorithm names are reported and skipped; translation continues.
pub(crate) fn hashes(
    record_id: &str,
    field: &str,
    value: &Value,
    owner_var: &str,
    registry: &SchemaRegistry,
    inc: Option<usize>,
) -> SmelterResult<(Fragment, Vec<String>)> {
    let map = value
        .as_object()
        .ok_or_else(|| unsupported(record_id, field, value))?;
    let inc_add = suffix(inc);

    let mut insert = String::new();
    let mut hash_vars = Vec::new();
    for (i, (algorithm, digest)) in map.iter().enumerate() {
        let Some(hash_type) = registry.hash_algorithm(algorithm) else {
            warn!(record = record_id, algorithm, "unknown hash algorithm, entry skipped");
            continue;
        };
        let scalar = ScalarValue::coerce(record_id, field, digest, ValueKind::Auto)?;
        let var = format!("$hash{i}{inc_add}");
        insert.push_str(&format!(
            " {var} isa {hash_type}, has hash-value {};\n",
            encode_scalar(&scalar)
        ));
        hash_vars.push(var);
    }

    if hash_vars.is_empty() {
        return Ok((Fragment::new(), Vec::new()));
    }

    insert.push_str(&format!("\n $hash-rel{inc_add} (owner:{owner_var}"));
    for var in &hash_vars {
        insert.push_str(&format!(", pointed-to:{var}"));
    }
    insert.push_str(") isa hashes;\n");

    Ok((
        Fragment {
            match_clause: String::new(),
            insert_clause: insert,
        },
        Vec::new(),
    ))
}

/// One embedded object, recursively translated and related to the owner.
#[allow(clippy::too_many_arguments)]
pub(crate) fn nested_object(
    record_id: &str,
    field: &str,
    value: &Value,
    spec: &NestedObjectSpec,
    owner_var: &str,
    registry: &SchemaRegistry,
    seq: &mut usize,
    inc: Option<usize>,
) -> SmelterResult<(Fragment, Vec<String>)> {
    let map = value
        .as_object()
        .ok_or_else(|| unsupported(record_id, field, value))?;
    let inc_add = suffix(inc);
    let obj_var = format!("${}{inc_add}", spec.object);

    let (decl, tail, deps) =
        embedded_node(record_id, &spec.object, &obj_var, &spec.fields, map, registry, seq, inc)?;

    let mut fragment = Fragment::new();
    fragment.insert_clause.push_str(&decl);
    fragment.insert_clause.push_str(&format!(
        " ${}{inc_add} ({}:{owner_var}, {}:{obj_var}) isa {};\n",
        spec.roles.relation, spec.roles.owner, spec.roles.pointed, spec.roles.relation
    ));
    fragment.append(tail);

    Ok((fragment, deps))
}

/// Extension block: map from extension-kind name to nested object. Names
/// found in the registry translate via [`nested_object`]; unrecognized
/// names are reported and skipped.
pub(crate) fn extensions(
    record_id: &str,
    field: &str,
    value: &Value,
    owner_var: &str,
    registry: &SchemaRegistry,
    seq: &mut usize,
) -> SmelterResult<(Fragment, Vec<String>)> {
    let map = value
        .as_object()
        .ok_or_else(|| unsupported(record_id, field, value))?;

    let mut fragment = Fragment::new();
    let mut deps = Vec::new();
    for (name, ext_value) in map {
        match registry.extension(name) {
            Some(spec) => {
                let (ext_fragment, ext_deps) =
                    nested_object(record_id, name, ext_value, spec, owner_var, registry, seq, None)?;
                fragment.append(ext_fragment);
                deps.extend(ext_deps);
            }
            None => {
                warn!(record = record_id, extension = name.as_str(), "unrecognized extension, skipped");
            }
        }
    }

    Ok((fragment, deps))
}

/// Render one embedded node declaration: scalar attributes inline, in field
/// order, structural fields recursed with the node as owner.
#[allow(clippy::too_many_arguments)]
fn embedded_node(
    record_id: &str,
    object_type: &str,
    var: &str,
    fields: &BTreeMap<String, FieldMapping>,
    map: &Map<String, Value>,
    registry: &SchemaRegistry,
    seq: &mut usize,
    inc: Option<usize>,
) -> SmelterResult<(String, Fragment, Vec<String>)> {
    let mut decl = format!(" {var} isa {object_type}");
    let mut tail = Fragment::new();
    let mut deps = Vec::new();

    for (key, entry) in map {
        match fields.get(key) {
            Some(FieldMapping::Property(prop)) => {
                if prop.skip_false && entry == &Value::Bool(false) {
                    continue;
                }
                let values: Vec<&Value> = match entry {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for item in values {
                    let scalar = ScalarValue::coerce(record_id, key, item, prop.kind)?;
                    decl.push_str(&format!(
                        ",\n has {} {}",
                        prop.attr,
                        encode_scalar(&scalar)
                    ));
                }
            }
            Some(FieldMapping::Ignored) => {}
            Some(mapping) => {
                let (piece, piece_deps) = dispatch_structural(
                    record_id, key, entry, mapping, var, &[], registry, seq, inc,
                )?;
                tail.append(piece);
                deps.extend(piece_deps);
            }
            None => {
                warn!(record = record_id, field = key.as_str(), "embedded field not in registry, skipped");
            }
        }
    }
    decl.push_str(";\n");

    Ok((decl, tail, deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smelter_core::registry::RelationRoles;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin()
    }

    #[test]
    fn key_value_entries_become_key_nodes_with_value_attributes() {
        let spec = KeyValueSpec {
            roles: RelationRoles::new("additional-header"),
            key_type: "header-key".to_string(),
            value_attr: "header-value".to_string(),
        };
        let value = json!({"X-Mailer": "Outlook", "Received": ["hop-a", "hop-b"]});
        let (fragment, deps) =
            key_value("email-message--m", "additional_header_fields", &value, &spec, "$email-message")
                .unwrap();

        assert!(deps.is_empty());
        assert!(fragment.match_clause.is_empty());
        let insert = &fragment.insert_clause;
        assert!(insert.contains(" $header-key0 isa header-key; $header-key0 \"X-Mailer\";\n"));
        assert!(insert.contains(" $header-key0 has header-value \"Outlook\";\n"));
        assert!(insert.contains(" $header-key1 has header-value \"hop-a\";\n"));
        assert!(insert.contains(" $header-key1 has header-value \"hop-b\";\n"));
        assert!(insert.contains(
            " $additional-header (owner:$email-message, pointed-to:$header-key0, \
             pointed-to:$header-key1) isa additional-header;\n"
        ));
    }

    #[test]
    fn object_list_elements_carry_scalars_inline_and_recurse_structurals() {
        let registry = registry();
        let spec = registry.kind("indicator").unwrap();
        let Some(FieldMapping::ObjectList(list_spec)) = spec.fields.get("external_references")
        else {
            panic!("external_references should be an object list");
        };
        let value = json!([
            {"source_name": "veris", "external_id": "0001AA7F"},
            {"source_name": "capec", "hashes": {"SHA-256": "ef537f25c895bfa7"}}
        ]);
        let (fragment, deps) = object_list(
            "indicator--x",
            "external_references",
            &value,
            list_spec,
            "$indicator",
            &registry,
            &mut 0,
        )
        .unwrap();

        assert!(deps.is_empty());
        let insert = &fragment.insert_clause;
        assert!(insert.contains(
            " $external-reference0 isa external-reference,\n \
             has source-name \"veris\",\n \
             has external-id \"0001AA7F\";\n"
        ));
        assert!(insert.contains(
            " $external-references (owner:$indicator, pointed-to:$external-reference0, \
             pointed-to:$external-reference1) isa external-references;\n"
        ));
        // The second element's digest node renders after the fan-out, with
        // the element index keeping its variables distinct.
        let fan_out = insert.find("isa external-references;").unwrap();
        let digest = insert.find("isa sha-256").unwrap();
        assert!(digest > fan_out);
        assert!(insert.contains(" $hash01 isa sha-256, has hash-value \"ef537f25c895bfa7\";\n"));
        assert!(insert.contains(" $hash-rel1 (owner:$external-reference1, pointed-to:$hash01) isa hashes;\n"));
    }

    #[test]
    fn unrecognized_extensions_are_skipped() {
        let registry = registry();
        let value = json!({"x-vendor-ext": {"anything": 1}});
        let (fragment, deps) =
            extensions("file--f", "extensions", &value, "$file", &registry, &mut 0).unwrap();
        assert!(fragment.is_empty());
        assert!(deps.is_empty());
    }

    #[test]
    fn archive_extension_renders_as_a_nested_object() {
        let registry = registry();
        let value = json!({"archive-ext": {"contains_refs": ["file--11111111-aaaa-bbbb-cccc-111111111111"]}});
        let (fragment, deps) =
            extensions("file--f", "extensions", &value, "$file", &registry, &mut 0).unwrap();

        assert_eq!(deps, vec!["file--11111111-aaaa-bbbb-cccc-111111111111"]);
        assert!(fragment.match_clause.contains("has stix-id \"file--11111111-aaaa-bbbb-cccc-111111111111\""));
        assert!(fragment.insert_clause.contains("isa archive-ext"));
    }
}
