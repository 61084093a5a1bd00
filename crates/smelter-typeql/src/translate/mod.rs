//! The object translator: one record in, one dependency descriptor out.
//!
//! Orchestrates the structural sub-translators in [`composite`] and [`refs`]
//! plus the plain-property translator in [`property`]. All of it is pure:
//! the only inputs are the record, the registry, and (for sub-translators)
//! the variable bindings accumulated earlier in the same record.

mod composite;
mod property;
mod refs;

use serde_json::Value;
use tracing::warn;

use smelter_core::registry::FieldMapping;
use smelter_core::{Record, SchemaRegistry, SmelterError, SmelterResult, StixId};

use crate::fragment::{DependencyDescriptor, Fragment, VariableBinding};
use crate::value::quote_text;

/// Compile one record into its match/insert fragment pair and raw
/// dependency list.
///
/// Fails on an unknown kind, an unsupported property value, or an
/// unresolvable marking selector; every error carries the record id.
pub fn translate(
    record: &Record,
    registry: &SchemaRegistry,
) -> SmelterResult<DependencyDescriptor> {
    let record_id = record.id().as_str();
    let spec = registry
        .kind(record.kind())
        .ok_or_else(|| SmelterError::UnknownKind {
            id: record_id.to_string(),
            kind: record.kind().to_string(),
        })?;
    let owner_var = format!("${}", spec.schema_type);

    let mut fragment = Fragment::new();
    let mut deps: Vec<String> = Vec::new();

    // One counter numbers every matched reference variable in the record,
    // endpoints included. The owner's insert variable is the bare schema
    // type, so numbered match variables can never shadow it.
    let mut seq = 0usize;

    // For relation kinds (relationship, sighting) the owner declaration is a
    // relation instance over matched endpoint nodes.
    let mut role_parts: Vec<String> = Vec::new();
    if let Some(relation) = &spec.relation {
        for endpoint in &relation.endpoints {
            let Some(value) = record.get(&endpoint.field) else {
                continue;
            };
            for raw in refs::iter_ids(record_id, &endpoint.field, value)? {
                let sid = StixId::parse(raw)?;
                let var = format!("${}{}", sid.schema_type(), seq);
                seq += 1;
                fragment.match_clause.push_str(&format!(
                    " {var} isa {}, has stix-id {};\n",
                    sid.schema_type(),
                    quote_text(raw)
                ));
                role_parts.push(format!("{}:{}", endpoint.role, var));
                deps.push(raw.to_string());
            }
        }
    }

    // Partition fields into plain properties and structural sub-objects,
    // keeping the record's natural field order within each group. Variable
    // numbering is purely positional, so this order is a determinism
    // requirement.
    let mut properties = Vec::new();
    let mut structural = Vec::new();
    for (field, value) in record.fields() {
        match spec.fields.get(field) {
            Some(FieldMapping::Property(prop)) => properties.push((field, value, prop)),
            Some(FieldMapping::Ignored) | None => {
                if spec.fields.get(field).is_none() {
                    warn!(record = record_id, field, "field not in registry, skipped");
                }
            }
            Some(mapping) => structural.push((field, value, mapping)),
        }
    }

    let mut decl = if role_parts.is_empty() {
        format!(" {owner_var} isa {}", spec.schema_type)
    } else {
        format!(
            " {owner_var} ({}) isa {}",
            role_parts.join(", "),
            spec.schema_type
        )
    };
    let mut value_clauses = String::new();
    let mut bindings: Vec<VariableBinding> = Vec::new();
    for (field, value, prop) in properties {
        let piece = property::translate_property(record_id, field, value, prop)?;
        decl.push_str(&piece.decl);
        value_clauses.push_str(&piece.values);
        bindings.extend(piece.bindings);
    }
    fragment.insert_clause = format!("{decl};{value_clauses}\n");

    for (field, value, mapping) in structural {
        let (piece, piece_deps) = dispatch_structural(
            record_id, field, value, mapping, &owner_var, &bindings, registry, &mut seq, None,
        )?;
        fragment.append(piece);
        deps.extend(piece_deps);
    }

    Ok(DependencyDescriptor {
        id: record_id.to_string(),
        kind: record.kind().to_string(),
        dep_ids: deps,
        fragment,
    })
}

/// Route one structural field to its sub-translator.
///
/// `seq` is the record-wide reference counter; `inc` is the positional
/// suffix that keeps variable and relation names distinct across sibling
/// list-element invocations of the same field.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dispatch_structural(
    record_id: &str,
    field: &str,
    value: &Value,
    mapping: &FieldMapping,
    owner_var: &str,
    bindings: &[VariableBinding],
    registry: &SchemaRegistry,
    seq: &mut usize,
    inc: Option<usize>,
) -> SmelterResult<(Fragment, Vec<String>)> {
    match mapping {
        FieldMapping::KeyValue(spec) => composite::key_value(record_id, field, value, spec, owner_var),
        FieldMapping::ObjectList(spec) => {
            composite::object_list(record_id, field, value, spec, owner_var, registry, seq)
        }
        FieldMapping::Hashes => composite::hashes(record_id, field, value, owner_var, registry, inc),
        FieldMapping::Reference(spec) => {
            refs::reference(record_id, field, value, spec, owner_var, seq, inc)
        }
        FieldMapping::NestedObject(spec) => {
            composite::nested_object(record_id, field, value, spec, owner_var, registry, seq, inc)
        }
        FieldMapping::Extensions => {
            composite::extensions(record_id, field, value, owner_var, registry, seq)
        }
        FieldMapping::Markings => refs::markings(record_id, field, value, owner_var, bindings),
        // Plain properties and ignored fields never reach the dispatcher.
        FieldMapping::Property(_) | FieldMapping::Ignored => Ok((Fragment::new(), Vec::new())),
    }
}

/// Positional suffix text for sibling-invocation disambiguation.
pub(crate) fn suffix(inc: Option<usize>) -> String {
    inc.map(|i| i.to_string()).unwrap_or_default()
}

pub(crate) fn unsupported(record_id: &str, field: &str, value: &Value) -> SmelterError {
    SmelterError::UnsupportedValue {
        id: record_id.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}
