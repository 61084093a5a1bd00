//! Reference-id and granular-marking sub-translators: the two shapes that
//! match existing nodes and therefore contribute dependency ids.

use serde_json::Value;

use smelter_core::registry::ReferenceSpec;
use smelter_core::{SmelterError, SmelterResult, StixId};

use crate::fragment::{Fragment, VariableBinding};
use crate::value::quote_text;

use super::{suffix, unsupported};

/// A reference field's ids, whether single or multi-valued.
pub(crate) fn iter_ids<'a>(
    record_id: &str,
    field: &str,
    value: &'a Value,
) -> SmelterResult<Vec<&'a str>> {
    match value {
        Value::String(id) => Ok(vec![id.as_str()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| unsupported(record_id, field, value))
            })
            .collect(),
        _ => Err(unsupported(record_id, field, value)),
    }
}

/// Match every referenced node by kind and stix-id, then relate all of them
/// to the owner through one fan-out relation.
///
/// The target kind is derived from the id prefix; a `relationship` prefix
/// targets the reserved `stix-core-relationship` type. Matched variables
/// draw from `seq`, the record-wide reference counter, so two references to
/// the same kind (or to the owner's own kind) never share a variable. `inc`
/// keeps the fan-out relation distinct across sibling list-element
/// invocations of the same field.
pub(crate) fn reference(
    record_id: &str,
    field: &str,
    value: &Value,
    spec: &ReferenceSpec,
    owner_var: &str,
    seq: &mut usize,
    inc: Option<usize>,
) -> SmelterResult<(Fragment, Vec<String>)> {
    let inc_add = suffix(inc);
    let ids = iter_ids(record_id, field, value)?;

    let mut fragment = Fragment::new();
    let mut deps = Vec::new();
    let mut vars = Vec::new();
    for raw in ids {
        let sid = StixId::parse(raw)?;
        let var = format!("${}{}", sid.schema_type(), *seq);
        *seq += 1;
        fragment.match_clause.push_str(&format!(
            " {var} isa {}, has stix-id {};\n",
            sid.schema_type(),
            quote_text(raw)
        ));
        vars.push(var);
        deps.push(raw.to_string());
    }

    let roles = &spec.roles;
    fragment
        .insert_clause
        .push_str(&format!("\n ${}{inc_add} ({}:{owner_var}", roles.relation, roles.owner));
    for var in &vars {
        fragment
            .insert_clause
            .push_str(&format!(", {}:{var}", roles.pointed));
    }
    fragment
        .insert_clause
        .push_str(&format!(") isa {};\n", roles.relation));

    Ok((fragment, deps))
}

/// Granular markings: match the marking node, relate it to the owner and to
/// every property variable its selectors name.
pub(crate) fn markings(
    record_id: &str,
    field: &str,
    value: &Value,
    owner_var: &str,
    bindings: &[VariableBinding],
) -> SmelterResult<(Fragment, Vec<String>)> {
    let entries = match value {
        Value::Array(items) => items,
        _ => return Err(unsupported(record_id, field, value)),
    };

    let mut fragment = Fragment::new();
    let mut deps = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let marking_id = entry
            .get("marking_ref")
            .and_then(Value::as_str)
            .ok_or_else(|| unsupported(record_id, field, entry))?;
        let marking_var = format!("$marking{i}");
        fragment.match_clause.push_str(&format!(
            " {marking_var} isa marking-definition, has stix-id {};\n",
            quote_text(marking_id)
        ));
        deps.push(marking_id.to_string());

        fragment
            .insert_clause
            .push_str(&format!(" $granular{i} (marking:{marking_var}, object:{owner_var}"));
        if let Some(selectors) = entry.get("selectors").and_then(Value::as_array) {
            for selector in selectors {
                let selector = selector
                    .as_str()
                    .ok_or_else(|| unsupported(record_id, field, entry))?;
                let var = resolve_selector(selector, bindings).ok_or_else(|| {
                    SmelterError::SelectorUnresolved {
                        id: record_id.to_string(),
                        selector: selector.to_string(),
                    }
                })?;
                fragment.insert_clause.push_str(&format!(", marked:{var}"));
            }
        }
        fragment.insert_clause.push_str(") isa granular-marking;\n");
    }

    Ok((fragment, deps))
}

/// Resolve a selector against the bindings built earlier in the same
/// record's translation.
///
/// `name` names a whole property occurrence; `labels.[1]` names one list
/// element.
fn resolve_selector<'a>(selector: &str, bindings: &'a [VariableBinding]) -> Option<&'a str> {
    let (field, index) = match selector.strip_suffix(']') {
        Some(stripped) => {
            let (field, idx) = stripped.split_once(".[")?;
            (field, Some(idx.parse::<usize>().ok()?))
        }
        None => (selector, None),
    };
    bindings
        .iter()
        .find(|b| b.field == field && b.index == index)
        .map(|b| b.var.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(field: &str, index: Option<usize>, var: &str) -> VariableBinding {
        VariableBinding {
            field: field.to_string(),
            index,
            var: var.to_string(),
        }
    }

    #[test]
    fn selector_resolves_whole_property() {
        let bindings = vec![binding("name", None, "$name")];
        assert_eq!(resolve_selector("name", &bindings), Some("$name"));
    }

    #[test]
    fn selector_resolves_list_element() {
        let bindings = vec![
            binding("labels", Some(0), "$labels0"),
            binding("labels", Some(1), "$labels1"),
        ];
        assert_eq!(resolve_selector("labels.[1]", &bindings), Some("$labels1"));
    }

    #[test]
    fn selector_misses_are_none() {
        let bindings = vec![binding("name", None, "$name")];
        assert_eq!(resolve_selector("description", &bindings), None);
        assert_eq!(resolve_selector("name.[0]", &bindings), None);
        assert_eq!(resolve_selector("labels.[x]", &bindings), None);
    }
}
