//! Dependency layering: order a batch of descriptors so no fragment ever
//! references a node that is not yet written (insertion) or already removed
//! (deletion).
//!
//! Layering is inherently sequential within one batch: each placement
//! decision depends on all prior placements. The missing/cyclical sets are
//! the sole gate; the caller checks them against the persisted store before
//! any write begins, and a rejected batch causes zero writes.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use smelter_core::id::schema_type_for;

use crate::fragment::DependencyDescriptor;

/// The fixed cleanup pass: remove attributes no longer owned by anything.
/// Run twice at the end of every deletion plan to catch attributes orphaned
/// by the first pass.
pub const CLEANUP_QUERY: &str =
    "match $a isa attribute; not { $b isa thing; $b has $a;}; delete $a isa attribute;";

/// One batch-safe set of descriptors, submittable as a unit once every
/// earlier layer's writes are durably visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    pub descriptors: Vec<DependencyDescriptor>,
}

/// Ordered layers plus the batch-scoped diagnostics, produced before any
/// write.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub layers: Vec<Layer>,
    /// Ids referenced by the batch but not supplied within it. The caller
    /// resolves these against the store; any id the store does not confirm
    /// fails the whole batch.
    pub missing: BTreeSet<String>,
    /// Descriptors whose dependency chains mutually require each other with
    /// no external resolution. Excluded from every layer; non-empty fails
    /// the whole batch.
    pub cyclical: Vec<DependencyDescriptor>,
}

impl BatchPlan {
    pub fn cyclical_ids(&self) -> Vec<String> {
        self.cyclical.iter().map(|d| d.id.clone()).collect()
    }
}

/// One deletion step: delete queries safe to run together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteLayer {
    pub queries: Vec<String>,
}

impl DeleteLayer {
    /// Relation sweeps first, then node removals, so no node in this layer
    /// still plays a role when it is deleted.
    fn from_descriptors(descriptors: &[DependencyDescriptor]) -> Self {
        let mut queries: Vec<String> = descriptors.iter().map(relation_sweep).collect();
        queries.extend(descriptors.iter().map(node_removal));
        Self { queries }
    }

    fn cleanup() -> Self {
        Self {
            queries: vec![CLEANUP_QUERY.to_string()],
        }
    }
}

/// Remove every relation the descriptor's node plays a role in.
pub fn relation_sweep(descriptor: &DependencyDescriptor) -> String {
    let schema_type = schema_type_for(&descriptor.kind);
    format!(
        "match $x isa {schema_type}, has stix-id \"{}\"; $refs ($x) isa relation;\ndelete $refs isa relation;",
        descriptor.id
    )
}

/// Remove the descriptor's node itself.
pub fn node_removal(descriptor: &DependencyDescriptor) -> String {
    let schema_type = schema_type_for(&descriptor.kind);
    format!(
        "match $x isa {schema_type}, has stix-id \"{}\";\ndelete $x isa {schema_type};",
        descriptor.id
    )
}

/// Order a batch for insertion.
///
/// Placement rule: a descriptor whose in-batch dependencies all sit in
/// strictly earlier layers goes into the layer one past its latest
/// dependency (layer 0 with no in-batch dependencies). A dependency id not
/// yet supplied joins the running missing set; placement is retried once the
/// id arrives later in the same batch. Ids never supplied stop constraining
/// placement at the end (they are the caller's store-lookup problem), and
/// descriptors that still cannot place are cyclical.
pub fn plan_insertion(descriptors: Vec<DependencyDescriptor>) -> BatchPlan {
    let mut layers: Vec<Vec<DependencyDescriptor>> = Vec::new();
    let mut placed: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<DependencyDescriptor> = Vec::new();
    let mut missing: BTreeSet<String> = BTreeSet::new();
    let mut supplied: BTreeSet<String> = BTreeSet::new();

    for descriptor in descriptors {
        supplied.insert(descriptor.id.clone());
        missing.remove(&descriptor.id);

        if all_deps_placed(&descriptor, &placed) {
            place(&mut layers, &mut placed, descriptor);
            drain_pending(&mut layers, &mut placed, &mut pending);
        } else {
            for dep in &descriptor.dep_ids {
                if !supplied.contains(dep) {
                    missing.insert(dep.clone());
                }
            }
            pending.push(descriptor);
        }
    }

    // Ids never supplied within the batch are external: the caller confirms
    // them against the store, so they no longer hold back placement.
    loop {
        let mut progressed = false;
        let mut i = 0;
        while i < pending.len() {
            let eligible = pending[i]
                .dep_ids
                .iter()
                .all(|dep| placed.contains_key(dep) || !supplied.contains(dep));
            if eligible {
                let descriptor = pending.remove(i);
                place(&mut layers, &mut placed, descriptor);
                progressed = true;
            } else {
                i += 1;
            }
        }
        if !progressed {
            break;
        }
    }

    debug!(
        layers = layers.len(),
        missing = missing.len(),
        cyclical = pending.len(),
        "insertion batch planned"
    );

    BatchPlan {
        layers: layers
            .into_iter()
            .map(|descriptors| Layer { descriptors })
            .collect(),
        missing,
        cyclical: pending,
    }
}

/// Order a batch for deletion: the insertion layering mirrored, so a
/// descriptor's relations are removed strictly before any entity it points
/// at is itself removed, followed by the fixed two-pass attribute cleanup.
///
/// Mutually cyclic descriptors are grouped into one final pre-cleanup layer;
/// with relations swept before node removals inside a layer, a cycle is
/// harmless on the way down.
pub fn plan_deletion(descriptors: Vec<DependencyDescriptor>) -> Vec<DeleteLayer> {
    let plan = plan_insertion(descriptors);

    let mut delete_layers: Vec<DeleteLayer> = plan
        .layers
        .iter()
        .rev()
        .map(|layer| DeleteLayer::from_descriptors(&layer.descriptors))
        .collect();
    if !plan.cyclical.is_empty() {
        delete_layers.push(DeleteLayer::from_descriptors(&plan.cyclical));
    }
    delete_layers.push(DeleteLayer::cleanup());
    delete_layers.push(DeleteLayer::cleanup());
    delete_layers
}

fn all_deps_placed(descriptor: &DependencyDescriptor, placed: &HashMap<String, usize>) -> bool {
    descriptor
        .dep_ids
        .iter()
        .all(|dep| placed.contains_key(dep))
}

/// Earliest layer one past the latest placed dependency.
fn place(
    layers: &mut Vec<Vec<DependencyDescriptor>>,
    placed: &mut HashMap<String, usize>,
    descriptor: DependencyDescriptor,
) {
    let target = descriptor
        .dep_ids
        .iter()
        .filter_map(|dep| placed.get(dep))
        .max()
        .map_or(0, |deepest| deepest + 1);
    if target == layers.len() {
        layers.push(Vec::new());
    }
    placed.insert(descriptor.id.clone(), target);
    layers[target].push(descriptor);
}

/// Retry deferred descriptors after each successful placement.
fn drain_pending(
    layers: &mut Vec<Vec<DependencyDescriptor>>,
    placed: &mut HashMap<String, usize>,
    pending: &mut Vec<DependencyDescriptor>,
) {
    loop {
        let mut progressed = false;
        let mut i = 0;
        while i < pending.len() {
            if all_deps_placed(&pending[i], placed) {
                let descriptor = pending.remove(i);
                place(layers, placed, descriptor);
                progressed = true;
            } else {
                i += 1;
            }
        }
        if !progressed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;

    fn desc(id: &str, deps: &[&str]) -> DependencyDescriptor {
        DependencyDescriptor {
            id: id.to_string(),
            kind: id.split("--").next().unwrap_or(id).to_string(),
            dep_ids: deps.iter().map(|d| d.to_string()).collect(),
            fragment: Fragment::new(),
        }
    }

    fn layer_ids(plan: &BatchPlan) -> Vec<Vec<String>> {
        plan.layers
            .iter()
            .map(|layer| layer.descriptors.iter().map(|d| d.id.clone()).collect())
            .collect()
    }

    #[test]
    fn independent_records_share_layer_zero_in_input_order() {
        let plan = plan_insertion(vec![desc("identity--a", &[]), desc("identity--b", &[])]);
        assert_eq!(
            layer_ids(&plan),
            vec![vec!["identity--a".to_string(), "identity--b".to_string()]]
        );
        assert!(plan.missing.is_empty());
        assert!(plan.cyclical.is_empty());
    }

    #[test]
    fn linear_chain_yields_one_layer_per_record() {
        // 3 -> 2 -> 1, supplied in reverse to exercise deferred placement.
        let plan = plan_insertion(vec![
            desc("report--3", &["indicator--2"]),
            desc("indicator--2", &["identity--1"]),
            desc("identity--1", &[]),
        ]);
        assert_eq!(
            layer_ids(&plan),
            vec![
                vec!["identity--1".to_string()],
                vec!["indicator--2".to_string()],
                vec!["report--3".to_string()],
            ]
        );
        assert!(plan.missing.is_empty());
        assert!(plan.cyclical.is_empty());
    }

    #[test]
    fn descriptor_goes_one_past_its_latest_dependency() {
        let plan = plan_insertion(vec![
            desc("identity--a", &[]),
            desc("indicator--b", &["identity--a"]),
            desc("report--c", &["identity--a", "indicator--b"]),
        ]);
        assert_eq!(
            layer_ids(&plan),
            vec![
                vec!["identity--a".to_string()],
                vec!["indicator--b".to_string()],
                vec!["report--c".to_string()],
            ]
        );
    }

    #[test]
    fn mutual_references_land_in_the_cyclical_set_with_zero_layers() {
        let plan = plan_insertion(vec![
            desc("identity--a", &["identity--b"]),
            desc("identity--b", &["identity--a"]),
        ]);
        assert!(plan.layers.is_empty());
        assert_eq!(
            plan.cyclical_ids(),
            vec!["identity--a".to_string(), "identity--b".to_string()]
        );
        // Both ids were supplied within the batch, so neither is missing.
        assert!(plan.missing.is_empty());
    }

    #[test]
    fn out_of_batch_reference_joins_the_missing_set_but_still_places() {
        let plan = plan_insertion(vec![desc(
            "indicator--a",
            &["marking-definition--external"],
        )]);
        assert_eq!(layer_ids(&plan), vec![vec!["indicator--a".to_string()]]);
        assert_eq!(
            plan.missing.iter().collect::<Vec<_>>(),
            vec!["marking-definition--external"]
        );
    }

    #[test]
    fn missing_entry_is_withdrawn_when_the_id_arrives_later() {
        let plan = plan_insertion(vec![
            desc("indicator--a", &["identity--b"]),
            desc("identity--b", &[]),
        ]);
        assert!(plan.missing.is_empty());
        assert_eq!(
            layer_ids(&plan),
            vec![
                vec!["identity--b".to_string()],
                vec!["indicator--a".to_string()],
            ]
        );
    }

    #[test]
    fn deletion_mirrors_insertion_and_ends_with_two_cleanup_passes() {
        let layers = plan_deletion(vec![
            desc("identity--1", &[]),
            desc("indicator--2", &["identity--1"]),
        ]);
        assert_eq!(layers.len(), 4);
        // Referrer first: its relations disappear before its dependency.
        assert!(layers[0].queries[0].contains("indicator--2"));
        assert!(layers[1].queries[0].contains("identity--1"));
        assert_eq!(layers[2].queries, vec![CLEANUP_QUERY.to_string()]);
        assert_eq!(layers[3].queries, vec![CLEANUP_QUERY.to_string()]);
    }

    #[test]
    fn deletion_sweeps_relations_before_removing_nodes() {
        let layers = plan_deletion(vec![desc("indicator--2", &[])]);
        let queries = &layers[0].queries;
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("$refs ($x) isa relation"));
        assert!(queries[1].contains("delete $x isa indicator"));
    }

    #[test]
    fn relationship_descriptors_delete_as_core_relationships() {
        let sweep = node_removal(&desc("relationship--r", &[]));
        assert!(sweep.contains("isa stix-core-relationship"));
    }
}
