//! The TypeDB write sink: batch translation, dependency resolution against
//! the store, and layered execution.
//!
//! The sink owns the registry and a backend implementation; it never builds
//! query text itself. Every batch is fully planned and validated before the
//! first write, so a rejected batch leaves the database untouched.

use serde_json::Value;
use tracing::{debug, info, warn};

use smelter_core::record::gather_records;
use smelter_core::{GraphBackend, SchemaRegistry, SmelterError, SmelterResult};
use smelter_typeql::{plan_deletion, plan_insertion, translate, BatchPlan, DependencyDescriptor};

use crate::markings::INITIAL_MARKINGS;

pub struct TypeDbSink<B> {
    backend: B,
    registry: SchemaRegistry,
}

impl<B: GraphBackend> TypeDbSink<B> {
    pub fn new(backend: B, registry: SchemaRegistry) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Define the schema and seed the four TLP marking definitions.
    pub async fn bootstrap(&self, schema: &str) -> SmelterResult<()> {
        self.backend.define_schema(schema).await?;
        for query in INITIAL_MARKINGS {
            self.backend.insert(query).await?;
        }
        info!("schema defined and initial markings seeded");
        Ok(())
    }

    /// Add a batch: a single record, a list of records, or a bundle.
    ///
    /// The batch is translated and layered up front; missing dependencies
    /// are resolved against the store, and any unconfirmed missing id or any
    /// cyclical chain rejects the whole batch before the first write.
    /// Returns the number of insert queries executed.
    pub async fn add(&self, input: Value) -> SmelterResult<usize> {
        let plan = self.plan(input).await?;

        let mut written = 0usize;
        for (depth, layer) in plan.layers.iter().enumerate() {
            for descriptor in &layer.descriptors {
                let Some(query) = descriptor.fragment.to_query() else {
                    warn!(record = descriptor.id, "empty insert body, skipped");
                    continue;
                };
                debug!(record = descriptor.id, depth, "inserting");
                self.backend.insert(&query).await?;
                written += 1;
            }
        }
        info!(layers = plan.layers.len(), written, "batch added");
        Ok(written)
    }

    /// Delete a batch: reversed dependency order, relations swept before
    /// nodes, then the two-pass orphaned-attribute cleanup.
    pub async fn delete(&self, input: Value) -> SmelterResult<usize> {
        let descriptors = self.translate_batch(input)?;
        let layers = plan_deletion(descriptors);

        let mut executed = 0usize;
        for layer in &layers {
            for query in &layer.queries {
                self.backend.delete(query).await?;
                executed += 1;
            }
        }
        info!(layers = layers.len(), executed, "batch deleted");
        Ok(executed)
    }

    /// Translate and layer a batch, resolving missing ids against the store.
    async fn plan(&self, input: Value) -> SmelterResult<BatchPlan> {
        let descriptors = self.translate_batch(input)?;
        let plan = plan_insertion(descriptors);

        if !plan.missing.is_empty() {
            let candidates: Vec<String> = plan.missing.iter().cloned().collect();
            let confirmed = self.backend.existing_ids(&candidates).await?;
            let unconfirmed: Vec<String> = candidates
                .into_iter()
                .filter(|id| !confirmed.contains(id))
                .collect();
            if !unconfirmed.is_empty() {
                return Err(SmelterError::MissingDependencies { ids: unconfirmed });
            }
        }
        if !plan.cyclical.is_empty() {
            return Err(SmelterError::CyclicalDependencies {
                ids: plan.cyclical_ids(),
            });
        }
        Ok(plan)
    }

    fn translate_batch(&self, input: Value) -> SmelterResult<Vec<DependencyDescriptor>> {
        gather_records(input)?
            .iter()
            .map(|record| translate(record, &self.registry))
            .collect()
    }
}
