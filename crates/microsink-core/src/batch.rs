//! Micro-batches as handed over by the upstream engine.

use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::execution::TaskContext;
use datafusion::physical_expr::LexOrdering;
use datafusion::physical_plan::{collect_partitioned, ExecutionPlan, Partitioning};
use tracing::debug;

/// Rows of one already-executed micro-batch plus the physical layout facts
/// the upstream engine computed for them.
#[derive(Debug, Clone)]
pub struct MaterializedBatch {
    schema: SchemaRef,
    partitions: Vec<Vec<RecordBatch>>,
    partitioning: Partitioning,
    ordering: Option<LexOrdering>,
}

impl MaterializedBatch {
    /// Fails if `partitioning` does not describe `partitions.len()` partitions.
    pub fn try_new(
        schema: SchemaRef,
        partitions: Vec<Vec<RecordBatch>>,
        partitioning: Partitioning,
        ordering: Option<LexOrdering>,
    ) -> DFResult<Self> {
        if partitioning.partition_count() != partitions.len() {
            return Err(DataFusionError::Internal(format!(
                "MaterializedBatch: partitioning declares {} partitions but {} were supplied",
                partitioning.partition_count(),
                partitions.len()
            )));
        }
        Ok(Self {
            schema,
            partitions,
            partitioning,
            ordering,
        })
    }

    /// A single unordered partition holding `batches`.
    pub fn single_partition(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self {
            schema,
            partitions: vec![batches],
            partitioning: Partitioning::UnknownPartitioning(1),
            ordering: None,
        }
    }

    /// Execute `plan` once, keeping each output partition separate, and
    /// capture its declared output partitioning and ordering.
    pub async fn from_physical_plan(
        plan: Arc<dyn ExecutionPlan>,
        context: Arc<TaskContext>,
    ) -> DFResult<Self> {
        let schema = plan.schema();
        let partitioning = plan.properties().output_partitioning().clone();
        let ordering = plan.properties().output_ordering().cloned();

        let partitions = collect_partitioned(plan, context).await?;
        debug!(
            "MaterializedBatch: executed plan into {} partitions ({:?})",
            partitions.len(),
            partitioning
        );

        Self::try_new(schema, partitions, partitioning, ordering)
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn partitions(&self) -> &[Vec<RecordBatch>] {
        &self.partitions
    }

    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    pub fn ordering(&self) -> Option<&LexOrdering> {
        self.ordering.as_ref()
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn num_rows(&self) -> usize {
        self.partitions
            .iter()
            .flat_map(|p| p.iter())
            .map(|b| b.num_rows())
            .sum()
    }
}
