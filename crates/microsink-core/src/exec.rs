//! Leaf execution node over rows the upstream engine already produced.
//!
//! `MaterializedBatchExec` never computes anything: `execute()` replays the
//! stored record batches of the requested partition. Partitioning and ordering
//! are whatever the caller hands in; this node does not derive them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use datafusion::common::stats::Precision;
use datafusion::common::Statistics;
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::execution::TaskContext;
use datafusion::physical_expr::{EquivalenceProperties, LexOrdering};
use datafusion::physical_plan::execution_plan::{Boundedness, EmissionType};
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, Partitioning, PlanProperties,
    SendableRecordBatchStream,
};

// ---------------------------------------------------------------------------
// MaterializedBatchExec
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MaterializedBatchExec {
    schema: SchemaRef,
    partitions: Vec<Vec<RecordBatch>>,
    partitioning: Partitioning,
    ordering: Option<LexOrdering>,
    properties: PlanProperties,
}

impl MaterializedBatchExec {
    /// Create a node over `partitions`, one vec of batches per output partition.
    ///
    /// Fails if `partitioning` does not describe exactly `partitions.len()`
    /// partitions. Every batch must already carry `schema`.
    pub fn try_new(
        schema: SchemaRef,
        partitions: Vec<Vec<RecordBatch>>,
        partitioning: Partitioning,
        ordering: Option<LexOrdering>,
    ) -> DFResult<Self> {
        if partitioning.partition_count() != partitions.len() {
            return Err(DataFusionError::Internal(format!(
                "MaterializedBatchExec: partitioning declares {} partitions but {} were supplied",
                partitioning.partition_count(),
                partitions.len()
            )));
        }

        let eq_properties = match &ordering {
            Some(ordering) => {
                EquivalenceProperties::new_with_orderings(Arc::clone(&schema), &[ordering.clone()])
            }
            None => EquivalenceProperties::new(Arc::clone(&schema)),
        };
        let properties = PlanProperties::new(
            eq_properties,
            partitioning.clone(),
            EmissionType::Incremental,
            Boundedness::Bounded,
        );

        Ok(Self {
            schema,
            partitions,
            partitioning,
            ordering,
            properties,
        })
    }

    /// Partitioning as handed in by the upstream engine.
    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    /// Ordering as handed in by the upstream engine.
    pub fn ordering(&self) -> Option<&LexOrdering> {
        self.ordering.as_ref()
    }

    pub fn partitions(&self) -> &[Vec<RecordBatch>] {
        &self.partitions
    }

    pub fn num_rows(&self) -> usize {
        self.partitions
            .iter()
            .flat_map(|p| p.iter())
            .map(|b| b.num_rows())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// ExecutionPlan
// ---------------------------------------------------------------------------

impl ExecutionPlan for MaterializedBatchExec {
    fn name(&self) -> &str {
        "MaterializedBatchExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        if children.is_empty() {
            Ok(self)
        } else {
            Err(DataFusionError::Internal(
                "MaterializedBatchExec is a leaf node and cannot have children".to_string(),
            ))
        }
    }

    fn execute(
        &self,
        partition: usize,
        _context: Arc<TaskContext>,
    ) -> DFResult<SendableRecordBatchStream> {
        let batches = self.partitions.get(partition).cloned().ok_or_else(|| {
            DataFusionError::Internal(format!(
                "MaterializedBatchExec has {} partitions, got partition {}",
                self.partitions.len(),
                partition
            ))
        })?;

        let stream = futures::stream::iter(batches.into_iter().map(Ok));
        Ok(Box::pin(RecordBatchStreamAdapter::new(
            Arc::clone(&self.schema),
            stream,
        )))
    }

    fn statistics(&self) -> DFResult<Statistics> {
        let mut stats = Statistics::new_unknown(&self.schema);
        stats.num_rows = Precision::Exact(self.num_rows());
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// DisplayAs
// ---------------------------------------------------------------------------

impl DisplayAs for MaterializedBatchExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MaterializedBatchExec: partitions={}, rows={}",
            self.partitions.len(),
            self.num_rows()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
