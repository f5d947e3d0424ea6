//! `DataView` - what a callback sees of one micro-batch.
//!
//! The view is backed by a [`MaterializedBatchExec`] over the rows the
//! upstream engine already produced. Building it relabels the record batches
//! with the caller-facing schema (column arrays are shared, not copied) and
//! keeps the upstream partitioning and ordering as-is.

use std::any::Any;
use std::sync::Arc;

use arrow::array::{RecordBatch, RecordBatchOptions};
use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use datafusion::catalog::Session;
use datafusion::datasource::TableProvider;
use datafusion::error::Result as DFResult;
use datafusion::execution::TaskContext;
use datafusion::logical_expr::TableType;
use datafusion::physical_expr::expressions::Column;
use datafusion::physical_expr::{LexOrdering, PhysicalExpr};
use datafusion::physical_plan::projection::ProjectionExec;
use datafusion::physical_plan::{collect_partitioned, ExecutionPlan, Partitioning};
use datafusion::prelude::{DataFrame, Expr, SessionContext};

use crate::batch::MaterializedBatch;
use crate::exec::MaterializedBatchExec;

#[derive(Debug, Clone)]
pub struct DataView {
    plan: Arc<MaterializedBatchExec>,
}

impl DataView {
    /// Build a view over `batch` presented under `schema`.
    ///
    /// Fails if a record batch's columns cannot carry `schema`, e.g. when the
    /// data types disagree.
    ///
    /// Ordering and hash-partitioning expressions are carried over as-is, so
    /// their `Column`s keep the upstream names; they resolve by index.
    pub fn try_new(batch: &MaterializedBatch, schema: SchemaRef) -> DFResult<Self> {
        let partitions = batch
            .partitions()
            .iter()
            .map(|partition| {
                partition
                    .iter()
                    .map(|b| relabel(b, &schema))
                    .collect::<DFResult<Vec<_>>>()
            })
            .collect::<DFResult<Vec<_>>>()?;

        let exec = MaterializedBatchExec::try_new(
            schema,
            partitions,
            batch.partitioning().clone(),
            batch.ordering().cloned(),
        )?;
        Ok(Self {
            plan: Arc::new(exec),
        })
    }

    pub fn schema(&self) -> SchemaRef {
        self.plan.schema()
    }

    pub fn partitioning(&self) -> &Partitioning {
        self.plan.partitioning()
    }

    pub fn ordering(&self) -> Option<&LexOrdering> {
        self.plan.ordering()
    }

    pub fn num_rows(&self) -> usize {
        self.plan.num_rows()
    }

    pub fn num_partitions(&self) -> usize {
        self.plan.partitions().len()
    }

    /// Record batches in partition order, without going through execution.
    pub fn batches(&self) -> impl Iterator<Item = &RecordBatch> {
        self.plan.partitions().iter().flat_map(|p| p.iter())
    }

    pub fn execution_plan(&self) -> Arc<dyn ExecutionPlan> {
        Arc::clone(&self.plan) as Arc<dyn ExecutionPlan>
    }

    /// All rows, one vec per partition.
    pub async fn collect_partitioned(&self) -> DFResult<Vec<Vec<RecordBatch>>> {
        collect_partitioned(self.execution_plan(), Arc::new(TaskContext::default())).await
    }

    /// All rows, partitions concatenated in order.
    pub async fn collect(&self) -> DFResult<Vec<RecordBatch>> {
        Ok(self
            .collect_partitioned()
            .await?
            .into_iter()
            .flatten()
            .collect())
    }

    pub fn to_table_provider(&self) -> Arc<dyn TableProvider> {
        Arc::new(DataViewTable {
            plan: Arc::clone(&self.plan),
        })
    }

    /// Expose the view to DataFusion queries without re-running the upstream plan.
    pub fn to_dataframe(&self, ctx: &SessionContext) -> DFResult<DataFrame> {
        ctx.read_table(self.to_table_provider())
    }
}

fn relabel(batch: &RecordBatch, schema: &SchemaRef) -> DFResult<RecordBatch> {
    if batch.schema() == *schema {
        return Ok(batch.clone());
    }
    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::clone(schema),
        batch.columns().to_vec(),
        &options,
    )?)
}

// ---------------------------------------------------------------------------
// DataViewTable
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DataViewTable {
    plan: Arc<MaterializedBatchExec>,
}

#[async_trait]
impl TableProvider for DataViewTable {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.plan.schema()
    }

    fn table_type(&self) -> TableType {
        TableType::Temporary
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        _filters: &[Expr],
        _limit: Option<usize>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        let input = Arc::clone(&self.plan) as Arc<dyn ExecutionPlan>;
        let Some(indices) = projection else {
            return Ok(input);
        };

        let schema = self.plan.schema();
        let exprs: Vec<(Arc<dyn PhysicalExpr>, String)> = indices
            .iter()
            .map(|&i| {
                let name = schema.field(i).name().clone();
                (Arc::new(Column::new(&name, i)) as Arc<dyn PhysicalExpr>, name)
            })
            .collect();
        Ok(Arc::new(ProjectionExec::try_new(exprs, input)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
