//! `BatchSink` - per-batch entry point called by the streaming scheduler.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use datafusion::logical_expr::LogicalPlan;
use tracing::{debug, error, info, warn};

use crate::batch::MaterializedBatch;
use crate::callback::BatchCallback;
use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::marker::MarkerEliminator;
use crate::schema::{check_output_schema, SchemaMatch};
use crate::view::DataView;

/// Forwards already-executed micro-batches to a callback.
///
/// Holds nothing but the callback and its configuration; no state survives
/// from one `add_batch` to the next. Calls must not overlap: the scheduler
/// issues the next batch only after the previous call returned.
pub struct BatchSink {
    callback: Arc<dyn BatchCallback>,
    config: SinkConfig,
}

impl fmt::Debug for BatchSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BatchSink {
    pub fn new(callback: Arc<dyn BatchCallback>) -> Self {
        Self::with_config(callback, SinkConfig::default())
    }

    pub fn with_config(callback: Arc<dyn BatchCallback>, config: SinkConfig) -> Self {
        Self { callback, config }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn schema_match(&self) -> SchemaMatch {
        self.config.schema_match
    }

    /// Deliver one micro-batch.
    ///
    /// 1. Strip the write marker from `analyzed_plan`.
    /// 2. Check that the marker-free plan still produces `original_schema`.
    ///    On mismatch, fail with [`SinkError::InvariantViolation`] without
    ///    calling the callback.
    /// 3. Present `batch` under `original_schema`, keeping its partitioning
    ///    and ordering.
    /// 4. Call the callback once and return its error, if any, untouched.
    pub async fn add_batch(
        &self,
        batch_id: i64,
        batch: &MaterializedBatch,
        original_schema: &SchemaRef,
        analyzed_plan: &LogicalPlan,
    ) -> Result<(), SinkError> {
        let analyzed = MarkerEliminator::eliminate(analyzed_plan);

        if let Err(mismatch) = check_output_schema(
            original_schema.fields(),
            analyzed.schema().fields(),
            self.config.schema_match,
        ) {
            error!(batch_id, %mismatch, "rejecting micro-batch: output schema changed");
            return Err(SinkError::InvariantViolation(mismatch));
        }

        let view = DataView::try_new(batch, Arc::clone(original_schema))?;
        debug!(
            batch_id,
            rows = view.num_rows(),
            partitions = view.num_partitions(),
            "dispatching micro-batch to callback"
        );

        match self.callback.call(batch_id, &view).await {
            Ok(()) => {
                info!(batch_id, rows = view.num_rows(), "micro-batch delivered");
                Ok(())
            }
            Err(e) => {
                warn!(batch_id, error = %e, "callback failed for micro-batch");
                Err(SinkError::Callback(e))
            }
        }
    }
}
