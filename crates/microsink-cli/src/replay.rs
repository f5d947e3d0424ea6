//! File-driven micro-batch replay.
//!
//! Each input file stands for one micro-batch. The file is registered as the
//! table `source`, the query is planned and executed once, and the result is
//! handed to the sink together with the marker-wrapped logical plan, the way
//! a streaming engine's write path would.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use clap::ValueEnum;
use datafusion::logical_expr::LogicalPlan;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionContext};
use microsink_core::{BatchSink, MarkerEliminator, MaterializedBatch, WriteMarker};
use tracing::{info, warn};

use crate::metrics::ReplayMetrics;

pub const DEFAULT_QUERY: &str = "SELECT * FROM source";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    /// Guess from the file extension, falling back to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => InputFormat::Parquet,
            _ => InputFormat::Csv,
        }
    }
}

/// One file planned and executed, ready for `add_batch`.
pub struct PlannedBatch {
    pub batch: MaterializedBatch,
    pub original_schema: SchemaRef,
    pub analyzed_plan: LogicalPlan,
}

async fn register_source(ctx: &SessionContext, path: &Path, format: InputFormat) -> Result<()> {
    let location = path
        .to_str()
        .with_context(|| format!("Non UTF-8 path {:?}", path))?;
    match format {
        InputFormat::Csv => {
            ctx.register_csv("source", location, CsvReadOptions::new())
                .await
        }
        InputFormat::Parquet => {
            ctx.register_parquet("source", location, ParquetReadOptions::default())
                .await
        }
    }
    .with_context(|| format!("Failed to register {:?} as source", path))
}

/// Plan `query` over `path` and execute it into a materialized batch.
pub async fn plan_file(path: &Path, format: InputFormat, query: &str) -> Result<PlannedBatch> {
    let ctx = SessionContext::new();
    register_source(&ctx, path, format).await?;

    let df = ctx
        .sql(query)
        .await
        .with_context(|| format!("Failed to plan query over {:?}", path))?;
    let original_schema = df.schema().inner().clone();
    let analyzed_plan = WriteMarker::wrap(df.logical_plan().clone());

    let physical = df.create_physical_plan().await?;
    let batch = MaterializedBatch::from_physical_plan(physical, ctx.task_ctx())
        .await
        .with_context(|| format!("Failed to execute query over {:?}", path))?;

    Ok(PlannedBatch {
        batch,
        original_schema,
        analyzed_plan,
    })
}

pub struct ReplayOptions {
    pub inputs: Vec<PathBuf>,
    pub format: Option<InputFormat>,
    pub query: String,
    pub start_batch_id: i64,
}

/// Deliver every input in order. Stops at the first failing batch and returns
/// the number of batches delivered otherwise.
pub async fn replay(
    sink: &BatchSink,
    options: &ReplayOptions,
    metrics: &ReplayMetrics,
) -> Result<usize> {
    let mut batch_id = options.start_batch_id;
    for path in &options.inputs {
        let format = options.format.unwrap_or_else(|| InputFormat::from_path(path));
        let planned = plan_file(path, format, &options.query).await?;
        let rows = planned.batch.num_rows();

        if let Err(e) = sink
            .add_batch(
                batch_id,
                &planned.batch,
                &planned.original_schema,
                &planned.analyzed_plan,
            )
            .await
        {
            metrics.batches_failed.inc();
            warn!("Replay stopped at batch {} ({:?})", batch_id, path);
            return Err(e).with_context(|| format!("Batch {} from {:?} failed", batch_id, path));
        }

        metrics.batches_delivered.inc();
        metrics.rows_delivered.inc_by(rows as u64);
        info!("Delivered batch {} from {:?} ({} rows)", batch_id, path, rows);
        batch_id += 1;
    }
    Ok(options.inputs.len())
}

/// Logical plan as handed to the sink, and after marker elimination.
pub async fn explain(path: &Path, format: InputFormat, query: &str) -> Result<String> {
    let ctx = SessionContext::new();
    register_source(&ctx, path, format).await?;
    let df = ctx.sql(query).await?;
    let wrapped = WriteMarker::wrap(df.logical_plan().clone());
    let eliminated = MarkerEliminator::eliminate(&wrapped);

    Ok(format!(
        "== Write plan ==\n{}\n\n== After marker elimination ==\n{}\n",
        wrapped.display_indent(),
        eliminated.display_indent()
    ))
}
