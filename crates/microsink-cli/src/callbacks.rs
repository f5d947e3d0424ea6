//! Callbacks shipped with the replay driver.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use arrow::util::pretty::pretty_format_batches;
use async_trait::async_trait;
use microsink_bridge::ForeignBatchHandler;
use microsink_core::{BatchCallback, CallbackError, DataView};

/// Prints every view as a table on stdout.
#[derive(Debug, Default)]
pub struct LogCallback;

#[async_trait]
impl BatchCallback for LogCallback {
    async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), CallbackError> {
        let batches: Vec<RecordBatch> = data.batches().cloned().collect();
        let table = pretty_format_batches(&batches).map_err(CallbackError::failed)?;
        println!(
            "batch {} ({} rows, {} partitions)\n{}",
            batch_id,
            data.num_rows(),
            data.num_partitions(),
            table
        );
        Ok(())
    }
}

/// Receiver-side handler for `microsink receive`: prints what arrives and
/// optionally raises for one batch id.
#[derive(Debug, Default)]
pub struct PrintingHandler {
    pub fail_on_batch: Option<i64>,
}

#[async_trait]
impl ForeignBatchHandler for PrintingHandler {
    async fn handle(
        &self,
        callback_id: &str,
        batch_id: i64,
        _schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<(), String> {
        if self.fail_on_batch == Some(batch_id) {
            return Err(format!(
                "callback '{callback_id}' refused batch {batch_id}"
            ));
        }
        let table = pretty_format_batches(&batches).map_err(|e| e.to_string())?;
        println!("{} <- batch {}\n{}", callback_id, batch_id, table);
        Ok(())
    }
}
