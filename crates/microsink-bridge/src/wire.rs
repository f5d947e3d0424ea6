//! Wire envelope for handing a data view to a foreign runtime.
//!
//! ## Format
//!
//! The body is an Arrow IPC stream: the view's schema followed by every
//! record batch in partition order. Routing data travels next to the body:
//!
//! | header                   | value                          |
//! |--------------------------|--------------------------------|
//! | `x-microsink-callback`   | callback id                    |
//! | `x-microsink-batch-id`   | batch id (decimal `i64`)       |
//! | `x-microsink-partitions` | number of partitions in the view |

use std::io::Cursor;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use microsink_core::DataView;

pub const ARROW_STREAM_CONTENT_TYPE: &str = "application/vnd.apache.arrow.stream";
pub const HEADER_CALLBACK_ID: &str = "x-microsink-callback";
pub const HEADER_BATCH_ID: &str = "x-microsink-batch-id";
pub const HEADER_PARTITIONS: &str = "x-microsink-partitions";

/// Serialize `view` as an Arrow IPC stream.
pub fn encode_view(view: &DataView) -> Result<Vec<u8>, ArrowError> {
    let schema = view.schema();
    let mut writer = StreamWriter::try_new(Vec::new(), &schema)?;
    for batch in view.batches() {
        writer.write(batch)?;
    }
    writer.finish()?;
    writer.into_inner()
}

/// Read an Arrow IPC stream back into its schema and batches.
pub fn decode_view(bytes: &[u8]) -> Result<(SchemaRef, Vec<RecordBatch>), ArrowError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}
