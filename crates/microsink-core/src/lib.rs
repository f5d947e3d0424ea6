//! microsink core - hands already-executed micro-batches to per-batch callbacks
//!
//! The upstream engine executes a micro-batch once. This crate rebuilds a
//! lightweight view over those rows, strips the write-path marker from the
//! analyzed plan, checks the schema contract and calls the registered
//! [`BatchCallback`] with the batch id.

pub mod batch;
pub mod callback;
pub mod config;
pub mod error;
pub mod exec;
pub mod marker;
pub mod schema;
pub mod sink;
pub mod view;

pub use batch::MaterializedBatch;
pub use callback::{native_callback, BatchCallback, FnCallback};
pub use config::SinkConfig;
pub use error::{BoxError, CallbackError, ForeignCallError, SinkError};
pub use exec::MaterializedBatchExec;
pub use marker::{is_write_marker, MarkerEliminator, WriteMarker};
pub use schema::{SchemaMatch, SchemaMismatch};
pub use sink::BatchSink;
pub use view::DataView;
