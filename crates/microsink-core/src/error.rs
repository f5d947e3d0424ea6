//! Typed errors for the sink and its callbacks.

use datafusion::error::DataFusionError;
use thiserror::Error;

use crate::schema::SchemaMismatch;

/// Error type user callbacks raise.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a callback implemented outside this process.
#[derive(Debug, Error)]
pub enum ForeignCallError {
    /// The foreign implementation ran and raised.
    #[error("foreign callback '{callback_id}' raised: {message}")]
    Raised {
        callback_id: String,
        message: String,
    },
    /// The gateway could not reach the foreign implementation.
    #[error("foreign callback '{callback_id}' unreachable: {source}")]
    Unreachable {
        callback_id: String,
        #[source]
        source: BoxError,
    },
    /// The batch could not be put on the wire.
    #[error("failed to encode batch for foreign callback '{callback_id}': {reason}")]
    Encoding { callback_id: String, reason: String },
}

impl ForeignCallError {
    pub fn callback_id(&self) -> &str {
        match self {
            ForeignCallError::Raised { callback_id, .. }
            | ForeignCallError::Unreachable { callback_id, .. }
            | ForeignCallError::Encoding { callback_id, .. } => callback_id,
        }
    }
}

/// Failure raised while a callback handled a batch.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// A native callback returned an error.
    #[error("callback failed: {0}")]
    Failed(#[source] BoxError),
    /// A bridged callback failed on the foreign side or in transit.
    #[error(transparent)]
    Foreign(#[from] ForeignCallError),
}

impl CallbackError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        CallbackError::Failed(err.into())
    }
}

/// Errors surfaced by [`crate::BatchSink::add_batch`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The marker-free plan no longer produces the original output schema.
    /// Signals a defect upstream of the sink; the callback is not invoked.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] SchemaMismatch),
    /// The materialized rows cannot be presented under the original schema.
    #[error("failed to build data view: {0}")]
    View(#[from] DataFusionError),
    /// The callback failed. Carries the callback's error untouched.
    #[error(transparent)]
    Callback(#[from] CallbackError),
}

impl SinkError {
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SinkError::InvariantViolation(_))
    }

    pub fn callback_error(&self) -> Option<&CallbackError> {
        match self {
            SinkError::Callback(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_callback_error(self) -> Option<CallbackError> {
        match self {
            SinkError::Callback(e) => Some(e),
            _ => None,
        }
    }
}
