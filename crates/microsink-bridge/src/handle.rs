//! Foreign callback handle and registration.

use std::sync::Arc;

use async_trait::async_trait;
use microsink_core::{BatchCallback, CallbackError, DataView, ForeignCallError};
use tracing::debug;

use crate::gateway::CallGateway;

/// Reference to a callback registered under `callback_id` in another runtime.
#[derive(Debug, Clone)]
pub struct ForeignCallbackHandle {
    callback_id: String,
    gateway: Arc<dyn CallGateway>,
}

impl ForeignCallbackHandle {
    pub fn new(callback_id: impl Into<String>, gateway: Arc<dyn CallGateway>) -> Self {
        Self {
            callback_id: callback_id.into(),
            gateway,
        }
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    /// Run the foreign callback for one batch and wait for it to finish.
    pub async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), ForeignCallError> {
        debug!(
            callback_id = %self.callback_id,
            batch_id,
            rows = data.num_rows(),
            "invoking foreign callback"
        );
        self.gateway.invoke(&self.callback_id, batch_id, data).await
    }
}

#[async_trait]
impl BatchCallback for ForeignCallbackHandle {
    async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), CallbackError> {
        ForeignCallbackHandle::call(self, batch_id, data)
            .await
            .map_err(CallbackError::Foreign)
    }
}

/// Register a foreign callback in the shape the sink consumes.
pub fn register_foreign(handle: ForeignCallbackHandle) -> Arc<dyn BatchCallback> {
    Arc::new(handle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
